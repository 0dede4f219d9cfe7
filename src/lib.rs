//! # dlt_bench - Replicated DLT Confirmation Latency Benchmark
//!
//! Simulates the confirmation pipelines of two ledger architectures and
//! measures latency, throughput and success rate across independently seeded
//! replications, without touching a real network:
//!
//! - an account based chain (RTT, blocks until inclusion, soft confirmation)
//! - a feeless DAG ledger (gossip, solidification, confirmation)
//!
//! ## Core Components
//!
//! - **dlt_distributions**: stochastic delay samplers
//! - **dlt_models**: staged latency models per architecture
//! - **dlt_metrics**: per-operation sample accumulator and summaries
//! - **dlt_random**: deterministic seeding harness
//! - **dlt_replication**: replication orchestrator and metrics bag
//! - **dlt_statistics**: mean / variance / CI95 aggregation
//!
//! ## Usage
//!
//! Waits run on the tokio clock. With a paused clock (the default for the
//! `replicated_suite` binary) a run with 12 second blocks completes in
//! moments and is reproducible for a given seed.
//!
//! ```no_run
//! use dlt_bench::{BenchConfig, ReplicatedSuite};
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .start_paused(true)
//!     .build()
//!     .unwrap();
//!
//! let config = BenchConfig { replications: 5, ..Default::default() };
//! let mut suite = ReplicatedSuite::simulated(config);
//! let report = runtime.block_on(suite.run()).unwrap();
//! report.print_summary();
//! ```

pub mod dlt_clients;
pub mod dlt_config;
pub mod dlt_distributions;
pub mod dlt_error;
pub mod dlt_interface;
pub mod dlt_metrics;
pub mod dlt_models;
pub mod dlt_random;
pub mod dlt_replication;
pub mod dlt_scenarios;
pub mod dlt_sinks;
pub mod dlt_statistics;

// Re-export commonly used types
pub use dlt_config::{BenchConfig, EnvOverrides};
pub use dlt_error::{BenchError, OperationError};
pub use dlt_interface::{
    Backends, EventSink, LedgerClient, Network, NoOpSink, OperationOutcome, PhaseBreakdown,
    ReplicationSeed, ScenarioKey, ScenarioKind, SuiteEvent,
};
pub use dlt_metrics::{MetricsCollector, SampleRecord, Summary};
pub use dlt_random::{with_seed, RandomSource};
pub use dlt_replication::{MetricsBag, ReplicatedSuite, SuiteFailure, SuiteState};
pub use dlt_statistics::{SuiteReport, SummaryStatistic};
