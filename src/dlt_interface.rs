use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dlt_error::{BenchError, OperationError};
use crate::dlt_random::RandomSource;

pub type ReplicationSeed = u64;
pub type Millis = f64;

pub const METRIC_AVG_LATENCY: &str = "avgLatency";
pub const METRIC_P95_LATENCY: &str = "p95Latency";
pub const METRIC_SUCCESS_RATE: &str = "successRate";
pub const METRIC_TPS: &str = "tps";

/// Ledger architectures under benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    /// Account based chain with periodic block inclusion
    AccountChain,
    /// Feeless DAG ledger (gossip, solidification, confirmation)
    DagLedger,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::AccountChain, Network::DagLedger];

    pub fn name(&self) -> &'static str {
        match self {
            Network::AccountChain => "account-chain",
            Network::DagLedger => "dag-ledger",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Workload shapes executed within one replication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Latency,
    Throughput,
    Scalability,
}

impl ScenarioKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Latency => "latency",
            ScenarioKind::Throughput => "throughput",
            ScenarioKind::Scalability => "scalability",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of one metrics stream: every sample pushed under the same key
/// comes from the same network running the same workload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScenarioKey {
    pub network: Network,
    pub kind: ScenarioKind,
    /// Present only for scalability scenarios
    pub batch_size: Option<usize>,
}

impl ScenarioKey {
    pub fn latency(network: Network) -> Self {
        Self {
            network,
            kind: ScenarioKind::Latency,
            batch_size: None,
        }
    }

    pub fn throughput(network: Network) -> Self {
        Self {
            network,
            kind: ScenarioKind::Throughput,
            batch_size: None,
        }
    }

    pub fn scalability(network: Network, batch_size: usize) -> Self {
        Self {
            network,
            kind: ScenarioKind::Scalability,
            batch_size: Some(batch_size),
        }
    }

    /// Report section this key lands in
    pub fn section(&self) -> &'static str {
        self.kind.name()
    }

    /// Scope label inside the section: the network, qualified by batch size
    /// for scalability runs (`dag-ledger:batch_100`).
    pub fn scope(&self) -> String {
        match self.batch_size {
            Some(size) => format!("{}:batch_{}", self.network, size),
            None => self.network.to_string(),
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section(), self.scope())
    }
}

/// Named confirmation-pipeline phases and the rounded milliseconds each waited
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseBreakdown {
    pub phases: Vec<(&'static str, u64)>,
}

impl PhaseBreakdown {
    pub fn push(&mut self, phase: &'static str, ms: u64) {
        self.phases.push((phase, ms));
    }

    pub fn get(&self, phase: &str) -> Option<u64> {
        self.phases
            .iter()
            .find(|(name, _)| *name == phase)
            .map(|(_, ms)| *ms)
    }

    pub fn total(&self) -> u64 {
        self.phases.iter().map(|(_, ms)| ms).sum()
    }
}

/// What a submitted operation reports back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationOutcome {
    pub latency_ms: Option<Millis>,
    pub success: bool,
    pub cpu_time_ms: Option<Millis>,
    pub gas_used: Option<f64>,
    pub tx_id: Option<String>,
    pub breakdown: Option<PhaseBreakdown>,
}

// ============================================================================
// Operation under simulation
// ============================================================================

/// A ledger endpoint the benchmark submits operations to.
///
/// Implementations draw every random value from the `RandomSource` they are
/// handed so that a seeded replication is reproducible. A failed submission is
/// reported as `Err(OperationError)` and becomes a failed sample; it never
/// aborts the replication.
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    fn network(&self) -> Network;

    /// Checked once before each scenario. An error here is a replication fault.
    async fn ensure_ready(&self) -> Result<(), BenchError> {
        Ok(())
    }

    async fn submit(&self, rng: &RandomSource) -> Result<OperationOutcome, OperationError>;
}

/// Clients handed to the orchestrator by its caller
pub struct Backends<A, D> {
    pub account_chain: A,
    pub dag_ledger: D,
}

// ============================================================================
// Suite Event Logging
// ============================================================================

/// Progress events emitted by the replicated suite
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteEvent {
    SuiteStarted {
        replications: usize,
        seed_start: ReplicationSeed,
    },
    ReplicationStarted {
        index: usize,
        of: usize,
        seed: ReplicationSeed,
    },
    ScenarioCompleted {
        seed: ReplicationSeed,
        key: ScenarioKey,
        total: usize,
        successful: usize,
        wall_time_secs: f64,
    },
    ReplicationCompleted {
        seed: ReplicationSeed,
    },
    ReplicationFailed {
        seed: ReplicationSeed,
        cause: String,
    },
    Aggregated {
        entries: usize,
    },
}

pub trait EventSink {
    fn log(&mut self, event: SuiteEvent);
}

/// Discards all events
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline]
    fn log(&mut self, _event: SuiteEvent) {}
}
