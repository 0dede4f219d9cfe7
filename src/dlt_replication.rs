//! Replication Orchestrator
//!
//! Runs the full workload (latency, throughput and a scalability sweep on both
//! networks) once per seed, strictly one replication at a time, and collects
//! the per-replication metrics into a `MetricsBag`. After the last replication
//! the bag is reduced to a `SuiteReport`.
//!
//! A replication's metrics are pushed only once the whole replication has
//! completed, so a failed replication leaves no partial samples behind.

use std::rc::Rc;

use indexmap::IndexMap;
use log::{error, info};
use thiserror::Error;
use tokio::task::LocalSet;

use crate::dlt_clients::{SimulatedAccountChain, SimulatedDagLedger};
use crate::dlt_config::BenchConfig;
use crate::dlt_error::BenchError;
use crate::dlt_interface::{
    Backends, EventSink, LedgerClient, Network, NoOpSink, ReplicationSeed, ScenarioKey,
    ScenarioKind, SuiteEvent, METRIC_AVG_LATENCY, METRIC_P95_LATENCY, METRIC_SUCCESS_RATE,
    METRIC_TPS,
};
use crate::dlt_random::{with_seed, RandomSource};
use crate::dlt_scenarios::{run_concurrent, run_sequential, ScenarioRun};
use crate::dlt_statistics::{aggregate, SuiteReport};

// ============================================================================
// Metrics Bag
// ============================================================================

/// Per-replication scalar samples keyed by scenario and metric name
#[derive(Debug, Clone, Default)]
pub struct MetricsBag {
    entries: IndexMap<ScenarioKey, IndexMap<&'static str, Vec<f64>>>,
}

impl MetricsBag {
    /// Append a value; absent and NaN values are skipped
    pub fn push(&mut self, key: ScenarioKey, metric: &'static str, value: Option<f64>) {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            return;
        };
        self.entries
            .entry(key)
            .or_default()
            .entry(metric)
            .or_default()
            .push(value);
    }

    pub fn samples(&self, key: &ScenarioKey, metric: &str) -> Option<&[f64]> {
        self.entries.get(key)?.get(metric).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScenarioKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioKey, &IndexMap<&'static str, Vec<f64>>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Replication Result
// ============================================================================

/// Every scenario run of one replication, in execution order
pub struct ReplicationResult {
    pub seed: ReplicationSeed,
    pub runs: Vec<ScenarioRun>,
}

impl ReplicationResult {
    pub fn run(&self, key: &ScenarioKey) -> Option<&ScenarioRun> {
        self.runs.iter().find(|r| r.key == *key)
    }

    /// Push the metrics of interest of every scenario into `bag`
    pub fn extract_into(&self, bag: &mut MetricsBag) {
        for run in &self.runs {
            let summary = &run.summary;
            match run.key.kind {
                ScenarioKind::Latency => {
                    bag.push(run.key, METRIC_AVG_LATENCY, run.avg_latency());
                    bag.push(run.key, METRIC_P95_LATENCY, run.p95_latency());
                    bag.push(run.key, METRIC_SUCCESS_RATE, Some(summary.success_rate));
                }
                ScenarioKind::Throughput | ScenarioKind::Scalability => {
                    bag.push(run.key, METRIC_TPS, Some(run.tps()));
                    bag.push(run.key, METRIC_AVG_LATENCY, run.avg_latency());
                    bag.push(run.key, METRIC_SUCCESS_RATE, Some(summary.success_rate));
                }
            }
        }
    }
}

// ============================================================================
// Suite
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    Idle,
    Running { replication: usize, of: usize },
    Aggregating,
    Done,
    Failed { seed: ReplicationSeed },
}

/// A replication failed; the run stopped there
#[derive(Debug, Error)]
#[error("replication with seed {seed} failed: {cause}")]
pub struct SuiteFailure {
    pub seed: ReplicationSeed,
    #[source]
    pub cause: BenchError,
    /// Aggregated from the replications that completed before the failure
    pub partial: SuiteReport,
}

pub struct ReplicatedSuite<A, D> {
    config: BenchConfig,
    account_chain: Rc<A>,
    dag_ledger: Rc<D>,
    sink: Box<dyn EventSink>,
    state: SuiteState,
    bag: MetricsBag,
    completed_seeds: Vec<ReplicationSeed>,
}

impl ReplicatedSuite<SimulatedAccountChain, SimulatedDagLedger> {
    /// Suite over the simulated clients described by `config`
    pub fn simulated(config: BenchConfig) -> Self {
        let backends = Backends {
            account_chain: SimulatedAccountChain::new(config.account_chain.clone())
                .with_failure_prob(config.account_chain_failure_prob),
            dag_ledger: SimulatedDagLedger::new(config.dag_ledger.clone())
                .with_failure_prob(config.dag_ledger_failure_prob),
        };
        Self::new(config, backends, Box::new(NoOpSink))
    }
}

impl<A, D> ReplicatedSuite<A, D>
where
    A: LedgerClient + 'static,
    D: LedgerClient + 'static,
{
    pub fn new(config: BenchConfig, backends: Backends<A, D>, sink: Box<dyn EventSink>) -> Self {
        Self {
            config,
            account_chain: Rc::new(backends.account_chain),
            dag_ledger: Rc::new(backends.dag_ledger),
            sink,
            state: SuiteState::Idle,
            bag: MetricsBag::default(),
            completed_seeds: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn bag(&self) -> &MetricsBag {
        &self.bag
    }

    /// Run every replication and aggregate.
    ///
    /// Concurrent operations are local tasks, so the whole run executes inside
    /// a `LocalSet` on the calling runtime.
    pub async fn run(&mut self) -> Result<SuiteReport, SuiteFailure> {
        LocalSet::new().run_until(self.run_replications()).await
    }

    async fn run_replications(&mut self) -> Result<SuiteReport, SuiteFailure> {
        self.bag = MetricsBag::default();
        self.completed_seeds.clear();

        let seeds = self.config.seeds();
        let replications = seeds.len();
        info!(
            "Running replicated suite: {} seeds (start={})",
            replications, self.config.seed_start
        );
        self.sink.log(SuiteEvent::SuiteStarted {
            replications,
            seed_start: self.config.seed_start,
        });

        if let Err(cause) = self.config.validate() {
            return Err(self.fail(self.config.seed_start, cause));
        }

        let source = RandomSource::from_entropy();
        for (index, seed) in seeds.into_iter().enumerate() {
            self.state = SuiteState::Running {
                replication: index + 1,
                of: replications,
            };
            info!("Replication {}/{} (seed={})", index + 1, replications, seed);
            self.sink.log(SuiteEvent::ReplicationStarted {
                index,
                of: replications,
                seed,
            });

            let outcome = with_seed(&source, seed, |rng| self.run_replication(seed, rng)).await;
            match outcome {
                Ok(result) => {
                    for run in &result.runs {
                        let records = run.collector.records();
                        self.sink.log(SuiteEvent::ScenarioCompleted {
                            seed,
                            key: run.key,
                            total: run.summary.total_transactions,
                            successful: records.iter().filter(|r| r.success).count(),
                            wall_time_secs: run.wall_time_secs,
                        });
                    }
                    result.extract_into(&mut self.bag);
                    self.completed_seeds.push(seed);
                    self.sink.log(SuiteEvent::ReplicationCompleted { seed });
                }
                Err(cause) => return Err(self.fail(seed, cause)),
            }
        }

        self.state = SuiteState::Aggregating;
        let report = aggregate(&self.bag, &self.completed_seeds);
        self.sink.log(SuiteEvent::Aggregated {
            entries: report.entries(),
        });
        self.state = SuiteState::Done;
        Ok(report)
    }

    fn fail(&mut self, seed: ReplicationSeed, cause: BenchError) -> SuiteFailure {
        error!("Replication with seed {} failed: {}", seed, cause);
        self.sink.log(SuiteEvent::ReplicationFailed {
            seed,
            cause: cause.to_string(),
        });
        self.state = SuiteState::Failed { seed };
        SuiteFailure {
            seed,
            cause,
            partial: aggregate(&self.bag, &self.completed_seeds),
        }
    }

    /// One full workload under `rng`: latency, throughput, then the
    /// scalability sweep, each for both networks. Scenarios run one after
    /// another; the operations inside a scenario run concurrently unless
    /// `sequential_latency` is set. Must run inside a `LocalSet`.
    pub async fn run_replication(
        &self,
        seed: ReplicationSeed,
        rng: RandomSource,
    ) -> Result<ReplicationResult, BenchError> {
        let mut runs = Vec::new();

        for network in Network::ALL {
            let key = ScenarioKey::latency(network);
            let iterations = self.config.iterations;
            let run = match (self.config.sequential_latency, network) {
                (true, Network::AccountChain) => {
                    run_sequential(key, &self.account_chain, &rng, iterations).await?
                }
                (true, Network::DagLedger) => {
                    run_sequential(key, &self.dag_ledger, &rng, iterations).await?
                }
                (false, _) => self.run_batch(key, &rng, iterations).await?,
            };
            runs.push(run);
        }

        for network in Network::ALL {
            let key = ScenarioKey::throughput(network);
            runs.push(self.run_batch(key, &rng, self.config.batch_size).await?);
        }

        for network in Network::ALL {
            for &batch_size in &self.config.batch_sizes {
                let key = ScenarioKey::scalability(network, batch_size);
                runs.push(self.run_batch(key, &rng, batch_size).await?);
            }
        }

        Ok(ReplicationResult { seed, runs })
    }

    async fn run_batch(
        &self,
        key: ScenarioKey,
        rng: &RandomSource,
        count: usize,
    ) -> Result<ScenarioRun, BenchError> {
        match key.network {
            Network::AccountChain => run_concurrent(key, &self.account_chain, rng, count).await,
            Network::DagLedger => run_concurrent(key, &self.dag_ledger, rng, count).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BenchConfig {
        BenchConfig {
            iterations: 5,
            batch_size: 20,
            batch_sizes: vec![5, 15],
            replications: 3,
            seed_start: 11,
            ..Default::default()
        }
    }

    #[test]
    fn test_bag_skips_absent_and_nan() {
        let mut bag = MetricsBag::default();
        let key = ScenarioKey::latency(Network::DagLedger);

        bag.push(key, METRIC_AVG_LATENCY, None);
        bag.push(key, METRIC_AVG_LATENCY, Some(f64::NAN));
        assert!(bag.is_empty());

        bag.push(key, METRIC_AVG_LATENCY, Some(1.0));
        bag.push(key, METRIC_AVG_LATENCY, Some(2.0));
        assert_eq!(bag.samples(&key, METRIC_AVG_LATENCY), Some(&[1.0, 2.0][..]));
        assert!(bag.samples(&key, METRIC_TPS).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suite_state_and_report() {
        let mut suite = ReplicatedSuite::simulated(small_config());
        assert_eq!(suite.state(), SuiteState::Idle);

        let report = suite.run().await.unwrap();
        assert_eq!(suite.state(), SuiteState::Done);
        assert_eq!(report.seeds, vec![11, 12, 13]);

        // 2 latency + 2 throughput + 2 networks * 2 batch sizes
        assert_eq!(suite.bag().keys().count(), 8);
        assert!(suite.bag().keys().any(|k| k.kind == ScenarioKind::Scalability));

        let sections: Vec<&String> = report.sections.keys().collect();
        assert_eq!(sections, vec!["latency", "throughput", "scalability"]);
        for network in Network::ALL {
            let stat = report.get("throughput", network.name(), METRIC_TPS).unwrap();
            assert_eq!(stat.n, 3);
            assert!(stat.mean > 0.0);
            let rate = report.get("latency", network.name(), METRIC_SUCCESS_RATE).unwrap();
            assert_eq!(rate.ci95, [100.0, 100.0]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_latency_takes_longer() {
        let concurrent = ReplicatedSuite::simulated(small_config());
        let sequential = ReplicatedSuite::simulated(BenchConfig {
            sequential_latency: true,
            ..small_config()
        });

        let key = ScenarioKey::latency(Network::AccountChain);
        let mut wall_times = Vec::new();
        for suite in [&concurrent, &sequential] {
            let result = LocalSet::new()
                .run_until(suite.run_replication(11, RandomSource::from_seed(11)))
                .await
                .unwrap();
            let run = result.run(&key).unwrap();
            assert_eq!(run.summary.total_transactions, 5);
            assert!(run.avg_latency().unwrap() >= 24_001.0);
            wall_times.push(run.wall_time_secs);
        }

        // Five back-to-back confirmations versus five overlapping ones
        assert!(wall_times[1] >= 5.0 * 24.0);
        assert!(wall_times[0] < wall_times[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_fails_before_running() {
        let config = BenchConfig {
            batch_sizes: vec![],
            ..small_config()
        };
        let mut suite = ReplicatedSuite::simulated(config);

        let failure = suite.run().await.unwrap_err();
        assert!(matches!(failure.cause, BenchError::InvalidConfig(_)));
        assert_eq!(failure.partial.replications(), 0);
        assert_eq!(suite.state(), SuiteState::Failed { seed: 11 });
    }
}
