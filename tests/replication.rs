//! End-to-end tests for the replicated suite.
//!
//! All tests run on a paused runtime clock, so 12 second blocks cost nothing
//! and every timing is reproducible.

use std::cell::Cell;

use tokio::task::LocalSet;

use dlt_bench::dlt_clients::{SimulatedAccountChain, SimulatedDagLedger};
use dlt_bench::dlt_models::{AccountChainParams, DagLedgerParams};
use dlt_bench::dlt_sinks::RecordingSink;
use dlt_bench::{
    Backends, BenchConfig, BenchError, LedgerClient, Network, NoOpSink, OperationError,
    OperationOutcome, RandomSource, ReplicatedSuite, ScenarioKey, SuiteEvent, SuiteState,
};

fn test_config(replications: usize) -> BenchConfig {
    BenchConfig {
        replications,
        iterations: 10,
        seed_start: 1,
        batch_size: 10,
        batch_sizes: vec![10, 100],
        ..Default::default()
    }
}

/// DAG client whose readiness check starts failing after `healthy_checks` calls
struct FlakyDagLedger {
    inner: SimulatedDagLedger,
    checks: Cell<usize>,
    healthy_checks: usize,
}

impl LedgerClient for FlakyDagLedger {
    fn network(&self) -> Network {
        Network::DagLedger
    }

    async fn ensure_ready(&self) -> Result<(), BenchError> {
        let checks = self.checks.get() + 1;
        self.checks.set(checks);
        if checks > self.healthy_checks {
            return Err(BenchError::BackendUnavailable {
                network: Network::DagLedger,
                reason: "node not synced".into(),
            });
        }
        Ok(())
    }

    async fn submit(&self, rng: &RandomSource) -> Result<OperationOutcome, OperationError> {
        self.inner.submit(rng).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_account_chain_avg_latency_per_replication() {
    let mut suite = ReplicatedSuite::simulated(test_config(5));
    let report = suite.run().await.unwrap();

    let samples = suite
        .bag()
        .samples(&ScenarioKey::latency(Network::AccountChain), "avgLatency")
        .unwrap();
    assert_eq!(samples.len(), 5);
    for avg in samples {
        // 1ms RTT floor + one inclusion block + one confirmation block
        assert!(*avg >= 24_001.0, "avgLatency {}", avg);
    }

    let stat = report.get("latency", "account-chain", "avgLatency").unwrap();
    assert_eq!(stat.n, 5);
    assert!(stat.ci95[0] <= stat.mean && stat.mean <= stat.ci95[1]);
}

#[tokio::test(start_paused = true)]
async fn test_scalability_entries_per_batch_size() {
    let replications = 3;
    let mut suite = ReplicatedSuite::simulated(test_config(replications));
    let report = suite.run().await.unwrap();

    for network in Network::ALL {
        for batch_size in [10, 100] {
            let key = ScenarioKey::scalability(network, batch_size);
            for metric in ["tps", "avgLatency", "successRate"] {
                let samples = suite.bag().samples(&key, metric).unwrap();
                assert_eq!(samples.len(), replications, "{} {}", key, metric);
            }
        }

        let scopes: Vec<&String> = report.sections["scalability"]
            .keys()
            .filter(|scope| scope.starts_with(network.name()))
            .collect();
        assert_eq!(scopes.len(), 2);
    }

    assert!(suite
        .bag()
        .samples(&ScenarioKey::scalability(Network::DagLedger, 1000), "tps")
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn test_same_seed_reproduces_latency_sequence() {
    let suite = ReplicatedSuite::simulated(test_config(1));

    let mut sequences = Vec::new();
    for _ in 0..2 {
        let rng = RandomSource::from_seed(17);
        let result = LocalSet::new()
            .run_until(suite.run_replication(17, rng))
            .await
            .unwrap();

        let latencies: Vec<u64> = result
            .runs
            .iter()
            .flat_map(|run| run.collector.records())
            .filter_map(|record| record.latency_ms)
            .map(f64::to_bits)
            .collect();
        sequences.push(latencies);
    }

    assert!(!sequences[0].is_empty());
    assert_eq!(sequences[0], sequences[1]);
}

#[tokio::test(start_paused = true)]
async fn test_same_seed_start_reproduces_report() {
    let mut first = ReplicatedSuite::simulated(test_config(2));
    let mut second = ReplicatedSuite::simulated(test_config(2));

    let a = first.run().await.unwrap();
    let b = second.run().await.unwrap();
    assert_eq!(a, b);

    let mut shifted = ReplicatedSuite::simulated(BenchConfig {
        seed_start: 2,
        ..test_config(2)
    });
    let c = shifted.run().await.unwrap();
    assert_ne!(
        a.get("latency", "dag-ledger", "avgLatency"),
        c.get("latency", "dag-ledger", "avgLatency")
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_replication_reports_seed_and_keeps_partial() {
    let config = test_config(3);
    let backends = Backends {
        account_chain: SimulatedAccountChain::new(AccountChainParams::default()),
        dag_ledger: FlakyDagLedger {
            inner: SimulatedDagLedger::new(DagLedgerParams::default()),
            checks: Cell::new(0),
            // latency + throughput + two scalability batches per replication
            healthy_checks: 4,
        },
    };
    let mut suite = ReplicatedSuite::new(config, backends, Box::new(NoOpSink));

    let failure = suite.run().await.unwrap_err();
    assert_eq!(failure.seed, 2);
    assert!(matches!(
        failure.cause,
        BenchError::BackendUnavailable {
            network: Network::DagLedger,
            ..
        }
    ));
    assert!(failure.to_string().contains("seed 2"));
    assert_eq!(suite.state(), SuiteState::Failed { seed: 2 });

    // Only the first replication made it into the partial report
    assert_eq!(failure.partial.seeds, vec![1]);
    let stat = failure
        .partial
        .get("latency", "account-chain", "avgLatency")
        .unwrap();
    assert_eq!(stat.n, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_operations_do_not_abort_the_run() {
    let config = BenchConfig {
        account_chain_failure_prob: 0.5,
        ..test_config(2)
    };
    let mut suite = ReplicatedSuite::simulated(config);
    let report = suite.run().await.unwrap();

    assert_eq!(suite.state(), SuiteState::Done);
    let rate = report.get("throughput", "account-chain", "successRate").unwrap();
    assert_eq!(rate.n, 2);
    assert!(rate.mean < 100.0 && rate.mean > 0.0);
    let dag_rate = report.get("throughput", "dag-ledger", "successRate").unwrap();
    assert_eq!(dag_rate.mean, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_replication_order() {
    let recorder = RecordingSink::new();
    let mut suite =
        ReplicatedSuite::simulated(test_config(2)).with_sink(Box::new(recorder.clone()));
    let report = suite.run().await.unwrap();
    assert_eq!(report.replications(), 2);

    let events = recorder.events();
    assert_eq!(
        events.first(),
        Some(&SuiteEvent::SuiteStarted {
            replications: 2,
            seed_start: 1
        })
    );
    let started: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            SuiteEvent::ReplicationStarted { seed, .. } => Some(*seed),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![1, 2]);
    // 2 latency + 2 throughput + 4 scalability scenarios per replication
    let scenarios = events
        .iter()
        .filter(|e| matches!(e, SuiteEvent::ScenarioCompleted { .. }))
        .count();
    assert_eq!(scenarios, 16);
    assert_eq!(
        events.last(),
        Some(&SuiteEvent::Aggregated {
            entries: report.entries()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_fails_before_any_replication() {
    let config = BenchConfig {
        replications: 0,
        ..test_config(1)
    };
    let recorder = RecordingSink::new();
    let mut suite = ReplicatedSuite::simulated(config).with_sink(Box::new(recorder.clone()));
    let failure = suite.run().await.unwrap_err();

    assert_eq!(failure.seed, 1);
    assert!(matches!(failure.cause, BenchError::InvalidConfig(_)));
    assert_eq!(failure.partial.replications(), 0);
    assert_eq!(suite.state(), SuiteState::Failed { seed: 1 });
    assert!(matches!(
        recorder.events().last(),
        Some(SuiteEvent::ReplicationFailed { seed: 1, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_block_time_rejected_in_both_modes() {
    for sequential_latency in [false, true] {
        let mut config = BenchConfig {
            sequential_latency,
            ..test_config(2)
        };
        config.account_chain.block_time_ms = f64::INFINITY;

        let mut suite = ReplicatedSuite::simulated(config);
        let failure = suite.run().await.unwrap_err();
        assert_eq!(failure.seed, 1);
        assert!(matches!(failure.cause, BenchError::InvalidConfig(_)));
        assert!(suite.bag().is_empty());
    }

    let config = BenchConfig::from_yaml_str(
        "replications: 2\naccount_chain:\n  soft_confirm_blocks: 18446744073709551615\n",
    )
    .unwrap();
    let failure = ReplicatedSuite::simulated(config).run().await.unwrap_err();
    assert!(matches!(failure.cause, BenchError::InvalidConfig(_)));
}

/// DAG client whose every submission panics
struct PanickingDagLedger;

impl LedgerClient for PanickingDagLedger {
    fn network(&self) -> Network {
        Network::DagLedger
    }

    async fn submit(&self, _rng: &RandomSource) -> Result<OperationOutcome, OperationError> {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        panic!("ledger client crashed");
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_operations_are_failed_samples_in_both_modes() {
    for sequential_latency in [false, true] {
        let config = BenchConfig {
            sequential_latency,
            ..test_config(2)
        };
        let backends = Backends {
            account_chain: SimulatedAccountChain::new(AccountChainParams::default()),
            dag_ledger: PanickingDagLedger,
        };
        let mut suite = ReplicatedSuite::new(config, backends, Box::new(NoOpSink));

        let report = suite.run().await.unwrap();
        assert_eq!(suite.state(), SuiteState::Done);

        let dag_rate = report.get("latency", "dag-ledger", "successRate").unwrap();
        assert_eq!((dag_rate.n, dag_rate.mean), (2, 0.0));
        // No latency was reported, so there is nothing to average
        assert!(report.get("latency", "dag-ledger", "avgLatency").is_none());

        let chain_rate = report.get("latency", "account-chain", "successRate").unwrap();
        assert_eq!(chain_rate.mean, 100.0);
    }
}
