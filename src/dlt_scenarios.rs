//! Scenario workloads
//!
//! A scenario drives one client with a fixed number of operations and returns
//! the accumulator that recorded them. Sequential scenarios await each
//! operation before submitting the next; concurrent scenarios fan out one local
//! task per operation on a `JoinSet` and join them all. Either way every
//! operation runs in its own local task, so a failed or panicking operation
//! becomes a failed sample.
//!
//! Both shapes spawn local tasks and must run inside a `LocalSet`.

use std::rc::Rc;

use log::{debug, warn};
use tokio::task::{spawn_local, JoinError, JoinSet};
use tokio::time::Instant;

use crate::dlt_error::{BenchError, OperationError};
use crate::dlt_interface::{LedgerClient, OperationOutcome, ScenarioKey};
use crate::dlt_metrics::{MetricsCollector, Summary};
use crate::dlt_random::RandomSource;

/// Result of running one scenario against one client
pub struct ScenarioRun {
    pub key: ScenarioKey,
    pub collector: MetricsCollector,
    pub summary: Summary,
    /// Runtime-clock seconds from first submission to last completion
    pub wall_time_secs: f64,
}

impl ScenarioRun {
    fn finish(key: ScenarioKey, collector: MetricsCollector, start: Instant) -> Self {
        let summary = collector.summarize();
        let run = Self {
            key,
            collector,
            summary,
            wall_time_secs: start.elapsed().as_secs_f64(),
        };
        debug!(
            "{}: {} ops, {:.1}% ok, {:.3}s",
            run.key, run.summary.total_transactions, run.summary.success_rate, run.wall_time_secs
        );
        run
    }

    /// Operations completed per second of scenario wall time
    pub fn tps(&self) -> f64 {
        if self.wall_time_secs > 0.0 {
            self.summary.total_transactions as f64 / self.wall_time_secs
        } else {
            0.0
        }
    }

    pub fn avg_latency(&self) -> Option<f64> {
        self.summary.latency.as_ref().map(|l| l.mean)
    }

    pub fn p95_latency(&self) -> Option<f64> {
        self.summary.latency.as_ref().map(|l| l.p95)
    }
}

/// Submit `iterations` operations one after another
pub async fn run_sequential<C: LedgerClient + 'static>(
    key: ScenarioKey,
    client: &Rc<C>,
    rng: &RandomSource,
    iterations: usize,
) -> Result<ScenarioRun, BenchError> {
    client.ensure_ready().await?;

    let mut collector = MetricsCollector::new();
    let start = Instant::now();
    for _ in 0..iterations {
        let task_client = Rc::clone(client);
        let task_rng = rng.clone();
        let operation = spawn_local(async move { task_client.submit(&task_rng).await });
        record_joined(&key, &mut collector, operation.await);
    }

    Ok(ScenarioRun::finish(key, collector, start))
}

/// Submit `count` operations at once and wait for all of them
pub async fn run_concurrent<C: LedgerClient + 'static>(
    key: ScenarioKey,
    client: &Rc<C>,
    rng: &RandomSource,
    count: usize,
) -> Result<ScenarioRun, BenchError> {
    client.ensure_ready().await?;

    let mut collector = MetricsCollector::new();
    let start = Instant::now();

    let mut task_set = JoinSet::new();
    for _ in 0..count {
        let task_client = Rc::clone(client);
        let task_rng = rng.clone();
        task_set.spawn_local(async move { task_client.submit(&task_rng).await });
    }

    while let Some(joined) = task_set.join_next().await {
        record_joined(&key, &mut collector, joined);
    }

    Ok(ScenarioRun::finish(key, collector, start))
}

fn record_joined(
    key: &ScenarioKey,
    collector: &mut MetricsCollector,
    joined: Result<Result<OperationOutcome, OperationError>, JoinError>,
) {
    match joined {
        Ok(result) => collector.record_result(result),
        Err(e) => {
            warn!("{}: operation task failed: {}", key, e);
            collector.record_failure(&OperationError::Aborted(e.to_string()));
        }
    }
}
