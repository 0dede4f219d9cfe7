//! Simulated ledger clients
//!
//! Stand-ins for real submission endpoints. They run the latency models and
//! report what a real client would: latency, success, gas, process CPU time
//! spent during the submission and an identifier.

use std::cell::Cell;

use cpu_time::ProcessTime;

use log::trace;
use rand::Rng;
use tokio::time::Instant;

use crate::dlt_error::OperationError;
use crate::dlt_interface::{LedgerClient, Millis, Network, OperationOutcome};
use crate::dlt_models::{
    elapsed_ms, simulate_account_chain, simulate_dag_ledger, AccountChainParams, DagLedgerParams,
};
use crate::dlt_random::RandomSource;

/// Gas used by a plain value transfer on the account chain
pub const TRANSFER_GAS: f64 = 21_000.0;

/// Process CPU milliseconds since `start`; absent where the platform cannot report them
fn cpu_ms_since(start: Option<ProcessTime>) -> Option<Millis> {
    let elapsed = start?.try_elapsed().ok()?;
    Some(elapsed.as_secs_f64() * 1000.0)
}

/// Account chain client: every submission pays a transfer's gas and waits for
/// inclusion plus soft confirmation.
pub struct SimulatedAccountChain {
    params: AccountChainParams,
    failure_prob: f64,
    submitted: Cell<u64>,
}

impl SimulatedAccountChain {
    pub fn new(params: AccountChainParams) -> Self {
        Self {
            params,
            failure_prob: 0.0,
            submitted: Cell::new(0),
        }
    }

    /// Reject this fraction of submissions before they reach the network
    pub fn with_failure_prob(mut self, failure_prob: f64) -> Self {
        self.failure_prob = failure_prob;
        self
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.get()
    }
}

impl LedgerClient for SimulatedAccountChain {
    fn network(&self) -> Network {
        Network::AccountChain
    }

    async fn submit(&self, rng: &RandomSource) -> Result<OperationOutcome, OperationError> {
        let start = Instant::now();
        let cpu_start = ProcessTime::try_now().ok();
        self.submitted.set(self.submitted.get() + 1);

        let nonce: u64 = rng.with(|r| r.gen_range(0..1_000_000));
        if self.failure_prob > 0.0 && rng.uniform() < self.failure_prob {
            return Err(OperationError::Rejected(format!("nonce {} rejected", nonce)));
        }

        let result = simulate_account_chain(rng, &self.params).await;
        let tx_id = rng.with(|r| format!("0x{:016x}{:016x}", r.gen::<u64>(), r.gen::<u64>()));
        trace!(
            "{} confirmed: {} blocks, {:.0}ms",
            tx_id,
            result.blocks_to_inclusion,
            result.total_ms
        );

        Ok(OperationOutcome {
            latency_ms: Some(elapsed_ms(start)),
            success: true,
            cpu_time_ms: cpu_ms_since(cpu_start),
            gas_used: Some(TRANSFER_GAS),
            tx_id: Some(tx_id),
            breakdown: Some(result.breakdown),
        })
    }
}

/// Feeless DAG ledger client
pub struct SimulatedDagLedger {
    params: DagLedgerParams,
    failure_prob: f64,
    submitted: Cell<u64>,
}

impl SimulatedDagLedger {
    pub fn new(params: DagLedgerParams) -> Self {
        Self {
            params,
            failure_prob: 0.0,
            submitted: Cell::new(0),
        }
    }

    pub fn with_failure_prob(mut self, failure_prob: f64) -> Self {
        self.failure_prob = failure_prob;
        self
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.get()
    }
}

impl LedgerClient for SimulatedDagLedger {
    fn network(&self) -> Network {
        Network::DagLedger
    }

    async fn submit(&self, rng: &RandomSource) -> Result<OperationOutcome, OperationError> {
        let start = Instant::now();
        let cpu_start = ProcessTime::try_now().ok();
        self.submitted.set(self.submitted.get() + 1);

        if self.failure_prob > 0.0 && rng.uniform() < self.failure_prob {
            return Err(OperationError::Rejected("block not attached".into()));
        }

        let result = simulate_dag_ledger(rng, &self.params).await;
        let block_id = rng.with(|r| format!("0x{:016x}", r.gen::<u64>()));

        Ok(OperationOutcome {
            latency_ms: Some(elapsed_ms(start)),
            success: true,
            cpu_time_ms: cpu_ms_since(cpu_start),
            gas_used: Some(0.0),
            tx_id: Some(block_id),
            breakdown: Some(result.breakdown),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlt_metrics::MetricsCollector;

    #[tokio::test(start_paused = true)]
    async fn test_account_chain_outcome() {
        let client = SimulatedAccountChain::new(AccountChainParams::default());
        let rng = RandomSource::from_seed(42);

        let outcome = client.submit(&rng).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.gas_used, Some(TRANSFER_GAS));
        assert!(outcome.latency_ms.unwrap() >= 24_001.0);
        assert!(outcome.tx_id.unwrap().starts_with("0x"));
        assert_eq!(client.submitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dag_ledger_outcome() {
        let client = SimulatedDagLedger::new(DagLedgerParams::default());
        let rng = RandomSource::from_seed(42);

        let outcome = client.submit(&rng).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.gas_used, Some(0.0));
        let breakdown = outcome.breakdown.unwrap();
        assert_eq!(breakdown.phases.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_probability() {
        let client =
            SimulatedAccountChain::new(AccountChainParams::default()).with_failure_prob(1.0);
        let rng = RandomSource::from_seed(42);

        let result = client.submit(&rng).await;
        assert!(matches!(result, Err(OperationError::Rejected(_))));

        let client = SimulatedDagLedger::new(DagLedgerParams::default()).with_failure_prob(1.0);
        assert!(client.submit(&rng).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cpu_time_reaches_summary() {
        let chain = SimulatedAccountChain::new(AccountChainParams::default());
        let dag = SimulatedDagLedger::new(DagLedgerParams::default());
        let rng = RandomSource::from_seed(42);

        let mut collector = MetricsCollector::new();
        for _ in 0..5 {
            collector.record_result(chain.submit(&rng).await);
            collector.record_result(dag.submit(&rng).await);
        }

        let cpu = collector.summarize().cpu.unwrap();
        assert_eq!(cpu.count, 10);
        assert!(cpu.min >= 0.0 && cpu.max.is_finite());
        assert!(collector.records().iter().all(|r| r.cpu_time_ms.is_some()));
    }
}
