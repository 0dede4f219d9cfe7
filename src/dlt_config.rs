// Benchmark Configuration

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::dlt_error::BenchError;
use crate::dlt_interface::ReplicationSeed;
use crate::dlt_models::{fits_duration, AccountChainParams, DagLedgerParams};

/// Prefix of the environment variables that override a loaded configuration
pub const ENV_PREFIX: &str = "BENCH_";

/// Main benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Operations in the latency scenario
    pub iterations: usize,

    /// Concurrent operations in the throughput scenario
    pub batch_size: usize,

    /// Batch sizes swept by the scalability scenario
    pub batch_sizes: Vec<usize>,

    /// Independent seeded replications
    pub replications: usize,

    /// Seed of the first replication; replication i uses seed_start + i
    pub seed_start: ReplicationSeed,

    /// Run on a paused runtime clock that jumps straight to the next wakeup
    pub virtual_clock: bool,

    /// Submit latency scenario operations one at a time instead of all at once
    pub sequential_latency: bool,

    pub account_chain: AccountChainParams,
    pub dag_ledger: DagLedgerParams,

    /// Fraction of simulated submissions rejected per network
    pub account_chain_failure_prob: f64,
    pub dag_ledger_failure_prob: f64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            batch_size: 1000,
            batch_sizes: vec![10, 100, 1000, 10_000],
            replications: 30,
            seed_start: 1,
            virtual_clock: true,
            sequential_latency: false,
            account_chain: AccountChainParams::default(),
            dag_ledger: DagLedgerParams::default(),
            account_chain_failure_prob: 0.0,
            dag_ledger_failure_prob: 0.0,
        }
    }
}

/// Values read from `BENCH_*` environment variables
#[derive(Debug, Default, Deserialize)]
pub struct EnvOverrides {
    pub replications: Option<usize>,
    pub seed_start: Option<ReplicationSeed>,
    pub iterations: Option<usize>,
    pub batch_size: Option<usize>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, BenchError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<EnvOverrides>()?)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, BenchError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, EnvOverrides>(pairs)?)
    }
}

impl BenchConfig {
    /// Load a YAML scenario file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self, BenchError> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, BenchError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn apply_env(&mut self, overrides: &EnvOverrides) {
        if let Some(v) = overrides.replications {
            self.replications = v;
        }
        if let Some(v) = overrides.seed_start {
            self.seed_start = v;
        }
        if let Some(v) = overrides.iterations {
            self.iterations = v;
        }
        if let Some(v) = overrides.batch_size {
            self.batch_size = v;
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        let invalid = |msg: String| Err(BenchError::InvalidConfig(msg));

        if self.replications == 0 {
            return invalid("replications must be at least 1".into());
        }
        if self.iterations == 0 {
            return invalid("iterations must be at least 1".into());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        if self.batch_sizes.is_empty() || self.batch_sizes.contains(&0) {
            return invalid(format!(
                "batch_sizes must be non-empty and positive, got {:?}",
                self.batch_sizes
            ));
        }
        if self.seed_start.checked_add(self.replications as u64 - 1).is_none() {
            return invalid(format!("seed range starting at {} overflows", self.seed_start));
        }

        let chain = &self.account_chain;
        let p = chain.inclusion_prob_per_block;
        if !(p > 0.0 && p <= 1.0) {
            return invalid(format!("inclusion_prob_per_block must be in (0, 1], got {}", p));
        }
        let confirm_ms = chain.soft_confirm_blocks as f64 * chain.block_time_ms;
        if !fits_duration(chain.block_time_ms) || !fits_duration(confirm_ms) {
            return invalid(format!(
                "block_time_ms {} x soft_confirm_blocks {} is not a valid delay",
                chain.block_time_ms, chain.soft_confirm_blocks
            ));
        }

        for (name, prob) in [
            ("account_chain_failure_prob", self.account_chain_failure_prob),
            ("dag_ledger_failure_prob", self.dag_ledger_failure_prob),
            ("account_chain.rtt_spike.prob", chain.rtt_spike.prob),
            ("dag_ledger.gossip_spike.prob", self.dag_ledger.gossip_spike.prob),
        ] {
            if !(0.0..=1.0).contains(&prob) {
                return invalid(format!("{} must be in [0, 1], got {}", name, prob));
            }
        }

        let dag = &self.dag_ledger;
        let positive_delay = |ms: f64| ms > 0.0 && fits_duration(ms);
        for (name, delay) in [
            ("account_chain.rtt", &chain.rtt),
            ("dag_ledger.gossip", &dag.gossip),
        ] {
            if !(positive_delay(delay.median_ms) && positive_delay(delay.p95_ms)) {
                return invalid(format!("{} median and p95 must be positive and finite", name));
            }
        }
        for (name, spike) in [
            ("account_chain.rtt_spike", &chain.rtt_spike),
            ("dag_ledger.gossip_spike", &dag.gossip_spike),
        ] {
            if !(fits_duration(spike.min_ms) && fits_duration(spike.max_ms)) {
                return invalid(format!("{} bounds must be finite and non-negative", name));
            }
            if spike.min_ms > spike.max_ms {
                return invalid(format!(
                    "{} min {} exceeds max {}",
                    name, spike.min_ms, spike.max_ms
                ));
            }
        }

        let solid = &dag.solidification;
        if !(solid.mean.is_finite() && fits_duration(solid.sd)) {
            return invalid("solidification mean and sd must be finite".into());
        }
        if !(fits_duration(solid.min) && fits_duration(solid.max)) {
            return invalid("solidification bounds must be finite and non-negative".into());
        }
        if solid.min > solid.max {
            return invalid(format!("solidification min {} exceeds max {}", solid.min, solid.max));
        }

        let confirmation = &dag.confirmation;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(confirmation.shape) && positive(confirmation.scale)) {
            return invalid(
                "confirmation gamma shape and scale must be positive and finite".into(),
            );
        }

        Ok(())
    }

    /// Seeds of every replication, in run order
    pub fn seeds(&self) -> Vec<ReplicationSeed> {
        (0..self.replications as u64).map(|i| self.seed_start + i).collect()
    }
}
