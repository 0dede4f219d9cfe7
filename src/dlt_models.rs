//! Network Latency Models
//!
//! Staged confirmation pipelines for the two ledger architectures. Each phase
//! draws its delay from the sampler and then waits on the runtime clock, so
//! concurrent operations interleave at phase boundaries the same way real
//! submissions would. With a paused runtime clock the waits cost nothing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::dlt_distributions::{
    gamma, geometric_blocks, log_normal, maybe_spike, truncated_normal, LogNormalParams,
    SpikeParams,
};
use crate::dlt_interface::{Millis, PhaseBreakdown};
use crate::dlt_random::RandomSource;

pub const PHASE_RTT: &str = "rtt";
pub const PHASE_INCLUSION: &str = "inclusion";
pub const PHASE_GOSSIP: &str = "gossip";
pub const PHASE_SOLIDIFICATION: &str = "solidification";
pub const PHASE_CONFIRMATION: &str = "confirmation";

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountChainParams {
    pub inclusion_prob_per_block: f64,
    pub block_time_ms: f64,
    pub soft_confirm_blocks: u64,
    pub rtt: LogNormalParams,
    pub rtt_spike: SpikeParams,
}

impl Default for AccountChainParams {
    fn default() -> Self {
        Self {
            inclusion_prob_per_block: 0.8,
            block_time_ms: 12_000.0,
            soft_confirm_blocks: 1,
            rtt: LogNormalParams {
                median_ms: 90.0,
                p95_ms: 250.0,
            },
            rtt_spike: SpikeParams {
                prob: 0.01,
                min_ms: 400.0,
                max_ms: 1500.0,
            },
        }
    }
}

/// Truncated normal delay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedNormalParams {
    pub mean: f64,
    pub sd: f64,
    pub min: f64,
    pub max: f64,
}

/// Gamma delay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaParams {
    pub shape: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagLedgerParams {
    pub gossip: LogNormalParams,
    pub gossip_spike: SpikeParams,
    pub solidification: TruncatedNormalParams,
    pub confirmation: GammaParams,
}

impl Default for DagLedgerParams {
    fn default() -> Self {
        Self {
            gossip: LogNormalParams {
                median_ms: 70.0,
                p95_ms: 180.0,
            },
            gossip_spike: SpikeParams {
                prob: 0.01,
                min_ms: 200.0,
                max_ms: 800.0,
            },
            solidification: TruncatedNormalParams {
                mean: 180.0,
                sd: 60.0,
                min: 80.0,
                max: 400.0,
            },
            confirmation: GammaParams {
                shape: 3.0,
                scale: 270.0,
            },
        }
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AccountChainLatency {
    pub network_rtt_ms: u64,
    pub blocks_to_inclusion: u64,
    pub inclusion_delay_ms: Millis,
    pub confirm_delay_ms: Millis,
    /// Elapsed on the runtime clock across all phases
    pub total_ms: Millis,
    pub breakdown: PhaseBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DagLedgerLatency {
    pub gossip_ms: u64,
    pub solidification_ms: u64,
    pub confirmation_ms: u64,
    /// Elapsed on the runtime clock across all phases
    pub total_ms: Millis,
    pub breakdown: PhaseBreakdown,
}

/// Wait length for a sampled delay. Negative and NaN delays wait nothing;
/// delays beyond what a `Duration` holds saturate.
pub(crate) fn millis(ms: Millis) -> Duration {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
}

/// True when `ms` is a finite, non-negative delay that converts to a `Duration`
pub(crate) fn fits_duration(ms: Millis) -> bool {
    ms.is_finite() && ms >= 0.0 && Duration::try_from_secs_f64(ms / 1000.0).is_ok()
}

pub(crate) fn elapsed_ms(start: Instant) -> Millis {
    start.elapsed().as_secs_f64() * 1000.0
}

// ============================================================================
// Models
// ============================================================================

/// RTT to the node, blocks until inclusion, then soft confirmation blocks
pub async fn simulate_account_chain(
    rng: &RandomSource,
    params: &AccountChainParams,
) -> AccountChainLatency {
    let start = Instant::now();

    let rtt = rng.with(|r| {
        let rtt = log_normal(r, params.rtt.median_ms, params.rtt.p95_ms);
        maybe_spike(r, rtt, &params.rtt_spike)
    });
    sleep(millis(rtt)).await;

    let blocks_to_inclusion = rng.with(|r| geometric_blocks(r, params.inclusion_prob_per_block));
    let inclusion_delay_ms = blocks_to_inclusion as f64 * params.block_time_ms;
    sleep(millis(inclusion_delay_ms)).await;

    let confirm_delay_ms = params.soft_confirm_blocks as f64 * params.block_time_ms;
    sleep(millis(confirm_delay_ms)).await;

    let network_rtt_ms = rtt.round() as u64;
    let mut breakdown = PhaseBreakdown::default();
    breakdown.push(PHASE_RTT, network_rtt_ms);
    breakdown.push(PHASE_INCLUSION, inclusion_delay_ms.round() as u64);
    breakdown.push(PHASE_CONFIRMATION, confirm_delay_ms.round() as u64);

    AccountChainLatency {
        network_rtt_ms,
        blocks_to_inclusion,
        inclusion_delay_ms,
        confirm_delay_ms,
        total_ms: elapsed_ms(start),
        breakdown,
    }
}

/// Gossip propagation, solidification, then confirmation
pub async fn simulate_dag_ledger(rng: &RandomSource, params: &DagLedgerParams) -> DagLedgerLatency {
    let start = Instant::now();

    let gossip = rng.with(|r| {
        let gossip = log_normal(r, params.gossip.median_ms, params.gossip.p95_ms);
        maybe_spike(r, gossip, &params.gossip_spike)
    });
    sleep(millis(gossip)).await;

    let solid = &params.solidification;
    let solidification =
        rng.with(|r| truncated_normal(r, solid.mean, solid.sd, solid.min, solid.max));
    sleep(millis(solidification)).await;

    let confirmation =
        rng.with(|r| gamma(r, params.confirmation.shape, params.confirmation.scale));
    sleep(millis(confirmation)).await;

    let gossip_ms = gossip.round() as u64;
    let solidification_ms = solidification.round() as u64;
    let confirmation_ms = confirmation.round() as u64;

    let mut breakdown = PhaseBreakdown::default();
    breakdown.push(PHASE_GOSSIP, gossip_ms);
    breakdown.push(PHASE_SOLIDIFICATION, solidification_ms);
    breakdown.push(PHASE_CONFIRMATION, confirmation_ms);

    DagLedgerLatency {
        gossip_ms,
        solidification_ms,
        confirmation_ms,
        total_ms: elapsed_ms(start),
        breakdown,
    }
}
