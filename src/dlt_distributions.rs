//! Distribution Sampler
//!
//! Stateless sampling primitives used by the latency models. Every function
//! draws from the generator it is given and nothing else, and every function is
//! total over its documented inputs: degenerate cases fall back to clamping
//! instead of failing.

use std::f64::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inverse CDF of the standard normal at 0.95
pub const Z_95: f64 = 1.6448536269514722;

/// Rejection attempts before `truncated_normal` falls back to the clamped mean
pub const TRUNCATED_NORMAL_ATTEMPTS: usize = 10;

/// Median / 95th percentile pair describing a log-normal delay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogNormalParams {
    pub median_ms: f64,
    pub p95_ms: f64,
}

/// Occasional network incident added on top of a delay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeParams {
    pub prob: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl Default for SpikeParams {
    fn default() -> Self {
        Self {
            prob: 0.02,
            min_ms: 300.0,
            max_ms: 1200.0,
        }
    }
}

// 1 - u keeps the draw in (0, 1] so ln() never sees zero
fn open_uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    1.0 - rng.gen::<f64>()
}

/// Box-Muller standard normal deviate
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u = open_uniform(rng);
    let v = open_uniform(rng);
    (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
}

/// Log-normal delay parameterised by its median and 95th percentile, floored at 1ms
pub fn log_normal<R: Rng + ?Sized>(rng: &mut R, median_ms: f64, p95_ms: f64) -> f64 {
    let mu = median_ms.ln();
    let sigma = (p95_ms.ln() - mu) / Z_95;
    let value = (mu + sigma * standard_normal(rng)).exp();
    value.max(1.0)
}

/// Normal draw restricted to `[min, max]`.
///
/// Tries `TRUNCATED_NORMAL_ATTEMPTS` draws and then returns the mean clamped to
/// the interval, so the cost of a call is bounded.
pub fn truncated_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    sd: f64,
    min: f64,
    max: f64,
) -> f64 {
    for _ in 0..TRUNCATED_NORMAL_ATTEMPTS {
        let x = mean + sd * standard_normal(rng);
        if x >= min && x <= max {
            return x;
        }
    }
    max.min(min.max(mean))
}

/// Number of blocks until inclusion, each block including with probability `p`
pub fn geometric_blocks<R: Rng + ?Sized>(rng: &mut R, p: f64) -> u64 {
    let mut blocks = 1;
    while rng.gen::<f64>() > p {
        blocks += 1;
    }
    blocks
}

/// Marsaglia-Tsang gamma deviate
pub fn gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, scale: f64) -> f64 {
    if shape < 1.0 {
        let u: f64 = rng.gen();
        return gamma(rng, shape + 1.0, scale) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let x = standard_normal(rng);
        let mut v = 1.0 + c * x;
        if v <= 0.0 {
            continue;
        }
        v = v * v * v;
        let u: f64 = rng.gen();
        if u < 1.0 - 0.331 * x.powi(4) {
            return d * v * scale;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v * scale;
        }
    }
}

/// With probability `spike.prob`, add a uniform delay in `[spike.min_ms, spike.max_ms]`
pub fn maybe_spike<R: Rng + ?Sized>(rng: &mut R, ms: f64, spike: &SpikeParams) -> f64 {
    if rng.gen::<f64>() < spike.prob {
        return ms + (spike.min_ms + rng.gen::<f64>() * (spike.max_ms - spike.min_ms));
    }
    ms
}
