//! Statistical Aggregator
//!
//! Reduces each per-replication sample array to a mean with a 95% confidence
//! interval under the normal approximation.

use indexmap::IndexMap;
use serde::Serialize;

use crate::dlt_interface::ReplicationSeed;
use crate::dlt_replication::MetricsBag;

/// z value of the two-sided 95% normal interval
pub const Z_95_TWO_SIDED: f64 = 1.96;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistic {
    pub n: usize,
    pub mean: f64,
    /// Unbiased sample variance, 0 with fewer than two samples
    pub variance: f64,
    pub std: f64,
    pub ci95: [f64; 2],
}

impl SummaryStatistic {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n < 2 {
            0.0
        } else {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        };
        let std = variance.sqrt();
        let half_width = Z_95_TWO_SIDED * (std / (n as f64).sqrt());

        Some(Self {
            n,
            mean,
            variance,
            std,
            ci95: [mean - half_width, mean + half_width],
        })
    }

    pub fn half_width(&self) -> f64 {
        (self.ci95[1] - self.ci95[0]) / 2.0
    }
}

pub type MetricStats = IndexMap<String, SummaryStatistic>;
pub type ScopeStats = IndexMap<String, MetricStats>;

/// Aggregated output handed to report emitters:
/// `section -> scope -> metric -> SummaryStatistic`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuiteReport {
    pub seeds: Vec<ReplicationSeed>,
    pub sections: IndexMap<String, ScopeStats>,
}

impl SuiteReport {
    pub fn get(&self, section: &str, scope: &str, metric: &str) -> Option<&SummaryStatistic> {
        self.sections.get(section)?.get(scope)?.get(metric)
    }

    pub fn replications(&self) -> usize {
        self.seeds.len()
    }

    /// Number of (section, scope, metric) entries
    pub fn entries(&self) -> usize {
        self.sections
            .values()
            .flat_map(|scopes| scopes.values())
            .map(|metrics| metrics.len())
            .sum()
    }

    /// Print the compact CI95 listing for every section
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Replicated Suite Results (CI95 normal)         ║");
        println!("╚════════════════════════════════════════════════════════╝\n");
        println!("Replications: {} (seeds {:?})", self.seeds.len(), self.seeds);

        for (section, scopes) in &self.sections {
            println!("\n{}\n{}", section.to_uppercase(), "-".repeat(70));
            for (scope, metrics) in scopes {
                println!("\n  ▶ {}", scope);
                for (metric, s) in metrics {
                    let unit = metric_unit(metric);
                    println!(
                        "    - {}: mean={:.2}{}, var={:.2}{}^2, IC95=[{:.2}, {:.2}]{} (n={})",
                        metric, s.mean, unit, s.variance, unit, s.ci95[0], s.ci95[1], unit, s.n
                    );
                }
            }
        }
        println!();
    }
}

fn metric_unit(metric: &str) -> &'static str {
    match metric {
        "tps" => " TPS",
        "avgLatency" | "p95Latency" => " ms",
        "successRate" => " %",
        _ => "",
    }
}

/// Reduce every bag entry. Entries keep the order in which they first appeared.
pub fn aggregate(bag: &MetricsBag, seeds: &[ReplicationSeed]) -> SuiteReport {
    let mut report = SuiteReport {
        seeds: seeds.to_vec(),
        sections: IndexMap::new(),
    };

    for (key, metrics) in bag.iter() {
        for (metric, samples) in metrics {
            let Some(stat) = SummaryStatistic::from_samples(samples) else {
                continue;
            };
            report
                .sections
                .entry(key.section().to_string())
                .or_default()
                .entry(key.scope())
                .or_default()
                .insert(metric.to_string(), stat);
        }
    }

    report
}
