//! Metrics Accumulator
//!
//! Collects one `SampleRecord` per submitted operation and derives summary
//! statistics from them. Percentiles are read from the sorted values at index
//! `floor(n * q)` without interpolation.

use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::dlt_error::OperationError;
use crate::dlt_interface::{Millis, OperationOutcome, PhaseBreakdown};
use crate::dlt_models::elapsed_ms;

/// One operation outcome. Absent fields stay absent; they are never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    /// Milliseconds since the collector was created, on the runtime clock
    pub timestamp_ms: Millis,
    pub latency_ms: Option<Millis>,
    pub success: bool,
    pub cpu_time_ms: Option<Millis>,
    pub gas_used: Option<f64>,
    pub tx_id: Option<String>,
    pub breakdown: Option<PhaseBreakdown>,
    pub error: Option<String>,
}

/// min / max / mean / median / p95 / p99 of one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub count: usize,
}

impl DistributionStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let sum: f64 = values.iter().sum();

        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean: sum / n as f64,
            median: sorted[n / 2],
            p95: sorted[percentile_index(n, 0.95)],
            p99: sorted[percentile_index(n, 0.99)],
            count: n,
        })
    }
}

fn percentile_index(n: usize, q: f64) -> usize {
    ((n as f64 * q).floor() as usize).min(n - 1)
}

/// Derived view over everything recorded so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_transactions: usize,
    /// Percentage of successful operations, 0 when nothing was recorded
    pub success_rate: f64,
    pub latency: Option<DistributionStats>,
    /// Operations per second between the first and last record
    pub throughput: f64,
    pub gas: Option<DistributionStats>,
    pub cpu: Option<DistributionStats>,
    /// Mean rounded milliseconds per confirmation phase
    pub phase_means: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsExport {
    pub summary: Summary,
    pub raw_data: Vec<SampleRecord>,
}

pub struct MetricsCollector {
    epoch: Instant,
    records: Vec<SampleRecord>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            records: Vec::new(),
        }
    }

    /// Append a completed operation, stamped with the current runtime time
    pub fn record(&mut self, outcome: OperationOutcome) {
        self.records.push(SampleRecord {
            timestamp_ms: elapsed_ms(self.epoch),
            latency_ms: outcome.latency_ms,
            success: outcome.success,
            cpu_time_ms: outcome.cpu_time_ms,
            gas_used: outcome.gas_used,
            tx_id: outcome.tx_id,
            breakdown: outcome.breakdown,
            error: None,
        });
    }

    /// Append a failed operation
    pub fn record_failure(&mut self, error: &OperationError) {
        self.records.push(SampleRecord {
            timestamp_ms: elapsed_ms(self.epoch),
            latency_ms: None,
            success: false,
            cpu_time_ms: None,
            gas_used: None,
            tx_id: None,
            breakdown: None,
            error: Some(error.to_string()),
        });
    }

    pub fn record_result(&mut self, result: Result<OperationOutcome, OperationError>) {
        match result {
            Ok(outcome) => self.record(outcome),
            Err(e) => self.record_failure(&e),
        }
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.records.len();
        if total == 0 {
            return 0.0;
        }
        let successful = self.records.iter().filter(|r| r.success).count();
        successful as f64 / total as f64 * 100.0
    }

    pub fn latency_stats(&self) -> Option<DistributionStats> {
        self.field_stats(|r| r.latency_ms)
    }

    pub fn gas_stats(&self) -> Option<DistributionStats> {
        self.field_stats(|r| r.gas_used)
    }

    pub fn cpu_stats(&self) -> Option<DistributionStats> {
        self.field_stats(|r| r.cpu_time_ms)
    }

    pub fn throughput(&self) -> f64 {
        let (Some(first), Some(last)) = (self.records.first(), self.records.last()) else {
            return 0.0;
        };
        if self.records.len() < 2 {
            return 0.0;
        }
        let elapsed_secs = (last.timestamp_ms - first.timestamp_ms) / 1000.0;
        if elapsed_secs > 0.0 {
            self.records.len() as f64 / elapsed_secs
        } else {
            0.0
        }
    }

    pub fn phase_means(&self) -> IndexMap<String, f64> {
        let mut sums: IndexMap<String, (f64, usize)> = IndexMap::new();
        for breakdown in self.records.iter().filter_map(|r| r.breakdown.as_ref()) {
            for (phase, ms) in &breakdown.phases {
                let entry = sums.entry(phase.to_string()).or_insert((0.0, 0));
                entry.0 += *ms as f64;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(phase, (sum, count))| (phase, sum / count as f64))
            .collect()
    }

    pub fn summarize(&self) -> Summary {
        Summary {
            total_transactions: self.records.len(),
            success_rate: self.success_rate(),
            latency: self.latency_stats(),
            throughput: self.throughput(),
            gas: self.gas_stats(),
            cpu: self.cpu_stats(),
            phase_means: self.phase_means(),
        }
    }

    pub fn export(&self) -> MetricsExport {
        MetricsExport {
            summary: self.summarize(),
            raw_data: self.records.clone(),
        }
    }

    fn field_stats(
        &self,
        field: impl Fn(&SampleRecord) -> Option<f64>,
    ) -> Option<DistributionStats> {
        let values: Vec<f64> = self.records.iter().filter_map(field).collect();
        DistributionStats::from_values(&values)
    }
}
