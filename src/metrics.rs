use crate::results::{BenchmarkResult, Percentile, TransactionCounts};
use serde::Serialize;

pub fn micros_to_millis(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyPoint {
    pub percentile: Percentile,
    pub millis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixShare {
    pub name: String,
    pub count: u64,
    pub percentage: f64,
    pub success_rate: f64,
}

/// Display-ready values shared by every figure.
///
/// Latencies are in milliseconds and unrounded; rounding happens when labels
/// are formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub tpmc: f64,
    pub tps: f64,
    pub success_rate: f64,
    pub transactions: TransactionCounts,
    /// One point per percentile, in [`Percentile::all`] order
    pub latency_ms: Vec<LatencyPoint>,
    pub mean_latency_ms: f64,
    pub std_dev_latency_ms: f64,
    pub mix: Vec<MixShare>,
    pub mvcc_conflict_rate: f64,
    pub trust_premium: f64,
    pub baseline_latency_ms: f64,
}

impl DerivedMetrics {
    pub fn compute(result: &BenchmarkResult) -> Self {
        let latency_ms = Percentile::all()
            .iter()
            .map(|&percentile| LatencyPoint {
                percentile,
                millis: micros_to_millis(result.latency.get(percentile)),
            })
            .collect();

        let mix = result
            .tx_mix
            .iter()
            .map(|entry| MixShare {
                name: entry.name.clone(),
                count: entry.count,
                percentage: entry.percentage,
                success_rate: entry.success_rate,
            })
            .collect();

        Self {
            tpmc: result.tpmc,
            tps: result.tps,
            success_rate: result.success_rate,
            transactions: result.transactions,
            latency_ms,
            mean_latency_ms: micros_to_millis(result.latency.mean),
            std_dev_latency_ms: micros_to_millis(result.latency.std_dev),
            mix,
            mvcc_conflict_rate: result.mvcc_conflict_rate,
            trust_premium: result.trust_premium,
            baseline_latency_ms: result.baseline_latency_ms,
        }
    }

    pub fn latency(&self, percentile: Percentile) -> f64 {
        self.latency_ms
            .iter()
            .find(|p| p.percentile == percentile)
            .map(|p| p.millis)
            .unwrap_or_default()
    }
}
