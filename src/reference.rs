//! Measured GridTokenX TPC-C results and the platforms they are compared against.

use crate::results::{
    BenchmarkRecord, BenchmarkResult, LatencyDistribution, PlatformComparison, PlatformEntry,
    TransactionCounts, TransactionMixEntry, ValidationError,
};

/// Capacity-planning assumption drawn as a target line on throughput charts.
///
/// Taken as given; there is no formula behind the figure.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityTarget {
    pub households: u64,
    pub required_tps: f64,
}

impl CapacityTarget {
    pub fn label(&self) -> String {
        format!(
            "Required: {} TPS for {} households",
            self.required_tps,
            group_thousands(self.households)
        )
    }
}

impl Default for CapacityTarget {
    fn default() -> Self {
        Self {
            households: 10_000,
            required_tps: 11.0,
        }
    }
}

/// Format an integer with `,` thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn mix_entry(name: &str, count: u64, percentage: f64, success_rate: f64) -> TransactionMixEntry {
    TransactionMixEntry {
        name: name.to_string(),
        count,
        percentage,
        success_rate,
    }
}

pub fn benchmark_record() -> BenchmarkRecord {
    BenchmarkRecord {
        tpmc: 2076.0,
        tps: 77.2,
        success_rate: 99.89,
        transactions: TransactionCounts {
            total: 4637,
            successful: 4632,
            failed: 5,
        },
        latency: LatencyDistribution {
            mean: 116_969,
            std_dev: 37_117,
            min: 33_083,
            p50: 113_287,
            p75: 138_999,
            p90: 167_425,
            p95: 180_869,
            p99: 226_657,
            p999: 269_370,
            max: 273_706,
        },
        tx_mix: vec![
            mix_entry("NEW_ORDER", 2078, 44.8, 99.9),
            mix_entry("PAYMENT", 2009, 43.3, 99.9),
            mix_entry("ORDER_STATUS", 191, 4.1, 100.0),
            mix_entry("DELIVERY", 175, 3.8, 100.0),
            mix_entry("STOCK_LEVEL", 184, 4.0, 100.0),
        ],
        mvcc_conflict_rate: 1.81,
        trust_premium: 58.48,
        baseline_latency_ms: 2.0,
    }
}

pub fn benchmark_result() -> Result<BenchmarkResult, ValidationError> {
    BenchmarkResult::new(benchmark_record())
}

fn platform(name: &str, latency_ms: f64, tps: f64, trust_premium: f64) -> PlatformEntry {
    PlatformEntry {
        name: name.to_string(),
        latency_ms,
        tps,
        trust_premium,
    }
}

pub fn platform_comparison_entries() -> Vec<PlatformEntry> {
    vec![
        platform("GridTokenX", 117.0, 77.0, 58.5),
        platform("Hyperledger Fabric", 350.0, 200.0, 175.0),
        platform("Ethereum (PoS)", 12_000.0, 30.0, 6000.0),
        platform("PostgreSQL", 2.0, 5000.0, 1.0),
    ]
}

pub fn platform_comparison() -> Result<PlatformComparison, ValidationError> {
    PlatformComparison::new(platform_comparison_entries())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(2076), "2,076");
        assert_eq!(group_thousands(10_000), "10,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_capacity_target_label() {
        assert_eq!(
            CapacityTarget::default().label(),
            "Required: 11 TPS for 10,000 households"
        );
    }

    #[test]
    fn test_mix_counts_cover_all_transactions() {
        let record = benchmark_record();
        let mix_total: u64 = record.tx_mix.iter().map(|e| e.count).sum();
        assert_eq!(mix_total, record.transactions.total);
    }
}
