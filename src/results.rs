use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Deref;
use thiserror::Error;

/// Allowed distance of the transaction-mix percentage sum from 100.
pub const MIX_SUM_TOLERANCE: f64 = 0.5;

/// Trust premium of the reference (non-trust-augmented) platform.
pub const BASELINE_TRUST_PREMIUM: f64 = 1.0;

/// Errors raised when a benchmark or comparison record is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("transactions: successful ({successful}) + failed ({failed}) != total ({total})")]
    TransactionCountMismatch {
        total: u64,
        successful: u64,
        failed: u64,
    },
    #[error("latency: {upper} ({upper_us}us) is lower than {lower} ({lower_us}us)")]
    LatencyNotAscending {
        lower: Percentile,
        upper: Percentile,
        lower_us: u64,
        upper_us: u64,
    },
    #[error("latency.mean: {mean_us}us lies outside [{min_us}us, {max_us}us]")]
    MeanOutOfRange { mean_us: u64, min_us: u64, max_us: u64 },
    #[error("tx_mix: at least one transaction type is required")]
    EmptyTransactionMix,
    #[error("tx_mix: duplicate transaction type {0:?}")]
    DuplicateTransactionType(String),
    #[error("{field}: {value} is not a percentage in [0, 100]")]
    PercentageOutOfRange { field: String, value: f64 },
    #[error("tx_mix: percentages sum to {sum:.2}, expected 100 +/- 0.5")]
    MixPercentagesSum { sum: f64 },
    #[error("{field}: {value} must be a finite, non-negative number")]
    NegativeMetric { field: &'static str, value: f64 },
    #[error("comparison: at least one platform is required")]
    EmptyComparison,
    #[error("comparison: duplicate platform {0:?}")]
    DuplicatePlatform(String),
    #[error("comparison.{platform}.{field}: {value} must be positive")]
    NonPositivePlatformValue {
        platform: String,
        field: &'static str,
        value: f64,
    },
}

/// Named latency percentile points, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Percentile {
    Min,
    P50,
    P75,
    P90,
    P95,
    P99,
    P999,
    Max,
}

impl Percentile {
    pub fn all() -> &'static [Percentile] {
        &[
            Percentile::Min,
            Percentile::P50,
            Percentile::P75,
            Percentile::P90,
            Percentile::P95,
            Percentile::P99,
            Percentile::P999,
            Percentile::Max,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Percentile::Min => "Min",
            Percentile::P50 => "p50",
            Percentile::P75 => "p75",
            Percentile::P90 => "p90",
            Percentile::P95 => "p95",
            Percentile::P99 => "p99",
            Percentile::P999 => "p99.9",
            Percentile::Max => "Max",
        }
    }
}

impl std::fmt::Display for Percentile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCounts {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

/// Latency summary, all values in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyDistribution {
    pub mean: u64,
    pub std_dev: u64,
    pub min: u64,
    pub p50: u64,
    pub p75: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

impl LatencyDistribution {
    pub fn get(&self, percentile: Percentile) -> u64 {
        match percentile {
            Percentile::Min => self.min,
            Percentile::P50 => self.p50,
            Percentile::P75 => self.p75,
            Percentile::P90 => self.p90,
            Percentile::P95 => self.p95,
            Percentile::P99 => self.p99,
            Percentile::P999 => self.p999,
            Percentile::Max => self.max,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for pair in Percentile::all().windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if self.get(upper) < self.get(lower) {
                return Err(ValidationError::LatencyNotAscending {
                    lower,
                    upper,
                    lower_us: self.get(lower),
                    upper_us: self.get(upper),
                });
            }
        }

        if self.mean < self.min || self.mean > self.max {
            return Err(ValidationError::MeanOutOfRange {
                mean_us: self.mean,
                min_us: self.min,
                max_us: self.max,
            });
        }

        Ok(())
    }
}

/// One transaction type of the TPC-C mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMixEntry {
    pub name: String,
    pub count: u64,
    /// Share of all transactions, in percent
    pub percentage: f64,
    /// Success rate of this transaction type, in percent
    pub success_rate: f64,
}

/// Unvalidated benchmark results, as written down or deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub tpmc: f64,
    pub tps: f64,
    pub success_rate: f64,
    pub transactions: TransactionCounts,
    pub latency: LatencyDistribution,
    pub tx_mix: Vec<TransactionMixEntry>,
    pub mvcc_conflict_rate: f64,
    pub trust_premium: f64,
    pub baseline_latency_ms: f64,
}

/// Validated, read-only benchmark results.
///
/// Only obtainable through [`BenchmarkResult::new`], so every instance satisfies
/// the count, ordering and percentage invariants checked there.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BenchmarkResult(BenchmarkRecord);

impl BenchmarkResult {
    pub fn new(record: BenchmarkRecord) -> Result<Self, ValidationError> {
        check_non_negative("tpmc", record.tpmc)?;
        check_non_negative("tps", record.tps)?;
        check_non_negative("mvcc_conflict_rate", record.mvcc_conflict_rate)?;
        check_non_negative("trust_premium", record.trust_premium)?;
        check_non_negative("baseline_latency_ms", record.baseline_latency_ms)?;
        check_percentage("success_rate", record.success_rate)?;

        let tx = record.transactions;
        if tx.successful.checked_add(tx.failed) != Some(tx.total) {
            return Err(ValidationError::TransactionCountMismatch {
                total: tx.total,
                successful: tx.successful,
                failed: tx.failed,
            });
        }

        record.latency.validate()?;
        validate_mix(&record.tx_mix)?;

        Ok(Self(record))
    }
}

impl Deref for BenchmarkResult {
    type Target = BenchmarkRecord;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn validate_mix(mix: &[TransactionMixEntry]) -> Result<(), ValidationError> {
    if mix.is_empty() {
        return Err(ValidationError::EmptyTransactionMix);
    }

    let mut seen = HashSet::new();
    for entry in mix {
        if !seen.insert(entry.name.as_str()) {
            return Err(ValidationError::DuplicateTransactionType(entry.name.clone()));
        }
        check_percentage(&format!("tx_mix.{}.percentage", entry.name), entry.percentage)?;
        check_percentage(&format!("tx_mix.{}.success_rate", entry.name), entry.success_rate)?;
    }

    let sum: f64 = mix.iter().map(|e| e.percentage).sum();
    if (sum - 100.0).abs() > MIX_SUM_TOLERANCE {
        return Err(ValidationError::MixPercentagesSum { sum });
    }

    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeMetric { field, value })
    }
}

fn check_percentage(field: &str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::PercentageOutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

/// A platform the benchmarked system is compared against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub name: String,
    pub latency_ms: f64,
    pub tps: f64,
    /// Latency ratio relative to the baseline platform
    pub trust_premium: f64,
}

/// Ordered list of platforms. The first entry is the benchmarked system itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformComparison {
    entries: Vec<PlatformEntry>,
}

impl PlatformComparison {
    pub fn new(entries: Vec<PlatformEntry>) -> Result<Self, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::EmptyComparison);
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(ValidationError::DuplicatePlatform(entry.name.clone()));
            }
            // All three are drawn on log axes
            for (field, value) in [
                ("latency_ms", entry.latency_ms),
                ("tps", entry.tps),
                ("trust_premium", entry.trust_premium),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ValidationError::NonPositivePlatformValue {
                        platform: entry.name.clone(),
                        field,
                        value,
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PlatformEntry] {
        &self.entries
    }

    /// The benchmarked platform (first entry).
    pub fn own(&self) -> &PlatformEntry {
        &self.entries[0]
    }

    /// The reference platform whose trust premium is exactly 1, if listed.
    pub fn baseline(&self) -> Option<&PlatformEntry> {
        self.entries.iter().find(|e| is_baseline(e))
    }

    /// Returns the first entry when its trust premium is strictly lower than
    /// every other non-baseline entry.
    pub fn preferred(&self) -> Option<&PlatformEntry> {
        let own = self.own();
        if is_baseline(own) {
            return None;
        }

        let beats_all = self.entries[1..]
            .iter()
            .filter(|e| !is_baseline(e))
            .all(|e| own.trust_premium < e.trust_premium);

        beats_all.then_some(own)
    }
}

fn is_baseline(entry: &PlatformEntry) -> bool {
    (entry.trust_premium - BASELINE_TRUST_PREMIUM).abs() < f64::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;
    use proptest::prelude::*;

    fn latency_from(values: [u64; 8]) -> LatencyDistribution {
        LatencyDistribution {
            mean: values[1],
            std_dev: 0,
            min: values[0],
            p50: values[1],
            p75: values[2],
            p90: values[3],
            p95: values[4],
            p99: values[5],
            p999: values[6],
            max: values[7],
        }
    }

    #[test]
    fn test_reference_record_is_valid() {
        let result = reference::benchmark_result().unwrap();
        assert_eq!(result.transactions.total, 4637);
        assert_eq!(result.latency.get(Percentile::P99), 226_657);
        assert_eq!(result.tx_mix.len(), 5);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let mut record = reference::benchmark_record();
        record.transactions.failed = 6;

        let err = BenchmarkResult::new(record).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TransactionCountMismatch {
                total: 4637,
                successful: 4632,
                failed: 6
            }
        );
        assert!(err.to_string().starts_with("transactions:"));
    }

    #[test]
    fn test_descending_latency_names_offending_percentiles() {
        let mut record = reference::benchmark_record();
        record.latency.p95 = record.latency.p99 + 1;

        match BenchmarkResult::new(record).unwrap_err() {
            ValidationError::LatencyNotAscending { lower, upper, .. } => {
                assert_eq!(lower, Percentile::P95);
                assert_eq!(upper, Percentile::P99);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mean_outside_range_rejected() {
        let mut record = reference::benchmark_record();
        record.latency.mean = record.latency.max + 1;
        assert!(matches!(
            BenchmarkResult::new(record),
            Err(ValidationError::MeanOutOfRange { .. })
        ));
    }

    #[test]
    fn test_mix_sum_out_of_tolerance_rejected() {
        let mut record = reference::benchmark_record();
        record.tx_mix[0].percentage += 1.0;
        assert!(matches!(
            BenchmarkResult::new(record),
            Err(ValidationError::MixPercentagesSum { .. })
        ));
    }

    #[test]
    fn test_empty_and_duplicate_mix_rejected() {
        let mut record = reference::benchmark_record();
        record.tx_mix.clear();
        assert_eq!(
            BenchmarkResult::new(record).unwrap_err(),
            ValidationError::EmptyTransactionMix
        );

        let mut record = reference::benchmark_record();
        let dup = record.tx_mix[0].clone();
        record.tx_mix.push(dup);
        assert_eq!(
            BenchmarkResult::new(record).unwrap_err(),
            ValidationError::DuplicateTransactionType("NEW_ORDER".to_string())
        );
    }

    #[test]
    fn test_negative_and_nan_metrics_rejected() {
        let mut record = reference::benchmark_record();
        record.mvcc_conflict_rate = -0.1;
        assert!(matches!(
            BenchmarkResult::new(record),
            Err(ValidationError::NegativeMetric {
                field: "mvcc_conflict_rate",
                ..
            })
        ));

        let mut record = reference::benchmark_record();
        record.trust_premium = f64::NAN;
        assert!(BenchmarkResult::new(record).is_err());
    }

    #[test]
    fn test_success_rate_out_of_range_names_field() {
        let mut record = reference::benchmark_record();
        record.tx_mix[2].success_rate = 100.5;

        let err = BenchmarkResult::new(record).unwrap_err();
        assert!(err.to_string().contains("tx_mix.ORDER_STATUS.success_rate"));
    }

    #[test]
    fn test_reference_comparison_prefers_own_platform() {
        let comparison = reference::platform_comparison().unwrap();
        let preferred = comparison.preferred().unwrap();
        assert_eq!(preferred.name, "GridTokenX");
        assert_eq!(preferred.trust_premium, 58.5);
        assert_eq!(comparison.baseline().unwrap().name, "PostgreSQL");
    }

    #[test]
    fn test_no_preferred_when_competitor_is_cheaper() {
        let mut entries = reference::platform_comparison_entries();
        entries[1].trust_premium = 40.0;
        let comparison = PlatformComparison::new(entries).unwrap();
        assert!(comparison.preferred().is_none());
    }

    #[test]
    fn test_baseline_first_is_never_preferred() {
        let mut entries = reference::platform_comparison_entries();
        entries.rotate_right(1);
        let comparison = PlatformComparison::new(entries).unwrap();
        assert_eq!(comparison.own().name, "PostgreSQL");
        assert!(comparison.preferred().is_none());
    }

    #[test]
    fn test_comparison_rejects_bad_entries() {
        assert_eq!(
            PlatformComparison::new(Vec::new()).unwrap_err(),
            ValidationError::EmptyComparison
        );

        let mut entries = reference::platform_comparison_entries();
        entries[2].tps = 0.0;
        assert!(matches!(
            PlatformComparison::new(entries),
            Err(ValidationError::NonPositivePlatformValue { field: "tps", .. })
        ));

        let mut entries = reference::platform_comparison_entries();
        entries[3].name = "GridTokenX".to_string();
        assert_eq!(
            PlatformComparison::new(entries).unwrap_err(),
            ValidationError::DuplicatePlatform("GridTokenX".to_string())
        );
    }

    proptest! {
        #[test]
        fn prop_counts_accepted_iff_they_add_up(
            successful in 0u64..1_000_000,
            failed in 0u64..1_000_000,
            total in 0u64..2_000_000,
        ) {
            let mut record = reference::benchmark_record();
            record.transactions = TransactionCounts { total, successful, failed };

            let result = BenchmarkResult::new(record);
            prop_assert_eq!(result.is_ok(), successful + failed == total);
            if let Ok(result) = result {
                prop_assert_eq!(
                    result.transactions.successful + result.transactions.failed,
                    result.transactions.total
                );
            }
        }

        #[test]
        fn prop_latency_accepted_iff_non_decreasing(
            values in proptest::array::uniform8(0u64..500_000)
        ) {
            let mut record = reference::benchmark_record();
            record.latency = latency_from(values);

            let ascending = values.windows(2).all(|w| w[0] <= w[1]);
            let result = BenchmarkResult::new(record);
            prop_assert_eq!(result.is_ok(), ascending);
            if let Ok(result) = result {
                let points: Vec<u64> = Percentile::all()
                    .iter()
                    .map(|&p| result.latency.get(p))
                    .collect();
                prop_assert!(points.windows(2).all(|w| w[0] <= w[1]));
            }
        }

        #[test]
        fn prop_accepted_mix_sums_to_hundred(
            weights in proptest::collection::vec(1u32..1000, 1..8),
            skew in -1.0f64..1.0,
        ) {
            let total: u32 = weights.iter().sum();
            let mut record = reference::benchmark_record();
            record.tx_mix = weights
                .iter()
                .enumerate()
                .map(|(i, &w)| TransactionMixEntry {
                    name: format!("TX_{i}"),
                    count: w as u64,
                    percentage: w as f64 * 100.0 / total as f64,
                    success_rate: 100.0,
                })
                .collect();
            record.tx_mix[0].percentage = (record.tx_mix[0].percentage + skew).max(0.0);

            if let Ok(result) = BenchmarkResult::new(record) {
                let sum: f64 = result.tx_mix.iter().map(|e| e.percentage).sum();
                prop_assert!((sum - 100.0).abs() <= MIX_SUM_TOLERANCE);
            }
        }
    }
}
