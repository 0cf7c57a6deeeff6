use crate::figure::{
    Bar, BarPanel, ChartArtifact, Dashboard, DonutPanel, Figure, FigureKind, MetricCard,
    OutputFormat, ReferenceLine, Scale, Status, TablePanel, TableRow, TimelinePanel, Wedge,
};
use crate::metrics::DerivedMetrics;
use crate::reference::{group_thousands, CapacityTarget};
use crate::results::{Percentile, PlatformComparison};
use crate::style::{ColorRole, LabelFormat, Severity, Style};
use crate::timeline::{self, TimelineConfig};
use anyhow::Result;
use rand::Rng;

/// Headroom above the tallest bar on linear axes (room for annotations)
const LINEAR_HEADROOM: f64 = 1.15;
/// Decades added around the data on log axes
const LOG_PAD_BELOW: f64 = 2.0;
const LOG_PAD_ABOVE: f64 = 5.0;

const FIRST_WEDGE_EXPLODE: f64 = 0.05;

const CONFLICT_WARN_PCT: f64 = 5.0;
const CONFLICT_BAD_PCT: f64 = 10.0;
const FAILURE_WARN_PCT: f64 = 1.0;
const FAILURE_BAD_PCT: f64 = 5.0;

/// Builds a [`ChartArtifact`] for each figure kind from derived metrics.
///
/// Everything except the timeline is a pure function of the inputs and the
/// style; the timeline draws its noise from the generator it is handed.
#[derive(Debug, Clone)]
pub struct Renderer {
    style: Style,
    capacity: CapacityTarget,
    formats: Vec<OutputFormat>,
}

impl Renderer {
    pub fn new(style: Style) -> Self {
        Self {
            style,
            capacity: CapacityTarget::default(),
            formats: OutputFormat::all().to_vec(),
        }
    }

    pub fn with_capacity_target(mut self, capacity: CapacityTarget) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    fn artifact(&self, kind: FigureKind, title: Option<&str>, figure: Figure) -> ChartArtifact {
        ChartArtifact {
            kind,
            title: title.map(str::to_string),
            figure,
            style: self.style.clone(),
            formats: self.formats.clone(),
        }
    }

    /// Figure 1: one bar per percentile, colored by severity band, with the
    /// mean as a reference line.
    pub fn latency_distribution(&self, metrics: &DerivedMetrics) -> ChartArtifact {
        let panel = self.latency_panel(
            "TPC-C Benchmark: Latency Distribution",
            metrics,
            Percentile::all(),
            self.style.value_label(),
        );
        self.artifact(
            FigureKind::LatencyDistribution,
            None,
            Figure::LatencyDistribution(panel),
        )
    }

    /// Figure 2: mix donut next to per-category success rates.
    pub fn transaction_mix(&self, metrics: &DerivedMetrics) -> ChartArtifact {
        let shares = self.mix_donut("Transaction Type Distribution", metrics);

        let bars: Vec<Bar> = metrics
            .mix
            .iter()
            .enumerate()
            .map(|(i, share)| Bar {
                label: share.name.replace('_', " "),
                value: share.success_rate,
                color: self.style.category_color(i),
                annotation: format!("{:.1}%", share.success_rate),
                emphasized: false,
                note: None,
            })
            .collect();

        let lowest = bars
            .iter()
            .map(|b| b.value)
            .fold(metrics.success_rate, f64::min);
        let min = (lowest - 1.0).floor().max(0.0);
        let max = 100.0 + (100.0 - min) * 0.1;

        let success = BarPanel {
            title: "Success Rate by Transaction Type".to_string(),
            x_desc: "Transaction Type".to_string(),
            y_desc: "Success Rate (%)".to_string(),
            bars,
            scale: Scale::Linear { min, max },
            reference_lines: vec![ReferenceLine {
                value: metrics.success_rate,
                color: self.style.color(ColorRole::Danger),
                label: format!("Overall: {:.2}%", metrics.success_rate),
            }],
        };

        self.artifact(
            FigureKind::TransactionMix,
            Some("TPC-C Transaction Mix"),
            Figure::TransactionMix { shares, success },
        )
    }

    /// Figure 3: trust premium and throughput per platform.
    pub fn platform_comparison(&self, comparison: &PlatformComparison) -> ChartArtifact {
        let trust_premium = self.premium_panel("Trust Premium (Lower is Better)", comparison);

        let throughput_format = LabelFormat::with_precision(0, "");
        let bars = self.platform_bars(comparison, |e| e.tps, &throughput_format);
        let mut values: Vec<f64> = bars.iter().map(|b| b.value).collect();
        values.push(self.capacity.required_tps);

        let throughput = BarPanel {
            title: "Throughput (Higher is Better)".to_string(),
            x_desc: "Platform".to_string(),
            y_desc: "Transactions per Second".to_string(),
            bars,
            scale: self.value_scale(&values),
            reference_lines: vec![ReferenceLine {
                value: self.capacity.required_tps,
                color: self.style.color(ColorRole::Muted),
                label: self.capacity.label(),
            }],
        };

        self.artifact(
            FigureKind::PlatformComparison,
            Some("Platform Comparison"),
            Figure::PlatformComparison {
                trust_premium,
                throughput,
            },
        )
    }

    /// Figure 4: metric cards over latency, mix, platform, transaction and
    /// table panels.
    pub fn summary_dashboard(
        &self,
        metrics: &DerivedMetrics,
        comparison: &PlatformComparison,
    ) -> ChartArtifact {
        let baseline = comparison
            .baseline()
            .map(|b| format!("vs {}", b.name))
            .unwrap_or_else(|| "vs Baseline".to_string());

        let cards = vec![
            MetricCard {
                title: "Primary Metric".to_string(),
                value: group_thousands(metrics.tpmc.round() as u64),
                label: "tpmC".to_string(),
                color: self.style.color(ColorRole::Primary),
            },
            MetricCard {
                title: "Throughput".to_string(),
                value: format!("{:.1}", metrics.tps),
                label: "TPS".to_string(),
                color: self.style.color(ColorRole::Accent),
            },
            MetricCard {
                title: "Reliability".to_string(),
                value: format!("{:.2}%", metrics.success_rate),
                label: "Success Rate".to_string(),
                color: self.style.color(ColorRole::Success),
            },
            MetricCard {
                title: baseline,
                value: format!("{:.1}x", metrics.trust_premium),
                label: "Trust Premium".to_string(),
                color: self.style.color(ColorRole::Danger),
            },
        ];

        let latency = self.latency_panel(
            "Latency Percentiles",
            metrics,
            &[Percentile::P50, Percentile::P95, Percentile::P99],
            self.style.value_label(),
        );
        let mix = self.mix_donut("Transaction Mix", metrics);
        let platforms = self.premium_panel("Trust Premium", comparison);

        let dashboard = Dashboard {
            cards,
            latency,
            mix,
            platforms,
            transactions: self.transaction_panel(metrics),
            table: self.metrics_table(metrics),
        };

        self.artifact(
            FigureKind::BenchmarkSummary,
            Some("GridTokenX TPC-C Benchmark Results"),
            Figure::Dashboard(Box::new(dashboard)),
        )
    }

    /// Figure 5: synthetic throughput over time.
    pub fn throughput_timeline<R: Rng>(
        &self,
        metrics: &DerivedMetrics,
        rng: &mut R,
    ) -> Result<ChartArtifact> {
        let config = TimelineConfig::for_baseline(metrics.tps);
        let series = timeline::generate(&config, rng)?;

        let points: Vec<(f64, f64)> = series.samples.iter().map(|s| (s.secs, s.tps)).collect();
        let peak = points.iter().map(|(_, tps)| *tps).fold(0.0, f64::max);

        let panel = TimelinePanel {
            title: "Throughput Over Time".to_string(),
            points,
            warmup_secs: series.warmup_secs,
            duration_secs: series.duration_secs,
            steady_mean: series.steady_mean(),
            y_max: (peak * 1.25).max(1.0),
        };

        Ok(self.artifact(
            FigureKind::ThroughputTimeline,
            None,
            Figure::Timeline(panel),
        ))
    }

    fn latency_panel(
        &self,
        title: &str,
        metrics: &DerivedMetrics,
        percentiles: &[Percentile],
        label: &LabelFormat,
    ) -> BarPanel {
        let bars: Vec<Bar> = percentiles
            .iter()
            .map(|&p| {
                let millis = metrics.latency(p);
                Bar {
                    label: p.name().to_string(),
                    value: millis,
                    color: self.style.severity_color(self.style.severity(millis)),
                    annotation: label.format(millis),
                    emphasized: false,
                    note: None,
                }
            })
            .collect();

        let max = bars
            .iter()
            .map(|b| b.value)
            .fold(metrics.mean_latency_ms, f64::max);

        BarPanel {
            title: title.to_string(),
            x_desc: "Percentile".to_string(),
            y_desc: "Latency (ms)".to_string(),
            bars,
            scale: Scale::Linear {
                min: 0.0,
                max: (max * LINEAR_HEADROOM).max(1.0),
            },
            reference_lines: vec![ReferenceLine {
                value: metrics.mean_latency_ms,
                color: self.style.color(ColorRole::Accent),
                label: format!("Mean: {:.1}ms", metrics.mean_latency_ms),
            }],
        }
    }

    fn mix_donut(&self, title: &str, metrics: &DerivedMetrics) -> DonutPanel {
        let wedges = metrics
            .mix
            .iter()
            .enumerate()
            .map(|(i, share)| Wedge {
                label: share.name.clone(),
                value: share.percentage,
                color: self.style.category_color(i),
                annotation: format!("{:.1}%", share.percentage),
                explode: if i == 0 { FIRST_WEDGE_EXPLODE } else { 0.0 },
            })
            .collect();

        DonutPanel {
            title: title.to_string(),
            wedges,
            hole_ratio: 0.5,
        }
    }

    fn premium_panel(&self, title: &str, comparison: &PlatformComparison) -> BarPanel {
        let premium_format = LabelFormat::with_precision(1, "x");
        let mut bars = self.platform_bars(comparison, |e| e.trust_premium, &premium_format);

        if let (Some(first), Some(_)) = (bars.first_mut(), comparison.preferred()) {
            first.note = Some("Preferred".to_string());
        }

        let values: Vec<f64> = bars.iter().map(|b| b.value).collect();
        BarPanel {
            title: title.to_string(),
            x_desc: "Platform".to_string(),
            y_desc: "Trust Premium (x baseline)".to_string(),
            bars,
            scale: self.value_scale(&values),
            reference_lines: Vec::new(),
        }
    }

    fn platform_bars(
        &self,
        comparison: &PlatformComparison,
        value: impl Fn(&crate::results::PlatformEntry) -> f64,
        format: &LabelFormat,
    ) -> Vec<Bar> {
        comparison
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let v = value(entry);
                Bar {
                    label: entry.name.clone(),
                    value: v,
                    color: self.style.platform_color(i),
                    annotation: format.format(v),
                    emphasized: i == 0,
                    note: None,
                }
            })
            .collect()
    }

    /// Total, successful and failed counts, log-scaled like the platform panels
    fn transaction_panel(&self, metrics: &DerivedMetrics) -> BarPanel {
        let tx = metrics.transactions;
        let bars: Vec<Bar> = [
            ("Total", tx.total, ColorRole::Primary),
            ("Successful", tx.successful, ColorRole::Success),
            ("Failed", tx.failed, ColorRole::Danger),
        ]
        .into_iter()
        .map(|(label, count, role)| Bar {
            label: label.to_string(),
            value: count as f64,
            color: self.style.color(role),
            annotation: group_thousands(count),
            emphasized: false,
            note: None,
        })
        .collect();

        let values: Vec<f64> = bars.iter().map(|b| b.value).collect();
        BarPanel {
            title: "Transaction Summary".to_string(),
            x_desc: String::new(),
            y_desc: "Count".to_string(),
            bars,
            scale: self.value_scale(&values),
            reference_lines: Vec::new(),
        }
    }

    fn value_scale(&self, values: &[f64]) -> Scale {
        let max = values.iter().copied().fold(0.0, f64::max);
        if self.style.log_scale() {
            let min = values
                .iter()
                .copied()
                .filter(|v| *v > 0.0)
                .fold(f64::MAX, f64::min)
                .min(max);
            Scale::Log {
                min: (min / LOG_PAD_BELOW).max(f64::MIN_POSITIVE),
                max: (max * LOG_PAD_ABOVE).max(1.0),
            }
        } else {
            Scale::Linear {
                min: 0.0,
                max: (max * LINEAR_HEADROOM).max(1.0),
            }
        }
    }

    fn metrics_table(&self, metrics: &DerivedMetrics) -> TablePanel {
        let latency_status = |millis: f64| match self.style.severity(millis) {
            Severity::Excellent | Severity::Good => Status::Ok,
            Severity::Warning => Status::Warn,
            Severity::Critical => Status::Bad,
        };
        let tx = metrics.transactions;
        let failure_pct = if tx.total == 0 {
            0.0
        } else {
            tx.failed as f64 * 100.0 / tx.total as f64
        };
        let p99 = metrics.latency(Percentile::P99);

        let rows = vec![
            TableRow {
                metric: "Mean Latency".to_string(),
                value: format!("{:.1} ms", metrics.mean_latency_ms),
                status: latency_status(metrics.mean_latency_ms),
            },
            TableRow {
                metric: "p99 Latency".to_string(),
                value: format!("{:.1} ms", p99),
                status: latency_status(p99),
            },
            TableRow {
                metric: "MVCC Conflicts".to_string(),
                value: format!("{:.2}%", metrics.mvcc_conflict_rate),
                status: threshold_status(
                    metrics.mvcc_conflict_rate,
                    CONFLICT_WARN_PCT,
                    CONFLICT_BAD_PCT,
                ),
            },
            TableRow {
                metric: "Transactions".to_string(),
                value: format!(
                    "{} ({} ok)",
                    group_thousands(tx.total),
                    group_thousands(tx.successful)
                ),
                status: Status::Ok,
            },
            TableRow {
                metric: "Failed".to_string(),
                value: group_thousands(tx.failed),
                status: threshold_status(failure_pct, FAILURE_WARN_PCT, FAILURE_BAD_PCT),
            },
            TableRow {
                metric: "Baseline".to_string(),
                value: format!("{} ms", metrics.baseline_latency_ms),
                status: Status::Ok,
            },
        ];

        TablePanel {
            title: "Additional Metrics".to_string(),
            rows,
        }
    }
}

fn threshold_status(value: f64, warn: f64, bad: f64) -> Status {
    if value >= bad {
        Status::Bad
    } else if value >= warn {
        Status::Warn
    } else {
        Status::Ok
    }
}
