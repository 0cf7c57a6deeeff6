//! Backend-independent descriptions of every figure.
//!
//! A [`ChartArtifact`] holds everything needed to draw a figure: values,
//! labels, colors and layout. [`crate::draw`] turns it into pixels or SVG.

use crate::style::Style;
use plotters::style::RGBColor;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Vector document
    Pdf,
    /// Raster image
    Png,
}

impl OutputFormat {
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Pdf, OutputFormat::Png]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
        }
    }
}

/// The figures of a report, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FigureKind {
    LatencyDistribution,
    TransactionMix,
    PlatformComparison,
    BenchmarkSummary,
    ThroughputTimeline,
}

impl FigureKind {
    pub fn all() -> &'static [FigureKind] {
        &[
            FigureKind::LatencyDistribution,
            FigureKind::TransactionMix,
            FigureKind::PlatformComparison,
            FigureKind::BenchmarkSummary,
            FigureKind::ThroughputTimeline,
        ]
    }

    /// File name of the figure without extension
    pub fn base_name(&self) -> &'static str {
        match self {
            FigureKind::LatencyDistribution => "latency_distribution",
            FigureKind::TransactionMix => "transaction_mix",
            FigureKind::PlatformComparison => "platform_comparison",
            FigureKind::BenchmarkSummary => "benchmark_summary",
            FigureKind::ThroughputTimeline => "throughput_timeline",
        }
    }

    /// Canvas size in pixels
    pub fn size(&self) -> (u32, u32) {
        match self {
            FigureKind::LatencyDistribution => (1000, 600),
            FigureKind::TransactionMix => (1200, 520),
            FigureKind::PlatformComparison => (1200, 520),
            FigureKind::BenchmarkSummary => (1500, 1100),
            FigureKind::ThroughputTimeline => (1000, 520),
        }
    }
}

impl std::fmt::Display for FigureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Value axis of a bar panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Linear { min: f64, max: f64 },
    /// Bars are drawn in log10 space; `min` and `max` are data values
    Log { min: f64, max: f64 },
}

impl Scale {
    /// Map a data value onto the drawn axis.
    pub fn project(&self, value: f64) -> f64 {
        match self {
            Scale::Linear { .. } => value,
            Scale::Log { min, .. } => value.max(*min).log10(),
        }
    }

    pub fn axis_range(&self) -> Range<f64> {
        match *self {
            Scale::Linear { min, max } => min..max,
            Scale::Log { min, max } => min.log10()..max.log10(),
        }
    }

    /// Where bars start
    pub fn base(&self) -> f64 {
        self.axis_range().start
    }

    pub fn is_log(&self) -> bool {
        matches!(self, Scale::Log { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
    /// Text printed on top of the bar
    pub annotation: String,
    /// Drawn with a thicker outline
    pub emphasized: bool,
    /// Extra callout above the annotation, e.g. "Preferred"
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub value: f64,
    pub color: RGBColor,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarPanel {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub bars: Vec<Bar>,
    pub scale: Scale,
    pub reference_lines: Vec<ReferenceLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wedge {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
    pub annotation: String,
    /// Radial displacement as a fraction of the radius
    pub explode: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonutPanel {
    pub title: String,
    pub wedges: Vec<Wedge>,
    /// Inner radius as a fraction of the outer radius
    pub hole_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub label: String,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Bad,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub metric: String,
    pub value: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TablePanel {
    pub title: String,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePanel {
    pub title: String,
    pub points: Vec<(f64, f64)>,
    pub warmup_secs: f64,
    pub duration_secs: f64,
    pub steady_mean: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub cards: Vec<MetricCard>,
    pub latency: BarPanel,
    pub mix: DonutPanel,
    pub platforms: BarPanel,
    pub transactions: BarPanel,
    pub table: TablePanel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    LatencyDistribution(BarPanel),
    TransactionMix {
        shares: DonutPanel,
        success: BarPanel,
    },
    PlatformComparison {
        trust_premium: BarPanel,
        throughput: BarPanel,
    },
    Dashboard(Box<Dashboard>),
    Timeline(TimelinePanel),
}

/// A rendered figure ready to be written in every requested format
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub kind: FigureKind,
    /// Figure-wide title above all panels
    pub title: Option<String>,
    pub figure: Figure,
    pub style: Style,
    pub formats: Vec<OutputFormat>,
}

impl ChartArtifact {
    pub fn base_name(&self) -> &'static str {
        self.kind.base_name()
    }

    pub fn size(&self) -> (u32, u32) {
        self.kind.size()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.formats
            .iter()
            .map(|f| format!("{}.{}", self.base_name(), f.extension()))
            .collect()
    }
}
