pub mod draw;
pub mod figure;
pub mod metrics;
pub mod output;
pub mod reference;
pub mod render;
pub mod report;
pub mod results;
pub mod style;
pub mod timeline;

pub use figure::{ChartArtifact, FigureKind, OutputFormat};
pub use metrics::DerivedMetrics;
pub use render::Renderer;
pub use report::{Report, RunSummary};
pub use results::{BenchmarkResult, PlatformComparison, ValidationError};
pub use style::{Style, StyleBuilder, StyleError, StyleProfile};
