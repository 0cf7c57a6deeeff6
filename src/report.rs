use crate::figure::{ChartArtifact, FigureKind};
use crate::metrics::DerivedMetrics;
use crate::output::OutputWriter;
use crate::render::Renderer;
use crate::results::{BenchmarkResult, PlatformComparison};
use crate::timeline::DEFAULT_SEED;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// A figure that could not be rendered or written
#[derive(Debug)]
pub struct FigureFailure {
    pub kind: FigureKind,
    pub error: anyhow::Error,
}

/// Outcome of a full report run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub generated: Vec<PathBuf>,
    pub failures: Vec<FigureFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Print the failure list and the manifest of generated files
    pub fn print(&self, output_dir: &Path) {
        if !self.failures.is_empty() {
            eprintln!("\n{} figure(s) failed:", self.failures.len());
            for failure in &self.failures {
                eprintln!("  - {}: {:#}", failure.kind, failure.error);
            }
        }

        println!("\nAll figures saved to: {}", output_dir.display());
        println!("Generated files ({}):", self.generated.len());
        for path in &self.generated {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            println!("  - {}", name);
        }
    }
}

/// Renders and writes every figure of the benchmark report.
#[derive(Debug, Clone)]
pub struct Report {
    renderer: Renderer,
    metrics: DerivedMetrics,
    comparison: PlatformComparison,
    seed: u64,
    include_timeline: bool,
    parallel: bool,
}

impl Report {
    pub fn new(result: &BenchmarkResult, comparison: PlatformComparison, renderer: Renderer) -> Self {
        Self {
            renderer,
            metrics: DerivedMetrics::compute(result),
            comparison,
            seed: DEFAULT_SEED,
            include_timeline: true,
            parallel: false,
        }
    }

    /// Seed of the timeline's noise generator
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeline(mut self, include: bool) -> Self {
        self.include_timeline = include;
        self
    }

    /// Render figures on the rayon pool. Reporting order is unchanged.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Figures this report produces, in order
    pub fn figures(&self) -> Vec<FigureKind> {
        FigureKind::all()
            .iter()
            .copied()
            .filter(|&k| self.include_timeline || k != FigureKind::ThroughputTimeline)
            .collect()
    }

    pub fn render(&self, kind: FigureKind) -> Result<ChartArtifact> {
        let renderer = &self.renderer;
        let metrics = &self.metrics;
        Ok(match kind {
            FigureKind::LatencyDistribution => renderer.latency_distribution(metrics),
            FigureKind::TransactionMix => renderer.transaction_mix(metrics),
            FigureKind::PlatformComparison => renderer.platform_comparison(&self.comparison),
            FigureKind::BenchmarkSummary => renderer.summary_dashboard(metrics, &self.comparison),
            FigureKind::ThroughputTimeline => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                renderer.throughput_timeline(metrics, &mut rng)?
            }
        })
    }

    fn render_and_write(&self, kind: FigureKind, writer: &OutputWriter) -> Result<Vec<PathBuf>> {
        let start = Instant::now();
        let artifact = self.render(kind)?;
        let written = writer.write(&artifact)?;
        debug!(figure = %kind, elapsed = ?start.elapsed(), "figure complete");
        Ok(written)
    }

    /// Render and write all figures into `output_dir`.
    ///
    /// A failing figure is recorded and the remaining figures are still
    /// attempted.
    pub fn run(&self, output_dir: &Path) -> RunSummary {
        let writer = OutputWriter::new(output_dir);
        let figures = self.figures();
        let mut summary = RunSummary::default();

        if self.parallel {
            let outcomes: Vec<(FigureKind, Result<Vec<PathBuf>>)> = figures
                .par_iter()
                .map(|&kind| (kind, self.render_and_write(kind, &writer)))
                .collect();
            for (kind, outcome) in outcomes {
                record_outcome(&mut summary, kind, outcome);
            }
        } else {
            for kind in figures {
                let outcome = self.render_and_write(kind, &writer);
                record_outcome(&mut summary, kind, outcome);
            }
        }

        summary
    }
}

fn record_outcome(summary: &mut RunSummary, kind: FigureKind, outcome: Result<Vec<PathBuf>>) {
    match outcome {
        Ok(paths) => {
            for path in &paths {
                println!("Generated: {}", path.display());
            }
            summary.generated.extend(paths);
        }
        Err(error) => {
            warn!(figure = %kind, error = %format!("{error:#}"), "figure failed");
            eprintln!("Failed: {} ({:#})", kind, error);
            summary.failures.push(FigureFailure { kind, error });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Figure;
    use crate::reference;
    use crate::style::Style;
    use tempfile::NamedTempFile;

    fn report() -> Report {
        Report::new(
            &reference::benchmark_result().unwrap(),
            reference::platform_comparison().unwrap(),
            Renderer::new(Style::default()),
        )
    }

    #[test]
    fn test_figure_order() {
        assert_eq!(
            report().figures(),
            [
                FigureKind::LatencyDistribution,
                FigureKind::TransactionMix,
                FigureKind::PlatformComparison,
                FigureKind::BenchmarkSummary,
                FigureKind::ThroughputTimeline,
            ]
        );
        assert_eq!(report().with_timeline(false).figures().len(), 4);
    }

    #[test]
    fn test_render_dispatches_by_kind() {
        let report = report();
        for &kind in FigureKind::all() {
            let artifact = report.render(kind).unwrap();
            assert_eq!(artifact.kind, kind);
        }
        assert!(matches!(
            report.render(FigureKind::BenchmarkSummary).unwrap().figure,
            Figure::Dashboard(_)
        ));
    }

    #[test]
    fn test_timeline_uses_configured_seed() {
        let a = report().with_seed(7).render(FigureKind::ThroughputTimeline).unwrap();
        let b = report().with_seed(7).render(FigureKind::ThroughputTimeline).unwrap();
        let c = report().with_seed(8).render(FigureKind::ThroughputTimeline).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unwritable_output_fails_every_figure() {
        let blocker = NamedTempFile::new().unwrap();
        let output = blocker.path().join("figures");

        for parallel in [false, true] {
            let summary = report().with_parallel(parallel).run(&output);

            assert!(!summary.is_success());
            assert!(summary.generated.is_empty());
            let failed: Vec<FigureKind> = summary.failures.iter().map(|f| f.kind).collect();
            assert_eq!(failed, FigureKind::all());
        }
    }
}
