use anyhow::{bail, Context, Result};
use benchmark_figures::metrics::DerivedMetrics;
use benchmark_figures::reference;
use benchmark_figures::render::Renderer;
use benchmark_figures::report::Report;
use benchmark_figures::style::{Style, StyleBuilder, StyleProfile};
use benchmark_figures::timeline::DEFAULT_SEED;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "benchmark-figures")]
#[command(about = "Render TPC-C benchmark result figures for the thesis")]
struct Cli {
    #[command(flatten)]
    render: RenderArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the derived metrics as JSON instead of rendering figures
    Metrics,
}

#[derive(Args)]
struct RenderArgs {
    /// Output directory for figures
    #[arg(short, long, default_value = "docs/thesis/figures")]
    output: PathBuf,

    /// Visual style profile
    #[arg(long, value_enum, default_value_t = StyleProfile::Classic)]
    style: StyleProfile,

    /// Random seed for the throughput timeline
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Skip the throughput timeline figure
    #[arg(long)]
    no_timeline: bool,

    /// Use a linear value axis instead of log10
    #[arg(long)]
    linear: bool,

    /// Latency severity limits in ms (excellent, good, warning)
    #[arg(long, value_delimiter = ',', value_name = "MS,MS,MS")]
    band_limits: Option<Vec<f64>>,

    /// Template for latency bar labels, e.g. "{:.1} ms"
    #[arg(long)]
    label_format: Option<String>,

    /// Override a palette color, e.g. --color danger=#c0392b
    #[arg(long = "color", value_name = "ROLE=#HEX")]
    colors: Vec<String>,

    /// Render figures in parallel
    #[arg(long)]
    parallel: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.render.verbose);

    let result = reference::benchmark_result().context("Invalid benchmark record")?;
    let comparison = reference::platform_comparison().context("Invalid platform comparison")?;

    match cli.command {
        Some(Commands::Metrics) => {
            let metrics = DerivedMetrics::compute(&result);
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        None => {
            let args = cli.render;
            let style = build_style(&args)?;
            debug!(profile = ?style.profile(), log_scale = style.log_scale(), "style resolved");

            let renderer = Renderer::new(style);
            let report = Report::new(&result, comparison, renderer)
                .with_seed(args.seed)
                .with_timeline(!args.no_timeline)
                .with_parallel(args.parallel);

            println!("Generating benchmark figures...");
            let summary = report.run(&args.output);
            summary.print(&args.output);

            if !summary.is_success() {
                bail!("{} figure(s) failed", summary.failures.len());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_style(args: &RenderArgs) -> Result<Style> {
    let mut builder = StyleBuilder::new(args.style).log_scale(!args.linear);

    for entry in &args.colors {
        let Some((role, hex)) = entry.split_once('=') else {
            bail!("Invalid --color '{}', expected ROLE=#HEX", entry);
        };
        builder = builder.color(role, hex);
    }

    if let Some(limits) = &args.band_limits {
        builder = builder.band_limits(limits.clone());
    }

    if let Some(format) = &args.label_format {
        builder = builder.value_label_format(format.clone());
    }

    builder.build().context("Invalid style configuration")
}
