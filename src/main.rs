use clap::Parser;
use tracing_subscriber::EnvFilter;

use txwatch::config::{Config, ReportFormat};
use txwatch::pipeline::FilePipeline;

#[derive(Parser, Debug)]
#[command(name = "txwatch")]
#[command(about = "Flag problematic transaction statuses and report outliers", long_about = None)]
struct Args {
    /// Transaction CSV files, analyzed in order
    files: Vec<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Problematic share (percent) above which a time bucket is flagged
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Expected outlier fraction for the isolation forest
    #[arg(long)]
    contamination: Option<f64>,

    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Directory to export chart input CSVs into
    #[arg(long)]
    chart_dir: Option<String>,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for model details)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let config = Config::load(path)?;
            tracing::info!("Configuration loaded from {}", path);
            config
        }
        None => Config::default(),
    };

    if let Some(threshold) = args.threshold {
        config.analysis.threshold_percent = threshold;
    }
    if let Some(contamination) = args.contamination {
        config.analysis.contamination = contamination;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(dir) = args.chart_dir {
        config.output.chart_dir = Some(dir);
    }
    config.input.files.extend(args.files);
    config.validate()?;

    if config.input.files.is_empty() {
        return Err(eyre::eyre!("No input files given (pass paths or set input.files)"));
    }

    tracing::info!(
        files = config.input.files.len(),
        threshold_percent = config.analysis.threshold_percent,
        contamination = config.analysis.contamination,
        "txwatch starting"
    );

    let files = config.input.files.clone();
    let mut pipeline = FilePipeline::new(config, std::io::stdout().lock());
    let summary = pipeline.run_all(&files)?;

    if !summary.failed.is_empty() {
        return Err(eyre::eyre!(
            "{} of {} files failed: {}",
            summary.failed.len(),
            files.len(),
            summary.failed.join(", ")
        ));
    }

    Ok(())
}
