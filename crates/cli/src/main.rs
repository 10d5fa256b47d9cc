//! Preloader CLI - watch a simulated application bootstrap.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use preloader_core::{BoxError, PreloaderConfig, ProgressState};
use preloader_progress::{
    progress_channel, AppPreloader, ApplyProgress, Preboot, ProgressReporter, TrackedOperation,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Number of steps the simulated bootstrap is split into.
const SIMULATION_STEPS: u32 = 20;

#[derive(Parser)]
#[command(name = "preloader")]
#[command(about = "Show progress of a simulated application bootstrap", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emission interval in milliseconds (overrides config)
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Share of the bar reserved for the pre-interactive phase (overrides config)
    #[arg(long)]
    ceiling: Option<f64>,
    /// How long the simulated bootstrap takes
    #[arg(long, default_value = "3000")]
    duration_ms: u64,
    /// Report real progress instead of relying on synthetic progress
    #[arg(long)]
    report: bool,
    /// Make the bootstrap fail
    #[arg(long)]
    fail: bool,
    /// Run a pre-interactive phase this long before mounting
    #[arg(long, default_value = "0")]
    preboot_ms: u64,
    /// Width of the progress bar
    #[arg(long, default_value = "40")]
    width: usize,
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let width = cli.width;

    let preboot = if cli.preboot_ms > 0 {
        let apply: ApplyProgress = Arc::new(move |progress| draw(&render_bar(progress, None, width)));
        let preboot = Preboot::start(&config, Arc::new(config.decay.build()), Some(apply))?;
        tokio::time::sleep(Duration::from_millis(cli.preboot_ms)).await;
        Some(preboot)
    } else {
        None
    };

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut builder = AppPreloader::builder(config)
        .on_render(move |state: &ProgressState| {
            let error = state.error.as_ref().map(ToString::to_string);
            draw(&render_bar(state.progress, error.as_deref(), width));
        })
        .on_done(move |result| {
            let _ = done_tx.send(result);
        });
    if let Some(preboot) = preboot {
        builder = builder.preboot(preboot);
    }
    let mut preloader = builder.build()?;

    let duration = Duration::from_millis(cli.duration_ms);
    let operation = if cli.report {
        let (reporter, subscription) = progress_channel();
        TrackedOperation::with_progress(simulate(duration, Some(reporter), cli.fail), subscription)
    } else {
        TrackedOperation::new(simulate(duration, None, cli.fail))
    };

    info!(operation = %operation.id(), reports = operation.reports_progress(), "Starting bootstrap");
    preloader.mount(Some(operation));

    let result = done_rx
        .recv()
        .await
        .context("preloader stopped before the bootstrap finished")?;
    println!();
    preloader.unmount();

    match result {
        Ok(()) => {
            info!("Application ready");
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, "Bootstrap failed");
            Err(err.into())
        }
    }
}

/// Defaults, then the config file, then command-line overrides.
fn load_config(cli: &Cli) -> Result<PreloaderConfig> {
    let mut config = match &cli.config {
        Some(path) => PreloaderConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PreloaderConfig::default(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        config.interval = Duration::from_millis(interval_ms);
    }
    if let Some(ceiling) = cli.ceiling {
        config.ceiling = ceiling;
    }
    config.validate()?;
    Ok(config)
}

/// Stand-in for real bootstrap work: sleeps through `duration` in steps,
/// reporting progress after each one when a reporter is given.
async fn simulate(
    duration: Duration,
    reporter: Option<ProgressReporter>,
    fail: bool,
) -> Result<(), BoxError> {
    let step = duration / SIMULATION_STEPS;
    for i in 1..=SIMULATION_STEPS {
        tokio::time::sleep(step).await;
        // A failing run never reports completion.
        if fail && i == SIMULATION_STEPS {
            return Err("simulated bootstrap failure".into());
        }
        if let Some(reporter) = &reporter {
            reporter.report(f64::from(i) / f64::from(SIMULATION_STEPS));
        }
    }
    Ok(())
}

fn render_bar(progress: f64, error: Option<&str>, width: usize) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = ((progress * width as f64).round() as usize).min(width);
    let mut line = format!(
        "[{}{}] {:5.1}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        progress * 100.0
    );
    if let Some(error) = error {
        line.push_str(" - ");
        line.push_str(error);
    }
    line
}

fn draw(line: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "\r{line}");
    let _ = stdout.flush();
}
