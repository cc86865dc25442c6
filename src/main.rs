mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use eframe::egui;

use app::DriverLensApp;
use config::DashboardConfig;
use data::snapshot::Snapshot;
use data::telemetry::drs_usage;

#[derive(Parser)]
#[command(name = "driver-lens")]
#[command(about = "Interactive dashboard for F1 driving-style clusters", version)]
struct Cli {
    /// Path to a JSON dashboard config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the feature, cluster and telemetry tables
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a text summary of the loaded data and exit
    #[arg(long)]
    summary: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG sets the baseline; -v / -vv override it.
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match cli.verbose {
        0 => {}
        1 => {
            logger.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            logger.filter_level(log::LevelFilter::Trace);
        }
    }
    logger.format_timestamp_secs().init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    if cli.summary {
        return print_summary(&config);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Driver Lens",
        options,
        Box::new(|_cc| Ok(Box::new(DriverLensApp::new(config)))),
    )
    .map_err(|e| anyhow!("{e}"))
}

/// Headless mode: build one snapshot and describe it on stdout.
fn print_summary(config: &DashboardConfig) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(config)
        .with_context(|| format!("loading data from {}", config.data_dir.display()))?;

    println!("Merged rows:       {}", snapshot.merged.len());
    println!("Active features:   {}", snapshot.merged.features.names().join(", "));
    println!("Scaled rows:       {}", snapshot.scaled.len());
    println!("Telemetry samples: {}", snapshot.telemetry.len());

    let constant = snapshot.scaled.scaler.constant_features(&snapshot.scaled.features);
    if !constant.is_empty() {
        println!("Constant features: {}", constant.join(", "));
    }

    match &snapshot.projection {
        Ok(p) => {
            let [r1, r2] = p.axes.explained_variance_ratio;
            println!("Projected points:  {}", p.len());
            println!(
                "PCA explained variance: PC1 {:.1}%, PC2 {:.1}%",
                r1 * 100.0,
                r2 * 100.0
            );
        }
        Err(e) => println!("PCA unavailable: {e}"),
    }

    for usage in drs_usage(&snapshot.telemetry.samples) {
        let pct = usage
            .usage_pct
            .map_or_else(|| "no readings".to_string(), |p| format!("{p:.1}%"));
        println!("DRS {}: {pct}", usage.key);
    }

    for d in &snapshot.diagnostics {
        println!("warning: {d}");
    }
    Ok(())
}
