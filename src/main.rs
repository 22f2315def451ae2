mod analysis;
mod app;
mod config;
mod data;
mod device;
mod state;
mod ui;

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;

use app::LivePlotterApp;
use config::{CaptureConfig, Cli};
use state::PlotterState;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Got CLI options {cli:?}");
    let config = CaptureConfig::from_cli(&cli)?;
    config.prepare_directory()?;

    let directory = config.directory.clone();
    let analyze_on_exit = config.analyze_on_exit;

    let captured = capture(config, &cli);

    // Termination hook: runs once, whether capture ended cleanly or not.
    if analyze_on_exit {
        on_exit(&directory);
    }
    captured
}

/// Run the live plotter until its window is closed.
fn capture(config: CaptureConfig, cli: &Cli) -> Result<()> {
    let spectrometer = config::simulated_device(cli)?;
    let mut state = PlotterState::new(config, Box::new(spectrometer));
    state.start(Instant::now())?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 600.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };

    eframe::run_native(
        "brizzy – live spectrum",
        options,
        Box::new(move |_cc| Ok(Box::new(LivePlotterApp::new(state)))),
    )
    .map_err(|e| anyhow!("display window failed: {e}"))
}

fn on_exit(directory: &Path) {
    log::info!("Capture finished. Now looking for spectra files.");
    match analysis::run_batch_analysis(directory) {
        Ok(report) if !report.failures.is_empty() => log::warn!(
            "{} of {} spectra could not be plotted",
            report.failures.len(),
            report.discovered
        ),
        Ok(_) => {}
        Err(e) => log::error!("Batch analysis failed: {e:#}"),
    }
}
