use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::device::SimulatedSpectrometer;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Capture spectra from a USB spectrometer, plot them live, save every
/// frame as CSV and, on exit, render a peak-annotated PNG for each frame.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output directory for frame files and figures (created if absent)
    #[arg(long, default_value = ".")]
    pub directory: PathBuf,

    /// Integration time per sample, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub integration_time: u32,

    /// Only display spectra, never write frame files
    #[arg(long)]
    pub monitor: bool,

    /// Keep one device session open for the whole run
    ///
    /// By default the device is opened and closed around every sample,
    /// which some drivers require.
    #[arg(long)]
    pub persistent_session: bool,

    /// Consecutive failed samples tolerated before capture stops
    #[arg(long, default_value_t = 5)]
    pub max_failures: u32,

    /// Do not analyse frame files when the window closes
    #[arg(long)]
    pub skip_analysis: bool,

    /// Number of simulated spectrometers attached
    #[arg(long, default_value_t = 1)]
    pub sim_devices: usize,

    /// Emission line of the simulated source, in nm
    #[arg(long, default_value_t = 550.0)]
    pub sim_peak: f64,

    /// Standard deviation of simulated detector noise
    #[arg(long, default_value_t = 0.01)]
    pub sim_noise: f64,

    /// Seed for simulated detector noise
    #[arg(long, default_value_t = 42)]
    pub sim_seed: u64,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// How the capture loop holds the device between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPolicy {
    /// Open, sample and close on every tick.
    PerTick,
    /// Open once at start, close on stop.
    Persistent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub directory: PathBuf,
    pub integration_time_ms: u32,
    pub monitor: bool,
    pub session_policy: SessionPolicy,
    pub max_failures: u32,
    pub analyze_on_exit: bool,
}

impl CaptureConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.integration_time == 0 {
            bail!("Please enter a positive integration time");
        }
        if cli.max_failures == 0 {
            bail!("--max-failures must be at least 1");
        }
        Ok(CaptureConfig {
            directory: cli.directory.clone(),
            integration_time_ms: cli.integration_time,
            monitor: cli.monitor,
            session_policy: if cli.persistent_session {
                SessionPolicy::Persistent
            } else {
                SessionPolicy::PerTick
            },
            max_failures: cli.max_failures,
            analyze_on_exit: !cli.skip_analysis,
        })
    }

    /// Create the output directory (and parents) if needed.
    pub fn prepare_directory(&self) -> Result<()> {
        std::fs::create_dir_all(&self.directory)
            .with_context(|| format!("creating output directory {}", self.directory.display()))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            integration_time_ms: 100,
            monitor: false,
            session_policy: SessionPolicy::PerTick,
            max_failures: 5,
            analyze_on_exit: true,
        }
    }
}

/// Build the simulated device described by the `--sim-*` flags.
pub fn simulated_device(cli: &Cli) -> Result<SimulatedSpectrometer> {
    if !cli.sim_peak.is_finite() {
        bail!("Please enter a sensible simulated peak");
    }
    if !cli.sim_noise.is_finite() || cli.sim_noise < 0.0 {
        bail!("Please enter a sensible simulated noise level");
    }
    Ok(SimulatedSpectrometer::builder()
        .devices(cli.sim_devices)
        .peak_nm(cli.sim_peak)
        .noise(cli.sim_noise)
        .seed(cli.sim_seed)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("brizzy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let config = CaptureConfig::from_cli(&parse(&[])).unwrap();
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn all_flags() {
        let cli = parse(&[
            "--directory",
            "runs/today",
            "--integration-time",
            "250",
            "--monitor",
            "--persistent-session",
            "--max-failures",
            "2",
            "--skip-analysis",
        ]);
        let config = CaptureConfig::from_cli(&cli).unwrap();
        assert_eq!(config.directory, PathBuf::from("runs/today"));
        assert_eq!(config.integration_time_ms, 250);
        assert!(config.monitor);
        assert_eq!(config.session_policy, SessionPolicy::Persistent);
        assert_eq!(config.max_failures, 2);
        assert!(!config.analyze_on_exit);
    }

    #[test]
    fn zero_integration_time_rejected() {
        let cli = parse(&["--integration-time", "0"]);
        assert!(CaptureConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn negative_integration_time_does_not_parse() {
        assert!(Cli::try_parse_from(["brizzy", "--integration-time", "-5"]).is_err());
    }

    #[test]
    fn prepare_directory_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig {
            directory: dir.path().join("a/b/c"),
            ..Default::default()
        };
        config.prepare_directory().unwrap();
        assert!(config.directory.is_dir());
    }

    #[test]
    fn negative_noise_rejected() {
        let cli = parse(&["--sim-noise=-1"]);
        assert!(simulated_device(&cli).is_err());
    }
}
