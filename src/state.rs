use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use crate::config::{CaptureConfig, SessionPolicy};
use crate::data::model::{intensity_bounds, Frame};
use crate::data::writer::write_frame;
use crate::device::{
    first_device, sample_once, DeviceHandle, Spectrometer, SpectrometerSession,
};

/// Detector pixels at the start of the array ignored when scaling the
/// live plot; they carry readout artifacts.
pub const EDGE_PIXELS: usize = 10;

// ---------------------------------------------------------------------------
// Live plotter state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopped,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Sample displayed and written to this file.
    Recorded(PathBuf),
    /// Sample displayed only (monitor mode).
    Displayed,
}

/// Everything the capture loop owns, independent of rendering.
pub struct PlotterState {
    pub config: CaptureConfig,

    spectrometer: Box<dyn Spectrometer>,
    device: Option<DeviceHandle>,
    /// Held across ticks only under `SessionPolicy::Persistent`.
    session: Option<Box<dyn SpectrometerSession>>,

    pub phase: Phase,

    /// Latest curve on screen.
    pub wavelength: Vec<f64>,
    pub intensity: Vec<f64>,

    /// Axis ranges of the latest curve.
    pub x_bounds: (f64, f64),
    pub y_bounds: (f64, f64),

    /// Sequence index the next written frame gets.
    pub next_index: u64,
    pub ticks: u64,
    pub frames_written: u64,
    pub consecutive_failures: u32,

    /// Last tick error, shown in the status bar.
    pub status_message: Option<String>,

    last_tick: Option<Instant>,
}

impl PlotterState {
    pub fn new(config: CaptureConfig, spectrometer: Box<dyn Spectrometer>) -> Self {
        Self {
            config,
            spectrometer,
            device: None,
            session: None,
            phase: Phase::Idle,
            wavelength: Vec::new(),
            intensity: Vec::new(),
            x_bounds: (0.0, 1.0),
            y_bounds: (0.0, 1.0),
            next_index: 0,
            ticks: 0,
            frames_written: 0,
            consecutive_failures: 0,
            status_message: None,
            last_tick: None,
        }
    }

    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    /// Idle → Running. Finds the device and takes a first sample to size the
    /// axes. That sample is never written.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        if self.phase != Phase::Idle {
            bail!("capture already started");
        }
        let handle = first_device(self.spectrometer.as_ref())?;
        log::info!("Found this device: {handle}");
        self.device = Some(handle);

        let (wavelength, intensity) = self.acquire().context("taking initial sample")?;
        self.x_bounds = wavelength_bounds(&wavelength);
        self.show(wavelength, intensity);

        self.phase = Phase::Running;
        self.last_tick = Some(now);
        Ok(())
    }

    /// Whether a tick is due at `now`, one integration time after the last.
    pub fn is_due(&self, now: Instant) -> bool {
        self.phase == Phase::Running
            && self
                .last_tick
                .map_or(true, |last| now.duration_since(last) >= self.period())
    }

    /// Time until the next tick is due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_tick {
            Some(last) => self.period().saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.integration_time_ms))
    }

    /// One Running self-loop: sample, refresh the curve, write the frame
    /// unless monitoring.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        if self.phase != Phase::Running {
            bail!("capture is not running");
        }
        self.last_tick = Some(now);
        self.ticks += 1;

        let outcome = self.sample_and_record();
        match &outcome {
            Ok(_) => {
                self.consecutive_failures = 0;
                self.status_message = None;
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.status_message = Some(format!("{e:#}"));
                log::error!(
                    "Sample failed ({}/{}): {e:#}",
                    self.consecutive_failures,
                    self.config.max_failures
                );
            }
        }
        outcome
    }

    /// Whether enough ticks failed in a row that capture should end.
    pub fn should_give_up(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    /// Running → Stopped. Releases a persistent session. Idempotent.
    pub fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        if let Some(session) = self.session.take() {
            session.close();
        }
        if self.phase == Phase::Running {
            log::info!(
                "Capture stopped after {} ticks, {} frames written",
                self.ticks,
                self.frames_written
            );
        }
        self.phase = Phase::Stopped;
    }

    fn sample_and_record(&mut self) -> Result<TickOutcome> {
        let (wavelength, intensity) = self.acquire()?;

        let outcome = if self.config.monitor {
            TickOutcome::Displayed
        } else {
            let frame = Frame::new(
                wavelength.clone(),
                intensity.clone(),
                self.config.integration_time_ms,
                self.next_index,
            )
            .context("device returned an invalid frame")?;
            let path = write_frame(&frame, &self.config.directory)?;
            self.next_index += 1;
            self.frames_written += 1;
            TickOutcome::Recorded(path)
        };

        self.show(wavelength, intensity);
        Ok(outcome)
    }

    fn show(&mut self, wavelength: Vec<f64>, intensity: Vec<f64>) {
        self.y_bounds = intensity_bounds(&intensity, EDGE_PIXELS);
        self.wavelength = wavelength;
        self.intensity = intensity;
    }

    fn acquire(&mut self) -> Result<(Vec<f64>, Vec<f64>)> {
        let handle = self.device.as_ref().context("no device selected")?;
        let ms = self.config.integration_time_ms;
        match self.config.session_policy {
            SessionPolicy::PerTick => Ok(sample_once(self.spectrometer.as_ref(), handle, ms)?),
            SessionPolicy::Persistent => {
                if self.session.is_none() {
                    let mut session = self.spectrometer.open(handle)?;
                    if let Err(e) = session.configure(ms) {
                        session.close();
                        return Err(e.into());
                    }
                    self.session = Some(session);
                }
                let session = self.session.as_mut().context("device session lost")?;
                match session.sample() {
                    Ok(sample) => Ok(sample),
                    Err(e) => {
                        // Reopen on the next tick.
                        if let Some(session) = self.session.take() {
                            session.close();
                        }
                        Err(e.into())
                    }
                }
            }
        }
    }
}

fn wavelength_bounds(wavelength: &[f64]) -> (f64, f64) {
    match (wavelength.first(), wavelength.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        (Some(&lo), _) => (lo - 0.5, lo + 0.5),
        _ => (0.0, 1.0),
    }
}

impl Drop for PlotterState {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }
}
