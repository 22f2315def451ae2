use std::cell::RefCell;
use std::rc::Rc;

use super::{DeviceError, DeviceHandle, Spectrometer, SpectrometerSession};

// ---------------------------------------------------------------------------
// Synthetic spectrum model
// ---------------------------------------------------------------------------

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Seeded Gaussian read noise of the detector (splitmix64 + Box-Muller).
#[derive(Debug, Clone)]
struct ReadNoise {
    state: u64,
}

impl ReadNoise {
    fn new(seed: u64) -> Self {
        ReadNoise { state: seed }
    }

    /// Uniform in `[0, 1)`.
    fn uniform(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// One reading with standard deviation `sigma`.
    fn sample(&mut self, sigma: f64) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

// ---------------------------------------------------------------------------
// SimulatedSpectrometer
// ---------------------------------------------------------------------------

/// Integration time at which the simulated peak reaches unit amplitude.
const REFERENCE_INTEGRATION_MS: f64 = 100.0;

#[derive(Debug)]
struct Shared {
    noise: ReadNoise,
    open_sessions: usize,
    pending_failures: usize,
}

/// Deterministic stand-in for a USB spectrometer.
///
/// Produces a single Gaussian emission line on a flat baseline, with seeded
/// Gaussian noise, over 400..=700 nm in 1 nm steps.
#[derive(Debug, Clone)]
pub struct SimulatedSpectrometer {
    devices: usize,
    peak_nm: f64,
    peak_width_nm: f64,
    noise: f64,
    shared: Rc<RefCell<Shared>>,
}

#[derive(Debug, Clone)]
pub struct SimulatedSpectrometerBuilder {
    devices: usize,
    peak_nm: f64,
    peak_width_nm: f64,
    noise: f64,
    seed: u64,
}

impl Default for SimulatedSpectrometerBuilder {
    fn default() -> Self {
        Self {
            devices: 1,
            peak_nm: 550.0,
            peak_width_nm: 20.0,
            noise: 0.01,
            seed: 42,
        }
    }
}

impl SimulatedSpectrometerBuilder {
    pub fn devices(mut self, devices: usize) -> Self {
        self.devices = devices;
        self
    }

    pub fn peak_nm(mut self, peak_nm: f64) -> Self {
        self.peak_nm = peak_nm;
        self
    }

    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> SimulatedSpectrometer {
        SimulatedSpectrometer {
            devices: self.devices,
            peak_nm: self.peak_nm,
            peak_width_nm: self.peak_width_nm,
            noise: self.noise,
            shared: Rc::new(RefCell::new(Shared {
                noise: ReadNoise::new(self.seed),
                open_sessions: 0,
                pending_failures: 0,
            })),
        }
    }
}

impl SimulatedSpectrometer {
    pub fn builder() -> SimulatedSpectrometerBuilder {
        SimulatedSpectrometerBuilder::default()
    }

    /// Wavelength axis reported by every simulated device.
    pub fn wavelengths() -> Vec<f64> {
        (400..=700).map(f64::from).collect()
    }

    /// Number of sessions currently holding the device.
    #[cfg(test)]
    pub fn open_sessions(&self) -> usize {
        self.shared.borrow().open_sessions
    }

    /// Make the next `count` samples fail with an I/O error.
    #[cfg(test)]
    pub fn fail_next_samples(&self, count: usize) {
        self.shared.borrow_mut().pending_failures = count;
    }
}

impl Spectrometer for SimulatedSpectrometer {
    fn list_devices(&self) -> Vec<DeviceHandle> {
        (0..self.devices)
            .map(|i| DeviceHandle {
                model: "SIM2000".to_string(),
                serial: format!("SIM{i:05}"),
            })
            .collect()
    }

    fn open(&self, handle: &DeviceHandle) -> Result<Box<dyn SpectrometerSession>, DeviceError> {
        if !self.list_devices().contains(handle) {
            return Err(DeviceError::io("open", format!("unknown device {handle}")));
        }
        let mut shared = self.shared.borrow_mut();
        if shared.open_sessions > 0 {
            return Err(DeviceError::io("open", format!("{handle} is already in use")));
        }
        shared.open_sessions += 1;
        Ok(Box::new(SimulatedSession {
            device: self.clone(),
            integration_time_ms: None,
        }))
    }
}

struct SimulatedSession {
    device: SimulatedSpectrometer,
    integration_time_ms: Option<u32>,
}

impl SpectrometerSession for SimulatedSession {
    fn configure(&mut self, integration_time_ms: u32) -> Result<(), DeviceError> {
        if integration_time_ms == 0 {
            return Err(DeviceError::io("configure", "integration time must be positive"));
        }
        self.integration_time_ms = Some(integration_time_ms);
        Ok(())
    }

    fn sample(&mut self) -> Result<(Vec<f64>, Vec<f64>), DeviceError> {
        let integration_ms = self
            .integration_time_ms
            .ok_or_else(|| DeviceError::io("sample", "integration time not configured"))?;

        let mut shared = self.device.shared.borrow_mut();
        if shared.pending_failures > 0 {
            shared.pending_failures -= 1;
            return Err(DeviceError::io("sample", "USB transfer timed out"));
        }

        let gain = f64::from(integration_ms) / REFERENCE_INTEGRATION_MS;
        let dev = &self.device;
        let wavelength = SimulatedSpectrometer::wavelengths();
        let intensity = wavelength
            .iter()
            .map(|&wl| {
                let signal = 0.05 + gaussian(wl, dev.peak_nm, dev.peak_width_nm, 1.0);
                gain * signal + shared.noise.sample(dev.noise)
            })
            .collect();
        Ok((wavelength, intensity))
    }

    fn close(self: Box<Self>) {
        let mut shared = self.device.shared.borrow_mut();
        shared.open_sessions = shared.open_sessions.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_first(spec: &SimulatedSpectrometer) -> Box<dyn SpectrometerSession> {
        let handle = spec.list_devices().remove(0);
        spec.open(&handle).unwrap()
    }

    #[test]
    fn read_noise_has_requested_spread() {
        let mut noise = ReadNoise::new(3);
        let draws: Vec<f64> = (0..20_000).map(|_| noise.sample(0.5)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.02, "{mean}");
        assert!((var.sqrt() - 0.5).abs() < 0.02, "{}", var.sqrt());
    }

    #[test]
    fn sample_requires_configuration() {
        let spec = SimulatedSpectrometer::builder().build();
        let mut session = open_first(&spec);
        assert!(matches!(
            session.sample(),
            Err(DeviceError::Io { operation: "sample", .. })
        ));
        session.close();
    }

    #[test]
    fn device_is_exclusive_while_open() {
        let spec = SimulatedSpectrometer::builder().build();
        let handle = spec.list_devices().remove(0);
        let session = spec.open(&handle).unwrap();
        assert!(spec.open(&handle).is_err());
        session.close();
        assert!(spec.open(&handle).is_ok());
    }

    #[test]
    fn samples_peak_near_configured_line() {
        let spec = SimulatedSpectrometer::builder().peak_nm(610.0).noise(0.0).build();
        let mut session = open_first(&spec);
        session.configure(100).unwrap();
        let (wl, y) = session.sample().unwrap();
        session.close();

        assert_eq!(wl.len(), y.len());
        assert_eq!(wl.len(), 301);
        let (max_idx, _) = y
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(wl[max_idx], 610.0);
    }

    #[test]
    fn same_seed_same_samples() {
        let take = || {
            let spec = SimulatedSpectrometer::builder().seed(7).build();
            let mut session = open_first(&spec);
            session.configure(50).unwrap();
            let sample = session.sample().unwrap();
            session.close();
            sample
        };
        assert_eq!(take(), take());
    }

    #[test]
    fn injected_failures_are_consumed() {
        let spec = SimulatedSpectrometer::builder().build();
        spec.fail_next_samples(1);
        let mut session = open_first(&spec);
        session.configure(10).unwrap();
        assert!(session.sample().is_err());
        assert!(session.sample().is_ok());
        session.close();
    }
}
