/// Device layer: the seam between the capture loop and the spectrometer SDK.
///
/// ```text
///   Spectrometer ──list_devices()──▶ [DeviceHandle]
///        │
///        └──open(handle)──▶ SpectrometerSession
///                              configure → sample → close
/// ```
///
/// A session holds the hardware exclusively until it is closed.

pub mod simulated;

use std::fmt;

use thiserror::Error;

pub use simulated::SimulatedSpectrometer;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("no spectrometer found")]
    NotFound,

    #[error("device {operation} failed: {message}")]
    Io {
        operation: &'static str,
        message: String,
    },
}

impl DeviceError {
    pub fn io(operation: &'static str, message: impl Into<String>) -> Self {
        DeviceError::Io {
            operation,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Device handles and capability traits
// ---------------------------------------------------------------------------

/// Opaque identifier of an attached spectrometer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub model: String,
    pub serial: String,
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}>", self.model, self.serial)
    }
}

/// A source of spectrometer sessions (the vendor SDK boundary).
pub trait Spectrometer {
    fn list_devices(&self) -> Vec<DeviceHandle>;

    fn open(&self, handle: &DeviceHandle) -> Result<Box<dyn SpectrometerSession>, DeviceError>;
}

/// An open, exclusively held connection to one device.
pub trait SpectrometerSession {
    fn configure(&mut self, integration_time_ms: u32) -> Result<(), DeviceError>;

    /// Returns `(wavelength, intensity)` for one exposure.
    fn sample(&mut self) -> Result<(Vec<f64>, Vec<f64>), DeviceError>;

    fn close(self: Box<Self>);
}

/// Pick the first attached device, the way the capture loop always does.
pub fn first_device(spectrometer: &dyn Spectrometer) -> Result<DeviceHandle, DeviceError> {
    spectrometer
        .list_devices()
        .into_iter()
        .next()
        .ok_or(DeviceError::NotFound)
}

/// Open `handle`, set the integration time and take one sample, closing the
/// session on every path.
pub fn sample_once(
    spectrometer: &dyn Spectrometer,
    handle: &DeviceHandle,
    integration_time_ms: u32,
) -> Result<(Vec<f64>, Vec<f64>), DeviceError> {
    let mut session = spectrometer.open(handle)?;
    let result = session
        .configure(integration_time_ms)
        .and_then(|()| session.sample());
    session.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_device_fails_when_nothing_attached() {
        let spec = SimulatedSpectrometer::builder().devices(0).build();
        assert_eq!(first_device(&spec), Err(DeviceError::NotFound));
    }

    #[test]
    fn first_device_picks_first_listed() {
        let spec = SimulatedSpectrometer::builder().devices(3).build();
        let handle = first_device(&spec).unwrap();
        assert_eq!(handle, spec.list_devices()[0]);
    }

    #[test]
    fn sample_once_releases_the_device() {
        let spec = SimulatedSpectrometer::builder().build();
        let handle = first_device(&spec).unwrap();
        sample_once(&spec, &handle, 100).unwrap();
        assert_eq!(spec.open_sessions(), 0);
        sample_once(&spec, &handle, 100).unwrap();
        assert_eq!(spec.open_sessions(), 0);
    }
}
