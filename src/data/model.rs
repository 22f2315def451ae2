use thiserror::Error;

// ---------------------------------------------------------------------------
// Frame – one captured spectrum
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("wavelength has {wavelength} values but intensity has {intensity}")]
    LengthMismatch { wavelength: usize, intensity: usize },

    #[error("frame contains no samples")]
    Empty,

    #[error("wavelength is not strictly increasing at index {index}")]
    NotIncreasing { index: usize },
}

/// A single spectrometer exposure. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    wavelength: Vec<f64>,
    intensity: Vec<f64>,
    integration_time_ms: u32,
    sequence_index: u64,
}

impl Frame {
    /// Build a frame, checking that both axes are non-empty, equally long,
    /// and that wavelength is strictly increasing.
    pub fn new(
        wavelength: Vec<f64>,
        intensity: Vec<f64>,
        integration_time_ms: u32,
        sequence_index: u64,
    ) -> Result<Self, FrameError> {
        if wavelength.len() != intensity.len() {
            return Err(FrameError::LengthMismatch {
                wavelength: wavelength.len(),
                intensity: intensity.len(),
            });
        }
        if wavelength.is_empty() {
            return Err(FrameError::Empty);
        }
        if let Some(i) = wavelength.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(FrameError::NotIncreasing { index: i + 1 });
        }
        Ok(Frame {
            wavelength,
            intensity,
            integration_time_ms,
            sequence_index,
        })
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn integration_time_ms(&self) -> u32 {
        self.integration_time_ms
    }

    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    /// Number of samples.
    pub fn sample_count(&self) -> usize {
        self.wavelength.len()
    }
}

// ---------------------------------------------------------------------------
// FrameFile – a frame read back from disk
// ---------------------------------------------------------------------------

/// Contents of a frame file. Unlike [`Frame`] the axes are taken as found on
/// disk; only equal length is guaranteed.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFile {
    pub wavelength: Vec<f64>,
    pub intensity: Vec<f64>,
    /// Recovered from the leading comment, if present.
    pub integration_time_ms: Option<u32>,
}

// ---------------------------------------------------------------------------
// Display bounds
// ---------------------------------------------------------------------------

/// Vertical plot range for a spectrum: from the minimum of `intensity`
/// after its first `skip` samples, up to 110% of the overall maximum.
///
/// Falls back to the full slice when `skip` would leave nothing and widens
/// degenerate ranges so the result is always `lo < hi`.
pub fn intensity_bounds(intensity: &[f64], skip: usize) -> (f64, f64) {
    let finite = |v: &&f64| v.is_finite();
    let tail = if skip < intensity.len() {
        &intensity[skip..]
    } else {
        intensity
    };
    let lo = tail.iter().filter(finite).copied().fold(f64::INFINITY, f64::min);
    let hi = intensity
        .iter()
        .filter(finite)
        .copied()
        .fold(f64::NEG_INFINITY, f64::max)
        * 1.1;

    if !lo.is_finite() || !hi.is_finite() {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo.min(hi) - 0.5, lo.max(hi) + 0.5)
    }
}
