/// Post-capture analysis: smooth each frame file, locate its peak and
/// render a figure next to it.
///
/// ```text
///   spectrum_data_{n}.csv ──loader──▶ FrameFile
///        │
///        ▼
///   savgol (31 / 3) ──▶ smoothed ──▶ peak ──▶ render ──▶ spectrum_data_{n}.png
/// ```

pub mod peak;
pub mod render;
pub mod savgol;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::data::loader::{
    is_frame_file, read_frame_file, sequence_index_from_path, FrameFileError,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{len} samples is too few to smooth with a {window}-point window")]
    InsufficientSamples { len: usize, window: usize },

    #[error("invalid smoothing filter: window {window}, order {order}")]
    InvalidFilter { window: usize, order: usize },

    #[error("malformed frame file: {0}")]
    FileFormat(#[from] FrameFileError),

    #[error("wavelength has {wavelength} values but intensity has {intensity}")]
    LengthMismatch { wavelength: usize, intensity: usize },

    #[error("no finite intensity to locate a peak in")]
    NoPeak,

    #[error("rendering failed: {0}")]
    Render(String),
}

// ---------------------------------------------------------------------------
// Per-file analysis
// ---------------------------------------------------------------------------

/// Everything derived from one frame file.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub wavelength: Vec<f64>,
    pub intensity: Vec<f64>,
    pub smoothed: Vec<f64>,
    pub peak_wavelength: f64,
    pub integration_time_ms: Option<u32>,
}

/// Smooth a spectrum and locate its peak.
pub fn analyze(
    wavelength: Vec<f64>,
    intensity: Vec<f64>,
) -> Result<AnalysisResult, AnalysisError> {
    if wavelength.len() != intensity.len() {
        return Err(AnalysisError::LengthMismatch {
            wavelength: wavelength.len(),
            intensity: intensity.len(),
        });
    }
    let smoothed = savgol::savgol_filter(&intensity, savgol::WINDOW, savgol::ORDER)?;
    let peak_wavelength =
        peak::peak_wavelength(&wavelength, &smoothed).ok_or(AnalysisError::NoPeak)?;
    Ok(AnalysisResult {
        wavelength,
        intensity,
        smoothed,
        peak_wavelength,
        integration_time_ms: None,
    })
}

/// Read and analyse one frame file.
pub fn analyze_file(path: &Path) -> Result<AnalysisResult, AnalysisError> {
    let file = read_frame_file(path)?;
    let mut result = analyze(file.wavelength, file.intensity)?;
    result.integration_time_ms = file.integration_time_ms;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// A frame file that could not be turned into a figure.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: AnalysisError,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub discovered: usize,
    pub images: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// Frame files in `directory`, ordered by sequence index. Files whose names
/// carry no index sort after the indexed ones, by name.
pub fn discover_frame_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("listing {}", directory.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", directory.display()))?;
        let path = entry.path();
        if path.is_file() && is_frame_file(&path) {
            files.push(path);
        }
    }
    files.sort_by_cached_key(|p| {
        (
            sequence_index_from_path(p).unwrap_or(u64::MAX),
            p.file_name().map(|n| n.to_owned()),
        )
    });
    Ok(files)
}

/// Image path for a frame file: same stem, `.png` extension.
pub fn image_path_for(frame_path: &Path) -> PathBuf {
    frame_path.with_extension("png")
}

/// Analyse every frame file in `directory`, writing one PNG per file.
///
/// Failures are collected per file and never stop the batch; only an
/// unreadable directory is an error.
pub fn run_batch_analysis(directory: &Path) -> Result<BatchReport> {
    let files = discover_frame_files(directory)?;
    let total = files.len();
    log::info!("Found {total} spectra in {}, plotting", directory.display());

    let mut report = BatchReport {
        discovered: total,
        ..Default::default()
    };

    for (i, path) in files.into_iter().enumerate() {
        let image = image_path_for(&path);
        let outcome = analyze_file(&path).and_then(|result| {
            render::render_analysis(&result, &image)?;
            Ok(result)
        });
        match outcome {
            Ok(result) => {
                let exposure = result
                    .integration_time_ms
                    .map(|ms| format!(", {ms} ms"))
                    .unwrap_or_default();
                log::info!(
                    "[{}/{total}] {} → {} (lambda max {:.1}{exposure})",
                    i + 1,
                    path.display(),
                    image.display(),
                    result.peak_wavelength
                );
                report.images.push(image);
            }
            Err(error) => {
                log::warn!("[{}/{total}] {}: {error}", i + 1, path.display());
                report.failures.push(FileFailure { path, error });
            }
        }
    }

    if report.failures.is_empty() {
        log::info!("Analysis complete: {} images written", report.images.len());
    } else {
        log::warn!(
            "Analysis complete: {} images written, {} files failed",
            report.images.len(),
            report.failures.len()
        );
        for failure in &report.failures {
            log::warn!("  {}: {}", failure.path.display(), failure.error);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Frame;
    use crate::data::writer::write_frame;

    /// Unimodal curve peaking at `center` plus deterministic ripple.
    fn synthetic(center: f64, ripple: f64) -> (Vec<f64>, Vec<f64>) {
        let wl: Vec<f64> = (400..=700).map(f64::from).collect();
        let y = wl
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let noise = ripple * ((i as f64 * 12.9898).sin() * 43758.5453).fract();
                (-(x - center).powi(2) / (2.0 * 25.0f64.powi(2))).exp() + noise
            })
            .collect();
        (wl, y)
    }

    #[test]
    fn clean_peak_is_exact() {
        let (wl, y) = synthetic(550.0, 0.0);
        let result = analyze(wl, y).unwrap();
        assert_eq!(result.peak_wavelength, 550.0);
        assert_eq!(result.smoothed.len(), result.intensity.len());
    }

    #[test]
    fn noisy_peak_within_two_nm() {
        let (wl, y) = synthetic(550.0, 0.01);
        let result = analyze(wl, y).unwrap();
        let peak = result.peak_wavelength;
        assert!((peak - 550.0).abs() <= 2.0, "{peak}");
    }

    #[test]
    fn mismatched_axes_are_rejected() {
        let err = analyze(vec![1.0; 40], vec![1.0; 39]).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { .. }));
    }

    #[test]
    fn empty_directory_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_batch_analysis(dir.path()).unwrap();
        assert_eq!(report.discovered, 0);
        assert!(report.images.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_batch_analysis(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn short_frame_is_skipped_and_others_plotted() {
        let dir = tempfile::tempdir().unwrap();
        let (wl, y) = synthetic(550.0, 0.01);
        let good = |index| Frame::new(wl.clone(), y.clone(), 100, index).unwrap();
        let short = Frame::new(wl[..20].to_vec(), y[..20].to_vec(), 100, 1).unwrap();
        write_frame(&good(0), dir.path()).unwrap();
        write_frame(&short, dir.path()).unwrap();
        write_frame(&good(2), dir.path()).unwrap();

        let report = run_batch_analysis(dir.path()).unwrap();
        assert_eq!(report.discovered, 3);
        assert_eq!(
            report.images,
            [
                dir.path().join("spectrum_data_0.png"),
                dir.path().join("spectrum_data_2.png"),
            ]
        );
        for image in &report.images {
            assert!(std::fs::metadata(image).unwrap().len() > 0);
        }
        assert!(!dir.path().join("spectrum_data_1.png").exists());

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, dir.path().join("spectrum_data_1.csv"));
        assert!(matches!(
            report.failures[0].error,
            AnalysisError::InsufficientSamples { len: 20, window: 31 }
        ));
    }

    #[test]
    fn bad_files_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let short = Frame::new(
            (0..20).map(f64::from).collect(),
            vec![1.0; 20],
            100,
            0,
        )
        .unwrap();
        write_frame(&short, dir.path()).unwrap();
        std::fs::write(dir.path().join("spectrum_data_1.csv"), "wavelength,intensity\n1,x\n")
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let report = run_batch_analysis(dir.path()).unwrap();
        assert_eq!(report.discovered, 2);
        assert!(report.images.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[0].error,
            AnalysisError::InsufficientSamples { len: 20, window: 31 }
        ));
        assert!(matches!(report.failures[1].error, AnalysisError::FileFormat(_)));
    }

    #[test]
    fn discovery_sorts_by_sequence_index() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["spectrum_data_10.csv", "extra.csv", "spectrum_data_2.csv", "spectrum_data_0.png"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let names: Vec<String> = discover_frame_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["spectrum_data_2.csv", "spectrum_data_10.csv", "extra.csv"]);
    }

    #[test]
    fn image_named_after_frame() {
        assert_eq!(
            image_path_for(Path::new("out/spectrum_data_4.csv")),
            PathBuf::from("out/spectrum_data_4.png")
        );
    }
}
