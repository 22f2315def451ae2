use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::model::Frame;
use super::{FRAME_FILE_EXTENSION, FRAME_FILE_PREFIX};

/// Decimal places used for every value in a frame file.
pub const FRAME_PRECISION: usize = 14;

/// File name for the frame with the given sequence index.
pub fn frame_file_name(sequence_index: u64) -> String {
    format!("{FRAME_FILE_PREFIX}{sequence_index}.{FRAME_FILE_EXTENSION}")
}

/// Write `frame` into `directory` as `spectrum_data_{index}.csv`.
///
/// Layout:
/// ```text
/// #integration time: 100 ms
/// #100
/// wavelength,intensity
/// 400.00000000000000,0.01234567890123
/// ```
///
/// An existing file with the same index is overwritten.
pub fn write_frame(frame: &Frame, directory: &Path) -> Result<PathBuf> {
    let path = directory.join(frame_file_name(frame.sequence_index()));
    let file = File::create(&path)
        .with_context(|| format!("creating frame file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let ms = frame.integration_time_ms();
    write!(out, "#integration time: {ms} ms\n#{ms}\n")
        .with_context(|| format!("writing header of {}", path.display()))?;

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["wavelength", "intensity"])
        .context("writing column header")?;
    for (wl, y) in frame.wavelength().iter().zip(frame.intensity()) {
        writer
            .write_record([
                format!("{wl:.prec$}", prec = FRAME_PRECISION),
                format!("{y:.prec$}", prec = FRAME_PRECISION),
            ])
            .with_context(|| format!("writing row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;

    log::debug!("Wrote {} samples to {}", frame.sample_count(), path.display());
    Ok(path)
}
