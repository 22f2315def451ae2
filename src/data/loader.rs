use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::model::FrameFile;
use super::{FRAME_FILE_EXTENSION, FRAME_FILE_PREFIX};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FrameFileError {
    #[error("cannot read frame file: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing '{0}' column")]
    MissingColumn(&'static str),

    #[error("row {row}: {message}")]
    Row { row: usize, message: String },

    #[error("frame file contains no samples")]
    Empty,
}

// ---------------------------------------------------------------------------
// Frame file reader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FrameRow {
    wavelength: f64,
    intensity: f64,
}

/// Read a frame file written by [`super::writer::write_frame`].
///
/// `#` lines are comments. Columns are located by header name, so extra
/// columns or a swapped order are tolerated.
pub fn read_frame_file(path: &Path) -> Result<FrameFile, FrameFileError> {
    let text = std::fs::read_to_string(path)?;
    parse_frame_text(&text)
}

fn parse_frame_text(text: &str) -> Result<FrameFile, FrameFileError> {
    let integration_time_ms = text
        .lines()
        .take_while(|line| line.starts_with('#'))
        .find_map(parse_integration_comment);

    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| FrameFileError::Row {
        row: 0,
        message: e.to_string(),
    })?;
    for column in ["wavelength", "intensity"] {
        if !headers.iter().any(|h| h == column) {
            return Err(FrameFileError::MissingColumn(column));
        }
    }

    let mut wavelength = Vec::new();
    let mut intensity = Vec::new();
    for (row_no, result) in reader.deserialize::<FrameRow>().enumerate() {
        let row = result.map_err(|e| FrameFileError::Row {
            row: row_no + 1,
            message: e.to_string(),
        })?;
        wavelength.push(row.wavelength);
        intensity.push(row.intensity);
    }

    if wavelength.is_empty() {
        return Err(FrameFileError::Empty);
    }

    Ok(FrameFile {
        wavelength,
        intensity,
        integration_time_ms,
    })
}

/// `#integration time: 100 ms` → `Some(100)`
fn parse_integration_comment(line: &str) -> Option<u32> {
    line.trim_start_matches('#')
        .trim()
        .strip_prefix("integration time:")?
        .trim()
        .strip_suffix("ms")?
        .trim()
        .parse()
        .ok()
}

/// Sequence index encoded in a frame file name (`spectrum_data_12.csv` → 12).
pub fn sequence_index_from_path(path: &Path) -> Option<u64> {
    if !is_frame_file(path) {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(FRAME_FILE_PREFIX)?
        .parse()
        .ok()
}

/// Whether `path` carries the frame file extension.
pub fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(FRAME_FILE_EXTENSION))
}
