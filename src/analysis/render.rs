//! PNG figure of one analysed frame, drawn with plotters.

use std::path::Path;

use plotters::prelude::*;

use super::{AnalysisError, AnalysisResult};
use crate::data::model::intensity_bounds;

/// 5 x 4 inches at 300 DPI.
pub const FIGURE_SIZE: (u32, u32) = (1500, 1200);

/// Pixels per typographic point at 300 DPI.
const PX_PER_PT: f64 = 300.0 / 72.0;

fn px(points: f64) -> u32 {
    (points * PX_PER_PT).round() as u32
}

fn render_err(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Render(e.to_string())
}

/// Caption shown above the figure, peak truncated toward zero.
pub fn figure_title(peak_wavelength: f64) -> String {
    format!("Spectrum lambda max = {}", peak_wavelength.trunc() as i64)
}

/// Draw raw and smoothed curves plus a marker at the peak into `path`.
pub fn render_analysis(result: &AnalysisResult, path: &Path) -> Result<(), AnalysisError> {
    let wl = &result.wavelength;
    let (x_min, x_max) = match (wl.first(), wl.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        (Some(&a), _) => (a - 0.5, a + 0.5),
        _ => return Err(AnalysisError::Render("nothing to draw".to_string())),
    };
    // The very first pixel of the detector is unreliable.
    let (y_min, y_max) = intensity_bounds(&result.intensity, 1);

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(figure_title(result.peak_wavelength), ("sans-serif", px(12.0)))
        .margin(px(18.0))
        .x_label_area_size(px(30.0))
        .y_label_area_size(0)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_desc("wavelength")
        .label_style(("sans-serif", px(9.0)))
        .axis_desc_style(("sans-serif", px(10.0)))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            wl.iter().copied().zip(result.intensity.iter().copied()),
            BLUE.mix(0.4).stroke_width(px(0.5)),
        ))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new(
            wl.iter().copied().zip(result.smoothed.iter().copied()),
            RED.mix(0.5).stroke_width(px(1.5)),
        ))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new(
            [(result.peak_wavelength, y_min), (result.peak_wavelength, y_max)],
            BLACK.stroke_width(px(1.0)),
        ))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;

    #[test]
    fn writes_png_of_figure_size() {
        let wl: Vec<f64> = (400..=700).map(f64::from).collect();
        let y: Vec<f64> = wl
            .iter()
            .map(|&x| (-(x - 600.0).powi(2) / 800.0).exp())
            .collect();
        let result = analyze(wl, y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectrum_data_0.png");
        render_analysis(&result, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR: width and height, big-endian, right after the chunk header.
        let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!((width, height), FIGURE_SIZE);
    }

    #[test]
    fn title_truncates_peak() {
        assert_eq!(figure_title(549.97), "Spectrum lambda max = 549");
        assert_eq!(figure_title(550.0), "Spectrum lambda max = 550");
    }

    #[test]
    fn figure_is_five_by_four_inches_at_300_dpi() {
        assert_eq!(FIGURE_SIZE, (5 * 300, 4 * 300));
        assert_eq!(px(72.0), 300);
    }
}
