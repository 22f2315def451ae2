use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};

use crate::state::PlotterState;

// ---------------------------------------------------------------------------
// Live spectrum plot (central panel)
// ---------------------------------------------------------------------------

/// Render the latest sample, with axes pinned to the bounds computed for it.
pub fn live_plot(ui: &mut Ui, state: &PlotterState) {
    if state.wavelength.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Waiting for the spectrometer…");
        });
        return;
    }

    let (x_min, x_max) = state.x_bounds;
    let (y_min, y_max) = state.y_bounds;

    Plot::new("live_spectrum")
        .x_axis_label("Wavelength (nm)")
        .y_axis_label("Intensity")
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([x_min, y_min], [x_max, y_max]));

            let points: PlotPoints = state
                .wavelength
                .iter()
                .zip(state.intensity.iter())
                .map(|(&xi, &yi)| [xi, yi])
                .collect();

            let line = Line::new(points)
                .name("spectrum")
                .color(Color32::from_rgba_unmultiplied(31, 119, 180, 128))
                .width(1.0);

            plot_ui.line(line);
        });
}
