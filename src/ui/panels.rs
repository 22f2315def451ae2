use eframe::egui::{self, Color32, RichText, Ui};

use crate::state::PlotterState;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the status bar: device, mode, counters and the last error.
pub fn top_bar(ui: &mut Ui, state: &PlotterState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        if let Some(device) = state.device() {
            ui.label(format!("Device {device}"));
            ui.separator();
        }

        ui.label(format!("{} ms", state.config.integration_time_ms));
        ui.separator();

        if state.config.monitor {
            ui.label(RichText::new("Monitor only").color(Color32::YELLOW));
        } else {
            ui.label(format!(
                "{} frames written to {}",
                state.frames_written,
                state.config.directory.display()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}
