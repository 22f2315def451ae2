use std::time::Instant;

use eframe::egui;

use crate::state::{Phase, PlotterState, TickOutcome};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

/// Drives capture ticks from the UI event loop.
pub struct LivePlotterApp {
    pub state: PlotterState,
}

impl LivePlotterApp {
    pub fn new(state: PlotterState) -> Self {
        Self { state }
    }
}

impl eframe::App for LivePlotterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.state.stop();
        }

        let now = Instant::now();
        if self.state.is_due(now) {
            match self.state.tick(now) {
                Ok(TickOutcome::Recorded(path)) => log::debug!("Recorded {}", path.display()),
                Ok(TickOutcome::Displayed) => {}
                // Already logged and shown in the status bar; retried next tick.
                Err(_) => {}
            }
            if self.state.should_give_up() {
                log::error!(
                    "Giving up after {} consecutive failed samples",
                    self.state.consecutive_failures
                );
                self.state.stop();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        // ---- Top panel: status bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state);
        });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::live_plot(ui, &self.state);
        });

        if self.state.phase == Phase::Running {
            ctx.request_repaint_after(self.state.time_until_due(Instant::now()));
        }
    }
}
