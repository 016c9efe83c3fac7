use eframe::egui;

use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar + tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
            ui.separator();
            panels::tab_bar(ui, &mut self.state);
        });

        // ---- Left side panel: controls for the active tab ----
        egui::SidePanel::left("control_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: the active view ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.engine.table().is_empty() {
                plot::no_data(ui, "No data loaded  (File → Open…)");
                return;
            }
            match self.state.tab {
                Tab::Trends => plot::trends_view(ui, &self.state),
                Tab::Comparisons => plot::comparisons_view(ui, &self.state),
                Tab::Map => table::distribution_view(ui, &self.state),
                Tab::Breakdown => plot::breakdown_view(ui, &self.state),
                Tab::Forecasting => plot::forecast_view(ui, &self.state),
            }
        });
    }
}
