use eframe::egui::{self, Sense, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::reds;
use super::plot::no_data;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Geographic distribution (map tab)
// ---------------------------------------------------------------------------

/// Every country's emissions for the selected year, shaded on a red scale
/// relative to the largest emitter that year.
pub fn distribution_view(ui: &mut Ui, state: &AppState) {
    let (year, source) = (state.map_year, state.map_source);
    ui.heading(format!("🌍 Global {source} Emissions in {year}"));

    let rows = state.engine.year_distribution(year, source);
    if rows.is_empty() {
        no_data(ui, "No countries reported a value for this year.");
        return;
    }
    let max = rows.iter().map(|r| r.value).fold(0.0_f64, f64::max);

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::exact(40.0))
        .column(Column::auto().at_least(180.0))
        .column(Column::auto().at_least(100.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("#");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Country");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("MtCO₂");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Intensity");
            });
        })
        .body(|mut body| {
            for (rank, row) in rows.iter().enumerate() {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui: &mut Ui| {
                        ui.label((rank + 1).to_string());
                    });
                    table_row.col(|ui: &mut Ui| {
                        ui.label(row.country.as_str());
                    });
                    table_row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.2}", row.value));
                    });
                    table_row.col(|ui: &mut Ui| {
                        let fraction = if max > 0.0 { row.value / max } else { 0.0 };
                        let width = ui.available_width().max(20.0);
                        let (rect, _) =
                            ui.allocate_exact_size(egui::vec2(width, 12.0), Sense::hover());
                        ui.painter().rect_filled(rect, 2.0, reds(fraction));
                    });
                });
            }
        });
}
