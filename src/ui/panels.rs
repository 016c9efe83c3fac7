use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use co2_dashboard::data::Source;

use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Small shared widgets
// ---------------------------------------------------------------------------

fn source_combo(ui: &mut Ui, id: &str, source: &mut Source) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(source.column())
        .show_ui(ui, |ui: &mut Ui| {
            for s in Source::ALL {
                ui.selectable_value(source, s, s.column());
            }
        });
}

fn year_combo(ui: &mut Ui, id: &str, year: &mut i32, years: &[i32]) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(year.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for &y in years {
                ui.selectable_value(year, y, y.to_string());
            }
        });
}

fn country_combo(ui: &mut Ui, id: &str, country: &mut String, countries: &[String]) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(country.as_str())
        .show_ui(ui, |ui: &mut Ui| {
            for c in countries {
                ui.selectable_value(country, c.clone(), c.as_str());
            }
        });
}

// ---------------------------------------------------------------------------
// Left side panel – per-tab controls
// ---------------------------------------------------------------------------

/// Render the controls for the active tab.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    if state.engine.table().is_empty() {
        ui.label("The loaded table has no rows.");
        return;
    }

    // Clone what we need so we can mutate state inside the widgets.
    let countries = state.engine.countries().to_vec();
    let years = state.engine.years().to_vec();

    match state.tab {
        Tab::Trends => trend_controls(ui, state, &countries, &years),
        Tab::Comparisons => {
            ui.strong("Emission source");
            source_combo(ui, "comparison_source", &mut state.comparison_source);
        }
        Tab::Map => {
            ui.strong("Emission source");
            source_combo(ui, "map_source", &mut state.map_source);
            ui.add_space(8.0);
            ui.strong("Year");
            let (first, last) = (years[0], years[years.len() - 1]);
            ui.add(egui::Slider::new(&mut state.map_year, first..=last));
        }
        Tab::Breakdown => {
            ui.strong("Country");
            country_combo(ui, "breakdown_country", &mut state.breakdown_country, &countries);
            ui.add_space(8.0);
            ui.strong("Year");
            year_combo(ui, "breakdown_year", &mut state.breakdown_year, &years);
        }
        Tab::Forecasting => {
            let available = state.forecaster.capability().is_available();
            ui.add_enabled_ui(available, |ui: &mut Ui| {
                ui.strong("Country");
                country_combo(ui, "forecast_country", &mut state.forecast_country, &countries);
                ui.add_space(8.0);
                ui.strong("Emission source");
                source_combo(ui, "forecast_source", &mut state.forecast_source);
            });
        }
    }
}

fn trend_controls(ui: &mut Ui, state: &mut AppState, countries: &[String], years: &[i32]) {
    ui.strong("Emission source");
    source_combo(ui, "trend_source", &mut state.trends.source);
    ui.add_space(8.0);

    ui.strong("Year range");
    ui.horizontal(|ui: &mut Ui| {
        year_combo(ui, "trend_start", &mut state.trends.start_year, years);
        ui.label("to");
        year_combo(ui, "trend_end", &mut state.trends.end_year, years);
    });
    state.normalize_year_range();
    ui.add_space(8.0);

    let header_text = format!(
        "Countries  ({}/{})",
        state.trends.countries.len(),
        countries.len()
    );
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_countries();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_countries();
                }
            });

            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    for c in countries {
                        let mut checked = state.trends.countries.contains(c);
                        let text = RichText::new(c).color(state.country_colors.color_for(c));
                        if ui.checkbox(&mut checked, text).changed() {
                            state.toggle_country(c);
                        }
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let table = state.engine.table();
        ui.label(format!(
            "{}: {} records, {} countries",
            state.data_path.display(),
            table.len(),
            table.countries().len()
        ));
        if let (Some(first), Some(last)) = (table.min_year(), table.max_year()) {
            ui.label(format!("{first}–{last}"));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Render the tab strip.
pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            if ui.selectable_label(state.tab == tab, tab.label()).clicked() {
                state.tab = tab;
            }
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open emissions table")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}
