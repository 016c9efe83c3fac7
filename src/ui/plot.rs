use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, LineStyle, Plot, PlotPoints, Points, Polygon};

use co2_dashboard::data::metrics::Kpi;
use co2_dashboard::data::query::CountryValue;
use co2_dashboard::forecast::{Forecast, ForecastOutcome};

use crate::state::{AppState, TOP_N};

const UNIT: &str = "MtCO₂";

/// Explicit empty state instead of a blank chart.
pub fn no_data(ui: &mut Ui, message: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.label(RichText::new(message).italics());
    });
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

pub fn trends_view(ui: &mut Ui, state: &AppState) {
    let sel = &state.trends;
    ui.heading(format!(
        "{} Emission Trends ({}-{})",
        sel.source, sel.start_year, sel.end_year
    ));

    let filtered = state
        .engine
        .filter_by_countries_and_year_range(&sel.countries, sel.start_year, sel.end_year);
    if filtered.is_empty() {
        no_data(ui, "No data for the selected countries and years.");
        return;
    }

    let kpis = state
        .engine
        .kpis(&sel.countries, sel.start_year, sel.end_year, sel.source);
    kpi_strip(ui, &kpis);
    ui.separator();

    Plot::new("trend_plot")
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label(UNIT)
        .show(ui, |plot_ui| {
            for country in filtered.countries() {
                let color = state.country_colors.color_for(country);
                let series: Vec<[f64; 2]> = filtered
                    .series(country, sel.source)
                    .into_iter()
                    .map(|(year, v)| [f64::from(year), v])
                    .collect();

                plot_ui.line(
                    Line::new(PlotPoints::from(series.clone()))
                        .name(country)
                        .color(color)
                        .width(2.0),
                );
                plot_ui.points(Points::new(series).name(country).color(color).radius(3.0));
            }
        });
}

fn kpi_strip(ui: &mut Ui, kpis: &[Kpi]) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for kpi in kpis {
            ui.group(|ui: &mut Ui| {
                ui.vertical(|ui: &mut Ui| {
                    ui.strong(kpi.country.as_str());
                    match kpi.end_value {
                        Some(v) => ui.heading(format!("{v:.1} {UNIT}")),
                        None => ui.heading("n/a"),
                    };
                    if let Some(change) = kpi.change_pct {
                        let color = if change <= 0.0 {
                            Color32::from_rgb(0x2e, 0x9d, 0x4f)
                        } else {
                            Color32::from_rgb(0xd6, 0x3b, 0x3b)
                        };
                        ui.colored_label(color, format!("{change:+.1}%"));
                    }
                    if let Some(share) = kpi.contribution_pct {
                        ui.small(format!("{share:.1}% of global"));
                    }
                });
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

/// One horizontal bar per country, top row first, so the legend names them.
fn ranked_bars(plot_id: &str, ui: &mut Ui, state: &AppState, rows: &[CountryValue], height: f32) {
    Plot::new(plot_id)
        .legend(Legend::default())
        .height(height)
        .show_y(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            let n = rows.len();
            for (i, row) in rows.iter().enumerate() {
                let color = state.country_colors.color_for(&row.country);
                let bar = Bar::new((n - i) as f64, row.value)
                    .name(&row.country)
                    .fill(color)
                    .width(0.7);
                plot_ui.bar_chart(
                    BarChart::new(vec![bar])
                        .horizontal()
                        .name(&row.country)
                        .color(color),
                );
            }
        });
}

pub fn comparisons_view(ui: &mut Ui, state: &AppState) {
    let source = state.comparison_source;
    let half = (ui.available_height() / 2.0 - 40.0).max(150.0);

    ui.heading(format!("⚡ Top {TOP_N} Emitters of All Time ({source})"));
    let top = state.engine.top_emitters(source, TOP_N);
    if top.is_empty() {
        no_data(ui, "No emitters to rank.");
        return;
    }
    ranked_bars("top_emitters", ui, state, &top, half);

    ui.separator();
    let first_year = state.engine.table().min_year().unwrap_or_default();
    ui.heading(format!("📉 Biggest Reductions Since {first_year}"));
    let reductions = state.engine.reduction_ranking(source);
    if reductions.is_empty() {
        ui.label("No reduction data available for the selected source.");
        return;
    }
    let rows: Vec<CountryValue> = reductions
        .iter()
        .map(|r| CountryValue {
            country: r.country.clone(),
            value: r.change_pct,
        })
        .collect();
    ranked_bars("reductions", ui, state, &rows, half);
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

pub fn breakdown_view(ui: &mut Ui, state: &AppState) {
    let (country, year) = (&state.breakdown_country, state.breakdown_year);
    ui.heading(format!("{country} Emission Sources in {year}"));

    let slices = state.engine.source_breakdown(country, year);
    if slices.is_empty() {
        no_data(ui, "No breakdown available for this country and year.");
        return;
    }

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for s in &slices {
            let color = state.source_colors.color_for(s.source.column());
            ui.colored_label(color, format!("{}: {:.1} {UNIT} ({:.1}%)", s.source, s.value, s.share_pct));
        }
    });

    Plot::new("breakdown_plot")
        .legend(Legend::default())
        .y_axis_label(UNIT)
        .show_x(false)
        .show(ui, |plot_ui| {
            for (i, s) in slices.iter().enumerate() {
                let color = state.source_colors.color_for(s.source.column());
                let bar = Bar::new(i as f64, s.value)
                    .name(format!("{} ({:.1}%)", s.source, s.share_pct))
                    .fill(color)
                    .width(0.6);
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(s.source).color(color));
            }
        });
}

// ---------------------------------------------------------------------------
// Forecasting
// ---------------------------------------------------------------------------

pub fn forecast_view(ui: &mut Ui, state: &AppState) {
    ui.heading("🔮 Forecasting Emissions");

    let outcome = state.current_forecast();
    match &*outcome {
        Ok(ForecastOutcome::Ready(forecast)) => forecast_plot(ui, forecast),
        Ok(ForecastOutcome::Unavailable { reason }) => {
            ui.colored_label(Color32::from_rgb(0xe0, 0xa0, 0x00), format!("⚠ Forecasting disabled: {reason}"));
        }
        Err(msg) => no_data(ui, msg),
    }
}

fn forecast_plot(ui: &mut Ui, forecast: &Forecast) {
    let horizon_end = forecast.points.last().map(|p| p.year).unwrap_or_default();
    ui.label(format!(
        "{} Forecasted {} Emissions to {horizon_end}",
        forecast.country, forecast.source
    ));

    let band_color = Color32::from_rgb(0xad, 0xd8, 0xe6);
    let predicted: Vec<[f64; 2]> = forecast
        .points
        .iter()
        .map(|p| [f64::from(p.year), p.predicted])
        .collect();
    let upper: Vec<[f64; 2]> = forecast
        .points
        .iter()
        .map(|p| [f64::from(p.year), p.upper])
        .collect();
    let lower: Vec<[f64; 2]> = forecast
        .points
        .iter()
        .map(|p| [f64::from(p.year), p.lower])
        .collect();
    let band: Vec<[f64; 2]> = upper.iter().chain(lower.iter().rev()).copied().collect();
    let actual: Vec<[f64; 2]> = forecast
        .actual
        .iter()
        .map(|&(year, v)| [f64::from(year), v])
        .collect();

    Plot::new("forecast_plot")
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label(UNIT)
        .show(ui, |plot_ui| {
            plot_ui.polygon(
                Polygon::new(PlotPoints::from(band))
                    .fill_color(band_color.gamma_multiply(0.3))
                    .stroke(Stroke::NONE)
                    .name("Confidence interval"),
            );
            let dotted = LineStyle::Dotted { spacing: 6.0 };
            plot_ui.line(Line::new(PlotPoints::from(upper)).name("Upper CI").color(band_color).style(dotted));
            plot_ui.line(Line::new(PlotPoints::from(lower)).name("Lower CI").color(band_color).style(dotted));
            plot_ui.line(Line::new(PlotPoints::from(predicted)).name("Forecast").width(2.0));
            plot_ui.line(Line::new(PlotPoints::from(actual.clone())).name("Actual").width(2.0));
            plot_ui.points(Points::new(actual).name("Actual").radius(3.0));
        });

    egui::CollapsingHeader::new("Forecast values")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("forecast_values").striped(true).show(ui, |ui: &mut Ui| {
                ui.strong("Year");
                ui.strong("Forecast");
                ui.strong("Lower");
                ui.strong("Upper");
                ui.end_row();
                for p in &forecast.points {
                    ui.label(p.year.to_string());
                    ui.label(format!("{:.1}", p.predicted));
                    ui.label(format!("{:.1}", p.lower));
                    ui.label(format!("{:.1}", p.upper));
                    ui.end_row();
                }
            });
        });
}
