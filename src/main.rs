mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;

use app::DashboardApp;
use co2_dashboard::data::{DatasetCache, LoaderConfig};
use co2_dashboard::forecast::{ForecastAdapter, ForecastCapability};
use state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive dashboard for national CO₂ emissions")]
struct Cli {
    /// Emissions table (.csv, .json or .parquet)
    #[arg(long, value_name = "PATH", default_value = "data.csv")]
    data: PathBuf,
    /// Earliest year kept after loading
    #[arg(long, value_name = "YEAR", default_value_t = 2002)]
    cutoff_year: i32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = LoaderConfig::default().with_cutoff_year(cli.cutoff_year);
    let table = DatasetCache::global()
        .load(&cli.data, &config)
        .with_context(|| format!("loading emissions data from {}", cli.data.display()))?;

    let capability = ForecastCapability::detect();
    if !capability.is_available() {
        log::warn!("Forecasting unavailable: {capability:?}");
    }
    let state = AppState::new(table, cli.data, config, ForecastAdapter::new(capability));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "CO₂ Emissions Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
    .map_err(|e| anyhow!("{e}"))
}
