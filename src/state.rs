use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use co2_dashboard::data::cache::Memo;
use co2_dashboard::data::{DatasetCache, EmissionsTable, LoaderConfig, QueryEngine, Source};
use co2_dashboard::forecast::{ForecastAdapter, ForecastOutcome};

use crate::color::ColorMap;

/// Countries pre-selected on the trends tab when present.
const DEFAULT_COUNTRIES: [&str; 5] = ["Germany", "United States", "China", "India", "Brazil"];
const DEFAULT_FOCUS_COUNTRY: &str = "Germany";
/// Size of the all-time ranking on the comparisons tab.
pub const TOP_N: usize = 10;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Trends,
    Comparisons,
    Map,
    Breakdown,
    Forecasting,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Trends,
        Tab::Comparisons,
        Tab::Map,
        Tab::Breakdown,
        Tab::Forecasting,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Trends => "📈 Trends",
            Tab::Comparisons => "📊 Comparisons",
            Tab::Map => "🌍 Map",
            Tab::Breakdown => "🥧 Breakdown",
            Tab::Forecasting => "🔮 Forecasting",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Selections made on the trends tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSelection {
    pub countries: BTreeSet<String>,
    pub source: Source,
    pub start_year: i32,
    pub end_year: i32,
}

/// Cached forecast results; errors are kept as display text.
type ForecastMemo = Memo<(String, Source), Result<ForecastOutcome, String>>;

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Memoised queries over the active table.
    pub engine: QueryEngine,
    /// Where the active table came from.
    pub data_path: PathBuf,
    pub loader_config: LoaderConfig,
    pub forecaster: ForecastAdapter,
    forecasts: ForecastMemo,

    pub tab: Tab,
    pub trends: TrendSelection,
    pub comparison_source: Source,
    pub map_source: Source,
    pub map_year: i32,
    pub breakdown_country: String,
    pub breakdown_year: i32,
    pub forecast_country: String,
    pub forecast_source: Source,

    /// One stable colour per country.
    pub country_colors: ColorMap,
    /// One colour per emission source.
    pub source_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(
        table: Arc<EmissionsTable>,
        data_path: PathBuf,
        loader_config: LoaderConfig,
        forecaster: ForecastAdapter,
    ) -> Self {
        let mut state = AppState {
            engine: QueryEngine::new(Arc::clone(&table)),
            data_path,
            loader_config,
            forecaster,
            forecasts: Memo::new("forecast"),
            tab: Tab::Trends,
            trends: TrendSelection {
                countries: BTreeSet::new(),
                source: Source::Total,
                start_year: 0,
                end_year: 0,
            },
            comparison_source: Source::Total,
            map_source: Source::Total,
            map_year: 0,
            breakdown_country: String::new(),
            breakdown_year: 0,
            forecast_country: String::new(),
            forecast_source: Source::Total,
            country_colors: ColorMap::default(),
            source_colors: ColorMap::new(Source::ALL.iter().map(|s| s.column())),
            status_message: None,
        };
        state.reset_selections();
        state
    }

    /// Point every selection at sensible defaults for the active table.
    fn reset_selections(&mut self) {
        let countries = self.engine.countries();
        let years = self.engine.years();
        let first_year = years.first().copied().unwrap_or_default();
        let last_year = years.last().copied().unwrap_or_default();

        let mut selected: BTreeSet<String> = DEFAULT_COUNTRIES
            .iter()
            .filter(|c| countries.iter().any(|known| known.as_str() == **c))
            .map(|c| c.to_string())
            .collect();
        if selected.is_empty() {
            selected = countries.iter().take(DEFAULT_COUNTRIES.len()).cloned().collect();
        }

        let focus = if countries.iter().any(|c| c == DEFAULT_FOCUS_COUNTRY) {
            DEFAULT_FOCUS_COUNTRY.to_string()
        } else {
            countries.first().cloned().unwrap_or_default()
        };

        self.country_colors = ColorMap::new(countries.iter().cloned());
        self.trends.countries = selected;
        self.trends.start_year = first_year;
        self.trends.end_year = last_year;
        self.map_year = last_year;
        self.breakdown_country = focus.clone();
        self.breakdown_year = last_year;
        self.forecast_country = focus;
    }

    /// Swap in a newly loaded table.
    pub fn set_table(&mut self, table: Arc<EmissionsTable>, data_path: PathBuf) {
        log::info!(
            "Switching to {} ({} records)",
            data_path.display(),
            table.len()
        );
        self.engine = QueryEngine::new(table);
        self.forecasts = Memo::new("forecast");
        self.data_path = data_path;
        self.status_message = None;
        self.reset_selections();
    }

    /// Load another file; on failure the current table stays active.
    pub fn open_path(&mut self, path: &Path) {
        match DatasetCache::global().load(path, &self.loader_config) {
            Ok(table) => self.set_table(table, path.to_path_buf()),
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Keep `start_year <= end_year` after either end moves.
    pub fn normalize_year_range(&mut self) {
        if self.trends.start_year > self.trends.end_year {
            std::mem::swap(&mut self.trends.start_year, &mut self.trends.end_year);
        }
    }

    pub fn toggle_country(&mut self, country: &str) {
        if !self.trends.countries.remove(country) {
            self.trends.countries.insert(country.to_string());
        }
    }

    pub fn select_all_countries(&mut self) {
        self.trends.countries = self.engine.countries().iter().cloned().collect();
    }

    pub fn select_no_countries(&mut self) {
        self.trends.countries.clear();
    }

    /// Forecast for the current country and source, computed once per pair.
    pub fn current_forecast(&self) -> Arc<Result<ForecastOutcome, String>> {
        let key = (self.forecast_country.clone(), self.forecast_source);
        self.forecasts.get_or_compute(key, |(country, source)| {
            self.forecaster
                .forecast(self.engine.table(), country, *source)
                .map_err(|e| e.to_string())
        })
    }
}
