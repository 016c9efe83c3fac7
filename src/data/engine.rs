use std::collections::BTreeSet;
use std::sync::Arc;

use super::cache::Memo;
use super::metrics::{self, Kpi, Reduction};
use super::model::{EmissionsTable, Source};
use super::query::{self, BreakdownSlice, CountryValue};

/// Distinct country selections kept by the filter memo.
const FILTER_CACHE_ENTRIES: usize = 64;

/// Memoised front-end over one loaded table.
///
/// Everything the dashboard asks for goes through here; repeated requests
/// with the same arguments return the same `Arc`.
pub struct QueryEngine {
    table: Arc<EmissionsTable>,
    filtered: Memo<(BTreeSet<String>, i32, i32), EmissionsTable>,
    top: Memo<(Source, usize), Vec<CountryValue>>,
    reductions: Memo<Source, Vec<Reduction>>,
}

impl QueryEngine {
    pub fn new(table: Arc<EmissionsTable>) -> Self {
        QueryEngine {
            table,
            filtered: Memo::with_capacity("filter", FILTER_CACHE_ENTRIES),
            top: Memo::new("top_emitters"),
            reductions: Memo::new("reductions"),
        }
    }

    /// The canonical table.
    pub fn table(&self) -> &Arc<EmissionsTable> {
        &self.table
    }

    /// Canonical country names, ascending.
    pub fn countries(&self) -> &[String] {
        self.table.countries()
    }

    /// Supported source columns in display order.
    pub fn sources(&self) -> &'static [Source] {
        &Source::ALL
    }

    /// Available years, ascending.
    pub fn years(&self) -> &[i32] {
        self.table.years()
    }

    pub fn filter_by_countries_and_year_range(
        &self,
        countries: &BTreeSet<String>,
        start_year: i32,
        end_year: i32,
    ) -> Arc<EmissionsTable> {
        self.filtered.get_or_compute(
            (countries.clone(), start_year, end_year),
            |(c, start, end)| query::filter_by_countries_and_year_range(&self.table, c, *start, *end),
        )
    }

    pub fn top_emitters(&self, source: Source, n: usize) -> Arc<Vec<CountryValue>> {
        self.top.get_or_compute((source, n), |&(s, n)| {
            query::top_emitters(&self.table, s, n)
        })
    }

    pub fn reduction_ranking(&self, source: Source) -> Arc<Vec<Reduction>> {
        self.reductions.get_or_compute(source, |&s| {
            metrics::reduction_ranking(&self.table, s)
        })
    }

    pub fn kpis(
        &self,
        countries: &BTreeSet<String>,
        start_year: i32,
        end_year: i32,
        source: Source,
    ) -> Vec<Kpi> {
        metrics::kpis(&self.table, countries, start_year, end_year, source)
    }

    pub fn country_series(&self, country: &str, source: Source) -> Vec<(i32, f64)> {
        query::country_series(&self.table, country, source)
    }

    pub fn source_breakdown(&self, country: &str, year: i32) -> Vec<BreakdownSlice> {
        query::source_breakdown(&self.table, country, year)
    }

    pub fn year_distribution(&self, year: i32, source: Source) -> Vec<CountryValue> {
        query::year_distribution(&self.table, year, source)
    }
}
