use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{EmissionsTable, Source};

// ---------------------------------------------------------------------------
// Result rows
// ---------------------------------------------------------------------------

/// A country paired with an aggregated amount.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryValue {
    pub country: String,
    pub value: f64,
}

impl CountryValue {
    fn new(country: &str, value: f64) -> Self {
        CountryValue {
            country: country.to_string(),
            value,
        }
    }
}

/// One component of a country's emissions in a single year.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownSlice {
    pub source: Source,
    pub value: f64,
    /// Share of the component sum, in percent.
    pub share_pct: f64,
}

/// Descending by value, then ascending by name.
fn by_value_desc(a: &CountryValue, b: &CountryValue) -> Ordering {
    b.value
        .total_cmp(&a.value)
        .then_with(|| a.country.cmp(&b.country))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Records whose country is in `countries` and whose year lies in
/// `[start_year, end_year]`.  An empty selection gives an empty table.
pub fn filter_by_countries_and_year_range(
    table: &EmissionsTable,
    countries: &BTreeSet<String>,
    start_year: i32,
    end_year: i32,
) -> EmissionsTable {
    let records = table
        .records()
        .iter()
        .filter(|r| countries.contains(&r.country))
        .filter(|r| (start_year..=end_year).contains(&r.year))
        .cloned()
        .collect();
    EmissionsTable::from_records(records)
}

/// The `n` countries with the highest `source` summed over all years.
///
/// Blank cells count as zero, so every country in the table is ranked.
pub fn top_emitters(table: &EmissionsTable, source: Source, n: usize) -> Vec<CountryValue> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for r in table.records() {
        *sums.entry(r.country.as_str()).or_default() += r.value(source).unwrap_or(0.0);
    }

    let mut ranked: Vec<CountryValue> = sums
        .into_iter()
        .map(|(country, value)| CountryValue::new(country, value))
        .collect();
    ranked.sort_by(by_value_desc);
    ranked.truncate(n);
    ranked
}

/// Time series of one source for one country, ascending by year.
pub fn country_series(table: &EmissionsTable, country: &str, source: Source) -> Vec<(i32, f64)> {
    table.series(country, source)
}

/// The six components for one country and year with their shares.
///
/// Empty when the row does not exist.  Blank components are left out.
pub fn source_breakdown(table: &EmissionsTable, country: &str, year: i32) -> Vec<BreakdownSlice> {
    let Some(record) = table.get(country, year) else {
        return Vec::new();
    };

    let parts: Vec<(Source, f64)> = Source::COMPONENTS
        .into_iter()
        .filter_map(|s| record.value(s).map(|v| (s, v)))
        .collect();
    let sum: f64 = parts.iter().map(|&(_, v)| v).sum();

    parts
        .into_iter()
        .map(|(source, value)| BreakdownSlice {
            source,
            value,
            share_pct: super::metrics::contribution_share(value, sum),
        })
        .collect()
}

/// Every country's value for one year, highest first.
pub fn year_distribution(table: &EmissionsTable, year: i32, source: Source) -> Vec<CountryValue> {
    let mut rows: Vec<CountryValue> = table
        .records()
        .iter()
        .filter(|r| r.year == year)
        .filter_map(|r| r.value(source).map(|v| CountryValue::new(&r.country, v)))
        .collect();
    rows.sort_by(by_value_desc);
    rows
}
