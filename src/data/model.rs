use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Source – one emission category column
// ---------------------------------------------------------------------------

/// One of the seven emission categories in the input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Total,
    Coal,
    Oil,
    Gas,
    Cement,
    Flaring,
    Other,
}

impl Source {
    /// All sources in display order.
    pub const ALL: [Source; 7] = [
        Source::Total,
        Source::Coal,
        Source::Oil,
        Source::Gas,
        Source::Cement,
        Source::Flaring,
        Source::Other,
    ];

    /// The six components that make up `Total`.
    pub const COMPONENTS: [Source; 6] = [
        Source::Coal,
        Source::Oil,
        Source::Gas,
        Source::Cement,
        Source::Flaring,
        Source::Other,
    ];

    /// Header name of the column holding this source.
    pub fn column(self) -> &'static str {
        match self {
            Source::Total => "Total",
            Source::Coal => "Coal",
            Source::Oil => "Oil",
            Source::Gas => "Gas",
            Source::Cement => "Cement",
            Source::Flaring => "Flaring",
            Source::Other => "Other",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.column().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown emission source '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// EmissionsRecord – one country-year row
// ---------------------------------------------------------------------------

/// One row of the emissions table, in mega-tonnes of CO₂.
///
/// Numeric cells are `None` when the input left them blank.  Serializes
/// with the input column names, so written rows load back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsRecord {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Total")]
    pub total: Option<f64>,
    #[serde(rename = "Coal")]
    pub coal: Option<f64>,
    #[serde(rename = "Oil")]
    pub oil: Option<f64>,
    #[serde(rename = "Gas")]
    pub gas: Option<f64>,
    #[serde(rename = "Cement")]
    pub cement: Option<f64>,
    #[serde(rename = "Flaring")]
    pub flaring: Option<f64>,
    #[serde(rename = "Other")]
    pub other: Option<f64>,
}

impl EmissionsRecord {
    /// Value of the given source column, if present.
    pub fn value(&self, source: Source) -> Option<f64> {
        match source {
            Source::Total => self.total,
            Source::Coal => self.coal,
            Source::Oil => self.oil,
            Source::Gas => self.gas,
            Source::Cement => self.cement,
            Source::Flaring => self.flaring,
            Source::Other => self.other,
        }
    }

    /// Mutable access used by the loaders to fill columns by name.
    pub(crate) fn slot_mut(&mut self, source: Source) -> &mut Option<f64> {
        match source {
            Source::Total => &mut self.total,
            Source::Coal => &mut self.coal,
            Source::Oil => &mut self.oil,
            Source::Gas => &mut self.gas,
            Source::Cement => &mut self.cement,
            Source::Flaring => &mut self.flaring,
            Source::Other => &mut self.other,
        }
    }

    /// A record with every numeric column missing.
    pub fn empty(country: impl Into<String>, year: i32) -> Self {
        EmissionsRecord {
            country: country.into(),
            year,
            total: None,
            coal: None,
            oil: None,
            gas: None,
            cement: None,
            flaring: None,
            other: None,
        }
    }

    /// Builder-style setter, handy for fixtures.
    pub fn with(mut self, source: Source, value: f64) -> Self {
        *self.slot_mut(source) = Some(value);
        self
    }
}

// ---------------------------------------------------------------------------
// EmissionsTable – the canonical, immutable dataset
// ---------------------------------------------------------------------------

/// The loaded table with pre-computed country and year indices.
///
/// Records are unique per (country, year). Built once and never mutated;
/// queries produce new tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmissionsTable {
    records: Vec<EmissionsRecord>,
    /// Sorted, distinct country names.
    countries: Vec<String>,
    /// Sorted, distinct years.
    years: Vec<i32>,
    /// (country, year) → position in `records`.
    index: BTreeMap<(String, i32), usize>,
}

impl EmissionsTable {
    /// Build the indices from a list of records, keeping input order.
    ///
    /// A repeated (country, year) pair keeps its first occurrence.
    pub fn from_records(input: Vec<EmissionsRecord>) -> Self {
        let mut records = Vec::with_capacity(input.len());
        let mut index = BTreeMap::new();
        let mut countries = BTreeSet::new();
        let mut years = BTreeSet::new();

        for rec in input {
            let key = (rec.country.clone(), rec.year);
            if index.contains_key(&key) {
                log::warn!(
                    "Dropping duplicate row for {} in {}",
                    rec.country,
                    rec.year
                );
                continue;
            }
            index.insert(key, records.len());
            countries.insert(rec.country.clone());
            years.insert(rec.year);
            records.push(rec);
        }

        EmissionsTable {
            records,
            countries: countries.into_iter().collect(),
            years: years.into_iter().collect(),
            index,
        }
    }

    pub fn records(&self) -> &[EmissionsRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Canonical country names, ascending.
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Available years, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn min_year(&self) -> Option<i32> {
        self.years.first().copied()
    }

    pub fn max_year(&self) -> Option<i32> {
        self.years.last().copied()
    }

    /// The record for one country and year.
    pub fn get(&self, country: &str, year: i32) -> Option<&EmissionsRecord> {
        self.index
            .get(&(country.to_string(), year))
            .map(|&i| &self.records[i])
    }

    /// One cell; `None` when the row is absent or the cell is blank.
    pub fn value(&self, country: &str, year: i32, source: Source) -> Option<f64> {
        self.get(country, year)?.value(source)
    }

    /// (year, value) pairs for one country, ascending by year.
    /// Years with a blank cell are skipped.
    pub fn series(&self, country: &str, source: Source) -> Vec<(i32, f64)> {
        let mut points: Vec<(i32, f64)> = self
            .records
            .iter()
            .filter(|r| r.country == country)
            .filter_map(|r| r.value(source).map(|v| (r.year, v)))
            .collect();
        points.sort_by_key(|&(year, _)| year);
        points
    }
}
