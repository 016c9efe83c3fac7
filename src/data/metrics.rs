use std::collections::BTreeSet;

use super::model::{EmissionsTable, Source};

/// How many countries the reduction ranking keeps.
pub const REDUCTION_RANK_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Ratios
// ---------------------------------------------------------------------------

/// Percentage change from `start` to `end`.  Zero when `start` is zero.
pub fn percent_change(start: f64, end: f64) -> f64 {
    if start != 0.0 {
        (end - start) / start * 100.0
    } else {
        0.0
    }
}

/// `value` as a percentage of `global`.  Zero when `global` is zero.
pub fn contribution_share(value: f64, global: f64) -> f64 {
    if global != 0.0 {
        value / global * 100.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Reduction ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub country: String,
    pub first: f64,
    pub last: f64,
    pub change_pct: f64,
}

/// Countries ranked by percentage change of `source` between the table's
/// first and last year, biggest reduction first.
///
/// Only countries with a value in both years are ranked.
pub fn reduction_ranking(table: &EmissionsTable, source: Source) -> Vec<Reduction> {
    let (Some(first_year), Some(last_year)) = (table.min_year(), table.max_year()) else {
        return Vec::new();
    };

    let mut ranked: Vec<Reduction> = table
        .countries()
        .iter()
        .filter_map(|country| {
            let first = table.value(country, first_year, source)?;
            let last = table.value(country, last_year, source)?;
            Some(Reduction {
                country: country.clone(),
                first,
                last,
                change_pct: percent_change(first, last),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.change_pct
            .total_cmp(&b.change_pct)
            .then_with(|| a.country.cmp(&b.country))
    });
    ranked.truncate(REDUCTION_RANK_LIMIT);
    ranked
}

// ---------------------------------------------------------------------------
// KPI strip
// ---------------------------------------------------------------------------

/// Headline numbers for one selected country.
///
/// Fields are `None` when the country has no value in the relevant year.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
    pub country: String,
    pub end_value: Option<f64>,
    pub change_pct: Option<f64>,
    pub contribution_pct: Option<f64>,
}

/// KPIs for each selected country over `[start_year, end_year]`.
///
/// The global total is the sum of `source` over every country in
/// `end_year`, regardless of the selection.
pub fn kpis(
    table: &EmissionsTable,
    countries: &BTreeSet<String>,
    start_year: i32,
    end_year: i32,
    source: Source,
) -> Vec<Kpi> {
    let global_total: f64 = table
        .records()
        .iter()
        .filter(|r| r.year == end_year)
        .filter_map(|r| r.value(source))
        .sum();

    countries
        .iter()
        .map(|country| {
            let start = table.value(country, start_year, source);
            let end = table.value(country, end_year, source);
            Kpi {
                country: country.clone(),
                end_value: end,
                change_pct: start.zip(end).map(|(s, e)| percent_change(s, e)),
                contribution_pct: end.map(|e| contribution_share(e, global_total)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::EmissionsRecord;

    fn rec(country: &str, year: i32, total: f64) -> EmissionsRecord {
        EmissionsRecord::empty(country, year).with(Source::Total, total)
    }

    #[test]
    fn percent_change_cases() {
        assert_eq!(percent_change(0.0, 42.0), 0.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(100.0, 150.0), 50.0);
        assert_eq!(percent_change(100.0, 50.0), -50.0);
    }

    #[test]
    fn contribution_share_cases() {
        assert_eq!(contribution_share(12.0, 0.0), 0.0);
        assert_eq!(contribution_share(25.0, 200.0), 12.5);
    }

    #[test]
    fn reduction_ranking_requires_both_endpoints() {
        let table = EmissionsTable::from_records(vec![
            rec("A", 2002, 100.0),
            rec("A", 2021, 50.0),
            rec("B", 2002, 100.0),
            rec("C", 2002, 10.0),
            rec("C", 2021, 30.0),
            rec("D", 2021, 5.0),
            EmissionsRecord::empty("E", 2002),
            rec("E", 2021, 8.0),
        ]);

        let ranking = reduction_ranking(&table, Source::Total);
        let names: Vec<&str> = ranking.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
        assert_eq!(ranking[0].change_pct, -50.0);
        assert_eq!(ranking[1].change_pct, 200.0);
    }

    #[test]
    fn reduction_ranking_keeps_ten() {
        let records = (0..15)
            .flat_map(|i| {
                let name = format!("Country{i:02}");
                [rec(&name, 2002, 100.0), rec(&name, 2021, 100.0 - i as f64)]
            })
            .collect();
        let ranking = reduction_ranking(&EmissionsTable::from_records(records), Source::Total);

        assert_eq!(ranking.len(), REDUCTION_RANK_LIMIT);
        assert_eq!(ranking[0].country, "Country14");
        assert!(ranking.windows(2).all(|w| w[0].change_pct <= w[1].change_pct));
    }

    #[test]
    fn reduction_ranking_of_empty_table() {
        assert!(reduction_ranking(&EmissionsTable::default(), Source::Coal).is_empty());
    }

    #[test]
    fn kpis_use_global_total_of_end_year() {
        let table = EmissionsTable::from_records(vec![
            rec("Germany", 2002, 850.0),
            rec("Germany", 2020, 700.0),
            rec("China", 2002, 3000.0),
            rec("China", 2020, 9000.0),
            rec("India", 2020, 300.0),
        ]);
        let selected: BTreeSet<String> = ["Germany", "India"].iter().map(|s| s.to_string()).collect();

        let strip = kpis(&table, &selected, 2002, 2020, Source::Total);

        assert_eq!(strip.len(), 2);
        let germany = &strip[0];
        assert_eq!(germany.country, "Germany");
        assert_eq!(germany.end_value, Some(700.0));
        assert!((germany.change_pct.unwrap() - (-150.0 / 850.0 * 100.0)).abs() < 1e-9);
        assert!((germany.contribution_pct.unwrap() - 7.0).abs() < 1e-9);

        let india = &strip[1];
        assert_eq!(india.change_pct, None);
        assert!((india.contribution_pct.unwrap() - 3.0).abs() < 1e-9);
    }
}
