//! Forecasting backend on top of `augurs`' automatic exponential smoothing.

use augurs::ets::AutoETS;
use augurs::prelude::*;

use super::{years_after, ForecastError, Forecaster, HistoryRow, PredictionRow};

/// Coverage of the uncertainty interval.
const INTERVAL_LEVEL: f64 = 0.8;

/// Non-seasonal AutoETS: error, trend and damping are chosen by AICc.
#[derive(Debug, Clone)]
pub struct AutoEts {
    /// Interval coverage in `(0, 1)`; [`INTERVAL_LEVEL`] by default.
    pub level: f64,
}

impl Default for AutoEts {
    fn default() -> Self {
        AutoEts {
            level: INTERVAL_LEVEL,
        }
    }
}

fn backend(e: impl std::fmt::Display) -> ForecastError {
    ForecastError::Backend(e.to_string())
}

/// Point values with their bounds.  A model without intervals collapses
/// both bounds onto the point.
fn with_bounds(point: Vec<f64>, bounds: Option<(Vec<f64>, Vec<f64>)>) -> [Vec<f64>; 3] {
    match bounds {
        Some((lower, upper)) => [point, lower, upper],
        None => [point.clone(), point.clone(), point],
    }
}

impl Forecaster for AutoEts {
    fn name(&self) -> &str {
        "AutoETS"
    }

    fn fit_predict(
        &self,
        history: &[HistoryRow],
        horizon: usize,
    ) -> Result<Vec<PredictionRow>, ForecastError> {
        let Some(last) = history.last() else {
            return Err(backend("empty history"));
        };
        let y: Vec<f64> = history.iter().map(|h| h.y).collect();
        if y.iter().any(|v| !v.is_finite()) {
            return Err(backend("history contains non-finite values"));
        }

        let mut search = AutoETS::new(1, "ZZN").map_err(backend)?;
        let fitted = search.fit(&y).map_err(backend)?;
        let in_sample = fitted.predict_in_sample(Some(self.level)).map_err(backend)?;
        let ahead = fitted.predict(horizon, Some(self.level)).map_err(backend)?;

        let [mut yhat, mut lower, mut upper] = with_bounds(
            in_sample.point,
            in_sample.intervals.map(|i| (i.lower, i.upper)),
        );
        let [ahead_yhat, ahead_lower, ahead_upper] =
            with_bounds(ahead.point, ahead.intervals.map(|i| (i.lower, i.upper)));
        yhat.extend(ahead_yhat);
        lower.extend(ahead_lower);
        upper.extend(ahead_upper);

        let mut dates: Vec<_> = history.iter().map(|h| h.ds).collect();
        for k in 1..=horizon {
            dates.push(years_after(last.ds, k)?);
        }
        if [yhat.len(), lower.len(), upper.len()] != [dates.len(); 3] {
            return Err(backend(format!(
                "expected {} predictions, model returned {}",
                dates.len(),
                yhat.len()
            )));
        }

        Ok(dates
            .into_iter()
            .zip(yhat)
            .zip(lower.into_iter().zip(upper))
            .map(|((ds, yhat), (yhat_lower, yhat_upper))| PredictionRow {
                ds,
                yhat,
                yhat_lower,
                yhat_upper,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn history(first_year: i32, values: &[f64]) -> Vec<HistoryRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, &y)| HistoryRow {
                ds: NaiveDate::from_ymd_opt(first_year + i as i32, 1, 1).unwrap(),
                y,
            })
            .collect()
    }

    fn rising() -> Vec<f64> {
        (0..20)
            .map(|t| 100.0 + 4.0 * t as f64 + [1.5, -0.5, 0.0, -1.0][t % 4])
            .collect()
    }

    #[test]
    fn covers_history_and_horizon() {
        let hist = history(2002, &rising());
        let rows = AutoEts::default().fit_predict(&hist, 9).unwrap();

        assert_eq!(rows.len(), 29);
        assert_eq!(rows[0].ds.year(), 2002);
        assert_eq!(rows[19].ds.year(), 2021);
        assert_eq!(rows[28].ds.year(), 2030);
        assert!(rows.iter().all(|r| {
            r.yhat.is_finite() && r.yhat_lower <= r.yhat && r.yhat <= r.yhat_upper
        }));
    }

    #[test]
    fn rising_history_forecasts_above_its_start() {
        let values = rising();
        let rows = AutoEts::default()
            .fit_predict(&history(2002, &values), 9)
            .unwrap();

        assert!(rows[28].yhat > values[0]);
    }

    #[test]
    fn bad_history_is_a_backend_error() {
        let err = AutoEts::default().fit_predict(&[], 9).unwrap_err();
        assert!(matches!(err, ForecastError::Backend(_)));

        let err = AutoEts::default()
            .fit_predict(&history(2002, &[1.0, f64::NAN, 3.0]), 9)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Backend(_)));
    }
}
