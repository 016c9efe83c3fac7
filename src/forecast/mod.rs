//! Forecast adapter.
//!
//! The forecasting model itself is an opaque [`Forecaster`].  This module
//! only reshapes a per-country series into the model's two-column input
//! (`ds`, `y`), relays the call and maps the output back to
//! [`ForecastPoint`]s.  Whether a model exists at all is decided once at
//! startup by [`ForecastCapability::detect`].

#[cfg(feature = "forecast")]
pub mod ets;

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::data::model::{EmissionsTable, Source};

/// Yearly points predicted beyond the last observed year.
pub const FORECAST_HORIZON: usize = 9;

// ---------------------------------------------------------------------------
// Model boundary
// ---------------------------------------------------------------------------

/// One observation in the model's input frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRow {
    pub ds: NaiveDate,
    pub y: f64,
}

/// One row of the model's output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// A time-series model that fits on a history and predicts it forward.
pub trait Forecaster: Send + Sync {
    fn name(&self) -> &str;

    /// Fit on `history` (ascending dates) and return a prediction for every
    /// history date followed by `horizon` yearly dates.
    fn fit_predict(
        &self,
        history: &[HistoryRow],
        horizon: usize,
    ) -> Result<Vec<PredictionRow>, ForecastError>;
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("{country} has {points} observed value(s); at least 2 are needed to forecast")]
    InsufficientHistory { country: String, points: usize },

    #[error("year {0} cannot be placed on the date axis")]
    InvalidYear(i32),

    #[error("forecasting model failed: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Whether a forecasting model is present in this build.
#[derive(Clone)]
pub enum ForecastCapability {
    Available(Arc<dyn Forecaster>),
    Unavailable { reason: String },
}

impl ForecastCapability {
    /// Probe once at startup.
    pub fn detect() -> Self {
        #[cfg(feature = "forecast")]
        {
            ForecastCapability::Available(Arc::new(ets::AutoEts::default()))
        }
        #[cfg(not(feature = "forecast"))]
        {
            ForecastCapability::Unavailable {
                reason: "built without the `augurs` forecasting model; rebuild with `--features forecast`"
                    .to_string(),
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ForecastCapability::Available(_))
    }
}

impl std::fmt::Debug for ForecastCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastCapability::Available(model) => {
                f.debug_tuple("Available").field(&model.name()).finish()
            }
            ForecastCapability::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// A predicted value with its uncertainty interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub year: i32,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Observed series plus the model's predictions for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub country: String,
    pub source: Source,
    pub actual: Vec<(i32, f64)>,
    pub points: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Ready(Forecast),
    /// No model in this build; the caller should show a placeholder.
    Unavailable { reason: String },
}

#[derive(Debug, Clone)]
pub struct ForecastAdapter {
    capability: ForecastCapability,
}

impl ForecastAdapter {
    pub fn new(capability: ForecastCapability) -> Self {
        ForecastAdapter { capability }
    }

    pub fn capability(&self) -> &ForecastCapability {
        &self.capability
    }

    /// Forecast `source` for `country` over the observed years plus
    /// [`FORECAST_HORIZON`] more.
    pub fn forecast(
        &self,
        table: &EmissionsTable,
        country: &str,
        source: Source,
    ) -> Result<ForecastOutcome, ForecastError> {
        let model = match &self.capability {
            ForecastCapability::Available(model) => model,
            ForecastCapability::Unavailable { reason } => {
                return Ok(ForecastOutcome::Unavailable {
                    reason: reason.clone(),
                })
            }
        };

        let actual = table.series(country, source);
        if actual.len() < 2 {
            return Err(ForecastError::InsufficientHistory {
                country: country.to_string(),
                points: actual.len(),
            });
        }

        let history = actual
            .iter()
            .map(|&(year, y)| {
                NaiveDate::from_ymd_opt(year, 1, 1)
                    .map(|ds| HistoryRow { ds, y })
                    .ok_or(ForecastError::InvalidYear(year))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Forecasting {source} for {country} with {} ({} points, +{FORECAST_HORIZON} years)",
            model.name(),
            history.len()
        );
        let predictions = model.fit_predict(&history, FORECAST_HORIZON)?;

        let points = predictions
            .into_iter()
            .map(|row| ForecastPoint {
                year: row.ds.year(),
                predicted: row.yhat,
                lower: row.yhat_lower,
                upper: row.yhat_upper,
            })
            .collect();

        Ok(ForecastOutcome::Ready(Forecast {
            country: country.to_string(),
            source,
            actual,
            points,
        }))
    }
}

/// The `k`-th yearly date after `last`.
#[cfg_attr(not(any(test, feature = "forecast")), allow(dead_code))]
pub(crate) fn years_after(last: NaiveDate, k: usize) -> Result<NaiveDate, ForecastError> {
    let year = i32::try_from(k)
        .ok()
        .and_then(|k| last.year().checked_add(k))
        .ok_or(ForecastError::InvalidYear(last.year()))?;
    NaiveDate::from_ymd_opt(year, 1, 1).ok_or(ForecastError::InvalidYear(year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::data::model::EmissionsRecord;

    /// Echoes the history back and extends it with a flat line.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<HistoryRow>>,
    }

    impl Forecaster for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn fit_predict(
            &self,
            history: &[HistoryRow],
            horizon: usize,
        ) -> Result<Vec<PredictionRow>, ForecastError> {
            *self.seen.lock().unwrap() = history.to_vec();
            let last = history.last().unwrap();
            let mut rows: Vec<PredictionRow> = history
                .iter()
                .map(|h| PredictionRow {
                    ds: h.ds,
                    yhat: h.y,
                    yhat_lower: h.y - 1.0,
                    yhat_upper: h.y + 1.0,
                })
                .collect();
            for k in 1..=horizon {
                rows.push(PredictionRow {
                    ds: years_after(last.ds, k)?,
                    yhat: last.y,
                    yhat_lower: last.y - 1.0,
                    yhat_upper: last.y + 1.0,
                });
            }
            Ok(rows)
        }
    }

    fn table() -> EmissionsTable {
        EmissionsTable::from_records(
            (2002..=2021)
                .map(|y| EmissionsRecord::empty("Germany", y).with(Source::Gas, (y - 2000) as f64))
                .chain([EmissionsRecord::empty("Malta", 2021).with(Source::Gas, 1.0)])
                .collect(),
        )
    }

    #[test]
    fn unavailable_capability_is_signalled_not_failed() {
        let adapter = ForecastAdapter::new(ForecastCapability::Unavailable {
            reason: "no model".into(),
        });

        let outcome = adapter.forecast(&table(), "Germany", Source::Gas).unwrap();
        assert_eq!(
            outcome,
            ForecastOutcome::Unavailable {
                reason: "no model".into()
            }
        );
        assert!(!adapter.capability().is_available());
    }

    #[test]
    fn series_is_reshaped_both_ways() {
        let recorder = Arc::new(Recorder::default());
        let adapter = ForecastAdapter::new(ForecastCapability::Available(recorder.clone()));

        let ForecastOutcome::Ready(forecast) = adapter.forecast(&table(), "Germany", Source::Gas).unwrap() else {
            panic!("expected a forecast");
        };

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 20);
        assert_eq!(seen[0].ds, NaiveDate::from_ymd_opt(2002, 1, 1).unwrap());
        assert_eq!(seen[0].y, 2.0);

        assert_eq!(forecast.actual.len(), 20);
        assert_eq!(forecast.points.len(), 20 + FORECAST_HORIZON);
        assert_eq!(forecast.points.first().unwrap().year, 2002);
        let last = forecast.points.last().unwrap();
        assert_eq!(last.year, 2030);
        assert_eq!((last.lower, last.predicted, last.upper), (20.0, 21.0, 22.0));
    }

    #[test]
    fn short_series_is_rejected() {
        let adapter = ForecastAdapter::new(ForecastCapability::Available(Arc::new(Recorder::default())));

        let err = adapter.forecast(&table(), "Malta", Source::Gas).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { points: 1, .. }));

        let err = adapter.forecast(&table(), "Atlantis", Source::Gas).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { points: 0, .. }));
    }
}
