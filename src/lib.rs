//! Data preparation, queries and forecasting behind the CO₂ emissions
//! dashboard.  The `co2-dashboard` binary renders these results with egui.

pub mod data;
pub mod forecast;
