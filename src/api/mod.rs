//! The remote weather API seam.
//!
//! Pipelines only ever see [`WeatherApi`]; the production implementation is
//! [`WundergroundClient`].

pub mod client;
pub mod error;

#[cfg(test)]
pub(crate) mod fake;

use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::NaiveDate;
use serde_json::Value;

/// Read-only access to the two endpoints the pipelines depend on.
///
/// Implementations are fail-soft: a network error, a non-2xx response or an
/// empty `204 No Content` reply must yield `None`, never a panic or an error.
pub trait WeatherApi {
    /// Raw history payload (`{"observations": [...]}`) of `station` for one day.
    fn history(
        &self,
        station: &Station,
        date: NaiveDate,
        mode: HistoryMode,
        units: Units,
    ) -> Option<Value>;

    /// Raw column-oriented hourly forecast payload for the station's geocode.
    fn forecast_hourly(&self, station: &Station, mode: ForecastMode, units: Units)
        -> Option<Value>;
}
