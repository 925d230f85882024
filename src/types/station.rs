//! Defines the personal weather station (PWS) record harvested by the pipelines,
//! and the two remote queries it is the key of.

use crate::api::WeatherApi;
use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::units::Units;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Represents a single Weather Underground personal weather station.
///
/// A station is immutable once built from configuration. Its `id` is the key of
/// history queries and its `geocode` is the key of forecast queries.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Station {
    /// The configuration group the station belongs to (e.g., "athens").
    /// Also the first path segment of the station's datasets.
    pub group: String,
    /// The Weather Underground station identifier (e.g., "IATHEN61").
    pub id: String,
    /// Latitude and longitude in the `"lat,lon"` form the forecast API expects.
    pub geocode: String,
}

impl Station {
    pub fn new(group: impl Into<String>, id: impl Into<String>, geocode: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
            geocode: geocode.into(),
        }
    }

    /// Fetches the raw history payload of this station for a single day.
    ///
    /// Transport failures are swallowed by the [`WeatherApi`] implementation, so
    /// `None` means "nothing to process for this day" and never aborts a backfill.
    pub fn fetch_history(
        &self,
        api: &dyn WeatherApi,
        date: NaiveDate,
        mode: HistoryMode,
        units: Units,
    ) -> Option<Value> {
        api.history(self, date, mode, units)
    }

    /// Fetches the raw hourly forecast payload for this station's geocode.
    pub fn fetch_forecast_hourly(
        &self,
        api: &dyn WeatherApi,
        mode: ForecastMode,
        units: Units,
    ) -> Option<Value> {
        api.forecast_hourly(self, mode, units)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.group, self.id)
    }
}
