//! Resolution and horizon selectors for the two remote queries.

use crate::throttle::horizon_hours;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolution of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// One observation per hour.
    Hourly,
    /// One summary per day.
    Daily,
    /// Every observation the station reported (about 5 minute resolution).
    All,
}

impl HistoryMode {
    /// URL path segment and dataset file name component.
    pub fn label(&self) -> &'static str {
        match self {
            HistoryMode::Hourly => "hourly",
            HistoryMode::Daily => "daily",
            HistoryMode::All => "all",
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(HistoryMode::Hourly),
            "daily" => Ok(HistoryMode::Daily),
            "all" => Ok(HistoryMode::All),
            other => Err(format!(
                "unknown history mode '{other}', expected one of hourly, daily, all"
            )),
        }
    }
}

/// Horizon of an hourly forecast query, counted in days from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForecastMode {
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "2day")]
    TwoDay,
    #[serde(rename = "3day")]
    ThreeDay,
    #[serde(rename = "10day")]
    TenDay,
    #[serde(rename = "15day")]
    FifteenDay,
}

impl ForecastMode {
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMode::OneDay => "1day",
            ForecastMode::TwoDay => "2day",
            ForecastMode::ThreeDay => "3day",
            ForecastMode::TenDay => "10day",
            ForecastMode::FifteenDay => "15day",
        }
    }

    /// Number of hours the forecast covers, derived from the label (`2day` -> 48).
    pub fn horizon_hours(&self) -> i64 {
        // Every label carries its day count.
        horizon_hours(self.label()).unwrap_or(24)
    }
}

impl fmt::Display for ForecastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ForecastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1day" => Ok(ForecastMode::OneDay),
            "2day" => Ok(ForecastMode::TwoDay),
            "3day" => Ok(ForecastMode::ThreeDay),
            "10day" => Ok(ForecastMode::TenDay),
            "15day" => Ok(ForecastMode::FifteenDay),
            other => Err(format!(
                "unknown forecast mode '{other}', expected one of 1day, 2day, 3day, 10day, 15day"
            )),
        }
    }
}
