//! Format-agnostic persisted datasets.
//!
//! A dataset is scoped to one `(station, category, mode, units)` tuple. The
//! pipelines only talk to the [`Storage`] trait; which variant they get is
//! decided by the category-specific factory functions below.

pub mod csv;
pub mod error;
pub mod frame;

use crate::storage::csv::{CsvForecastHourly, CsvHistory};
use crate::storage::error::StorageError;
use crate::types::category::Category;
use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::{DateTime, FixedOffset, NaiveDate};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Contract every persisted dataset satisfies, independent of its format.
pub trait Storage {
    /// What [`Storage::last_date`] resolves the dataset's timestamp column to.
    type Timestamp;

    /// Short backend name used in progress logs.
    fn name(&self) -> &'static str;

    /// Latest stored timestamp, or `None` when the dataset is empty, missing
    /// or cannot be parsed.
    fn last_date(&self) -> Option<Self::Timestamp>;

    /// Flattens a raw payload into rows ready to be appended.
    fn transform(&self, payload: &Value) -> Result<DataFrame, StorageError>;

    /// Appends rows. The header is written exactly once, with the first rows.
    fn load(&self, frame: &DataFrame) -> Result<(), StorageError>;

    /// Dataset-wide maintenance run after a pipeline finishes.
    fn tidyup(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

pub type HistoryStorage = dyn Storage<Timestamp = NaiveDate>;
pub type ForecastHourlyStorage = dyn Storage<Timestamp = DateTime<FixedOffset>>;

/// Persisted formats a dataset can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Csv,
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Csv => "csv",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            StorageBackend::Csv => "csv",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(StorageBackend::Csv),
            other => Err(format!("unknown storage '{other}', expected csv")),
        }
    }
}

/// Directory holding every dataset of `station`: `{data_dir}/{group}/{id}`.
pub fn station_dir(data_dir: &Path, station: &Station) -> PathBuf {
    data_dir.join(&station.group).join(&station.id)
}

/// `{id}_{category}_{mode}_{units}.{ext}`, e.g. `IATHEN61_history_hourly_m.csv`.
pub fn dataset_file_name(
    backend: StorageBackend,
    station: &Station,
    category: Category,
    mode: &str,
    units: Units,
) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        station.id,
        category,
        mode,
        units.code(),
        backend.extension()
    )
}

/// Opens (creating if needed) the history dataset of `station` for `mode` and `units`.
pub fn history_storage(
    backend: StorageBackend,
    data_dir: &Path,
    station: &Station,
    mode: HistoryMode,
    units: Units,
) -> Result<Box<HistoryStorage>, StorageError> {
    match backend {
        StorageBackend::Csv => Ok(Box::new(CsvHistory::open(data_dir, station, mode, units)?)),
    }
}

/// Opens (creating if needed) the hourly forecast dataset of `station` for `mode` and `units`.
pub fn forecast_hourly_storage(
    backend: StorageBackend,
    data_dir: &Path,
    station: &Station,
    mode: ForecastMode,
    units: Units,
) -> Result<Box<ForecastHourlyStorage>, StorageError> {
    match backend {
        StorageBackend::Csv => Ok(Box::new(CsvForecastHourly::open(
            data_dir, station, mode, units,
        )?)),
    }
}
