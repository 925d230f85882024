use crate::storage::csv::CsvDataset;
use crate::storage::error::StorageError;
use crate::storage::frame::columns_frame;
use crate::storage::{dataset_file_name, station_dir, Storage, StorageBackend};
use crate::types::category::Category;
use crate::types::mode::ForecastMode;
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::{DateTime, FixedOffset};
use log::debug;
use polars::prelude::*;
use serde_json::Value;
use std::path::Path;

const TIMESTAMP_FIELD: &str = Category::ForecastHourly.timestamp_field();
const TIMESTAMP_FORMAT: &str = Category::ForecastHourly.timestamp_format();
/// Leading column holding each row's position within its fetched batch.
pub const INDEX_COLUMN: &str = "index";

/// Hourly forecasts stored as CSV. Every fetch appends its whole batch.
#[derive(Debug, Clone)]
pub struct CsvForecastHourly {
    dataset: CsvDataset,
}

impl CsvForecastHourly {
    pub fn open(
        data_dir: &Path,
        station: &Station,
        mode: ForecastMode,
        units: Units,
    ) -> Result<Self, StorageError> {
        let file_name = dataset_file_name(
            StorageBackend::Csv,
            station,
            Category::ForecastHourly,
            mode.label(),
            units,
        );
        let dataset = CsvDataset::open(&station_dir(data_dir, station), &file_name)?;
        Ok(Self { dataset })
    }

    pub fn dataset(&self) -> &CsvDataset {
        &self.dataset
    }
}

impl Storage for CsvForecastHourly {
    type Timestamp = DateTime<FixedOffset>;

    fn name(&self) -> &'static str {
        StorageBackend::Csv.name()
    }

    fn last_date(&self) -> Option<DateTime<FixedOffset>> {
        let values = match self.dataset.column_values(TIMESTAMP_FIELD) {
            Ok(values) => values,
            Err(e) => {
                debug!("No last date for {}: {}", self.dataset.path().display(), e);
                return None;
            }
        };
        // Offsets may differ between batches, so compare parsed instants.
        values
            .iter()
            .filter_map(|value| {
                DateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
            })
            .max()
    }

    fn transform(&self, payload: &Value) -> Result<DataFrame, StorageError> {
        let object = payload.as_object().ok_or_else(|| {
            StorageError::MalformedPayload("forecast payload is not a JSON object".to_string())
        })?;
        columns_frame(object)
    }

    fn load(&self, frame: &DataFrame) -> Result<(), StorageError> {
        if frame.height() == 0 {
            return Ok(());
        }
        let index: Vec<i64> = (0..frame.height() as i64).collect();
        let mut indexed = frame.clone();
        indexed.insert_column(0, Series::new(INDEX_COLUMN.into(), index))?;
        self.dataset.append(&indexed)
    }
}
