use crate::storage::csv::CsvDataset;
use crate::storage::error::StorageError;
use crate::storage::frame::{normalize_records, strip_prefix};
use crate::storage::{dataset_file_name, station_dir, Storage, StorageBackend};
use crate::types::category::Category;
use crate::types::mode::HistoryMode;
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use polars::prelude::*;
use serde_json::Value;
use std::path::Path;

const TIMESTAMP_FIELD: &str = Category::History.timestamp_field();
const TIMESTAMP_FORMAT: &str = Category::History.timestamp_format();

/// History observations stored as CSV, unique and sorted by `obsTimeLocal`.
#[derive(Debug, Clone)]
pub struct CsvHistory {
    dataset: CsvDataset,
    units: Units,
}

impl CsvHistory {
    pub fn open(
        data_dir: &Path,
        station: &Station,
        mode: HistoryMode,
        units: Units,
    ) -> Result<Self, StorageError> {
        let file_name = dataset_file_name(
            StorageBackend::Csv,
            station,
            Category::History,
            mode.label(),
            units,
        );
        let dataset = CsvDataset::open(&station_dir(data_dir, station), &file_name)?;
        Ok(Self { dataset, units })
    }

    pub fn dataset(&self) -> &CsvDataset {
        &self.dataset
    }

    fn read_last_date(&self) -> Result<Option<NaiveDate>, StorageError> {
        // The timestamp format sorts lexically in time order.
        let Some(max) = self
            .dataset
            .column_values(TIMESTAMP_FIELD)?
            .into_iter()
            .max()
        else {
            return Ok(None);
        };
        let parsed = NaiveDateTime::parse_from_str(&max, TIMESTAMP_FORMAT)
            .map(|datetime| datetime.date());
        match parsed {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                debug!("Unparsable last timestamp '{}' in {}: {}", max, self.dataset.path().display(), e);
                Ok(None)
            }
        }
    }
}

impl Storage for CsvHistory {
    type Timestamp = NaiveDate;

    fn name(&self) -> &'static str {
        StorageBackend::Csv.name()
    }

    fn last_date(&self) -> Option<NaiveDate> {
        self.read_last_date().unwrap_or_else(|e| {
            debug!("No last date for {}: {}", self.dataset.path().display(), e);
            None
        })
    }

    fn transform(&self, payload: &Value) -> Result<DataFrame, StorageError> {
        let observations = payload
            .get("observations")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                StorageError::MalformedPayload("history payload has no 'observations' array".to_string())
            })?;

        let mut frame = normalize_records(observations)?;
        if frame.height() == 0 {
            return Ok(frame);
        }

        strip_prefix(&mut frame, &self.units.column_prefix())?;
        self.dataset.remove_existing_rows(frame, TIMESTAMP_FIELD)
    }

    fn load(&self, frame: &DataFrame) -> Result<(), StorageError> {
        self.dataset.append(frame)
    }

    /// Sorts the whole dataset by timestamp and collapses repeated timestamps,
    /// keeping the first stored row.
    fn tidyup(&self) -> Result<(), StorageError> {
        let Some(frame) = self.dataset.read()? else {
            return Ok(());
        };
        if frame.column(TIMESTAMP_FIELD).is_err() {
            return Err(StorageError::MissingColumn {
                location: self.dataset.path().display().to_string(),
                column: TIMESTAMP_FIELD.to_string(),
            });
        }

        let sorted = frame
            .lazy()
            .sort(
                [TIMESTAMP_FIELD],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;

        let mut previous: Option<&str> = None;
        let keep: BooleanChunked = sorted
            .column(TIMESTAMP_FIELD)?
            .str()?
            .into_iter()
            .map(|timestamp| {
                let repeated = timestamp.is_some() && timestamp == previous;
                previous = timestamp;
                Some(!repeated)
            })
            .collect();
        let mut unique = sorted.filter(&keep)?;

        let dropped = sorted.height() - unique.height();
        if dropped > 0 {
            warn!(
                "Dropped {} rows with repeated {} from {}",
                dropped,
                TIMESTAMP_FIELD,
                self.dataset.path().display()
            );
        }

        self.dataset.rewrite(&mut unique)?;
        info!(
            "Sorted {} rows of {}",
            unique.height(),
            self.dataset.path().display()
        );
        Ok(())
    }
}
