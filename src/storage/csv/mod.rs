//! Delimited-file backend.
//!
//! [`CsvDataset`] owns the file mechanics shared by both variants: lazy
//! creation, header-once appends, whole-file reads and in-place rewrites.

pub mod forecast;
pub mod history;

use crate::storage::error::StorageError;
use log::{debug, warn};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub use forecast::CsvForecastHourly;
pub use history::CsvHistory;

/// A single CSV file holding one dataset.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    path: PathBuf,
}

impl CsvDataset {
    /// Opens the dataset at `dir/file_name`, creating the directory and an
    /// empty file if they do not exist yet. Existing content is never touched.
    pub fn open(dir: &Path, file_name: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| StorageError::DirCreation(dir.to_path_buf(), e))?;

        let path = dir.join(file_name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::FileCreation(path.clone(), e))?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An empty file has no header yet.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        let metadata = fs::metadata(&self.path)
            .map_err(|e| StorageError::MetadataRead(self.path.clone(), e))?;
        Ok(metadata.len() == 0)
    }

    /// Reads the whole dataset with every column as text, or `None` when empty.
    ///
    /// Schema inference is disabled so a rewrite reproduces stored values verbatim.
    pub fn read(&self) -> Result<Option<DataFrame>, StorageError> {
        if self.is_empty()? {
            return Ok(None);
        }
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .map_err(|e| StorageError::CsvRead(self.path.clone(), e))?
            .finish()
            .map_err(|e| StorageError::CsvRead(self.path.clone(), e))?;
        Ok(Some(df))
    }

    /// Non-null values of `column` across the whole dataset.
    pub fn column_values(&self, column: &str) -> Result<Vec<String>, StorageError> {
        let Some(df) = self.read()? else {
            return Ok(Vec::new());
        };
        let values = df
            .column(column)
            .map_err(|_| self.missing_column(column))?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        Ok(values)
    }

    /// Drops the rows of `frame` whose `column` value is already stored anywhere
    /// in the dataset. An empty dataset filters nothing.
    pub fn remove_existing_rows(
        &self,
        frame: DataFrame,
        column: &str,
    ) -> Result<DataFrame, StorageError> {
        if self.is_empty()? {
            return Ok(frame);
        }
        let existing: HashSet<String> = self.column_values(column)?.into_iter().collect();

        let keys = frame
            .column(column)
            .map_err(|_| StorageError::MissingColumn {
                location: "fetched rows".to_string(),
                column: column.to_string(),
            })?
            .cast(&DataType::String)?;
        let mask: BooleanChunked = keys
            .str()?
            .into_iter()
            .map(|key| Some(key.map_or(true, |key| !existing.contains(key))))
            .collect();

        Ok(frame.filter(&mask)?)
    }

    /// Appends `frame`. The header is written only if the file is still empty;
    /// otherwise the frame is reordered to the stored header first.
    pub fn append(&self, frame: &DataFrame) -> Result<(), StorageError> {
        if frame.height() == 0 {
            return Ok(());
        }

        let include_header = self.is_empty()?;
        let mut aligned = if include_header {
            frame.clone()
        } else {
            self.align_to_header(frame)?
        };

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::OpenForWrite(self.path.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(include_header)
            .finish(&mut aligned)
            .map_err(|e| StorageError::CsvWrite(self.path.clone(), e))?;

        debug!("Appended {} rows to {}", aligned.height(), self.path.display());
        Ok(())
    }

    /// Replaces the file content with `frame`, header included.
    ///
    /// The frame is written to a sibling file first and renamed over the dataset.
    pub fn rewrite(&self, frame: &mut DataFrame) -> Result<(), StorageError> {
        let tmp_path = self.path.with_extension("csv.tmp");
        let mut file = fs::File::create(&tmp_path)
            .map_err(|e| StorageError::OpenForWrite(tmp_path.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(frame)
            .map_err(|e| StorageError::CsvWrite(tmp_path.clone(), e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .map_err(|e| StorageError::Replace(self.path.clone(), e))?;
        Ok(())
    }

    /// Column names of the stored header.
    fn header(&self) -> Result<Vec<String>, StorageError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_n_rows(Some(1))
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .map_err(|e| StorageError::CsvRead(self.path.clone(), e))?
            .finish()
            .map_err(|e| StorageError::CsvRead(self.path.clone(), e))?;
        Ok(df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect())
    }

    fn align_to_header(&self, frame: &DataFrame) -> Result<DataFrame, StorageError> {
        let header = self.header()?;

        let unknown: Vec<&str> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .filter(|name| !header.iter().any(|h| h == name))
            .collect();
        if !unknown.is_empty() {
            warn!(
                "Dropping columns {:?} unknown to the header of {}",
                unknown,
                self.path.display()
            );
        }

        let height = frame.height();
        let columns = header
            .iter()
            .map(|name| match frame.column(name) {
                Ok(column) => column.clone(),
                Err(_) => Series::full_null(name.as_str().into(), height, &DataType::String).into(),
            })
            .collect::<Vec<Column>>();
        Ok(DataFrame::new(columns)?)
    }

    fn missing_column(&self, column: &str) -> StorageError {
        StorageError::MissingColumn {
            location: self.path.display().to_string(),
            column: column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frame(times: &[&str], temps: &[f64]) -> DataFrame {
        df!(
            "obsTimeLocal" => times,
            "tempAvg" => temps,
        )
        .unwrap()
    }

    #[test]
    fn test_open_creates_directory_and_empty_file() -> Result<(), StorageError> {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("athens").join("IATHEN61");

        let dataset = CsvDataset::open(&dir, "IATHEN61_history_hourly_m.csv")?;

        assert!(dataset.path().exists());
        assert!(dataset.is_empty()?);
        assert!(dataset.read()?.is_none());
        assert!(dataset.column_values("obsTimeLocal")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_header_is_written_once() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let dataset = CsvDataset::open(tmp.path(), "d.csv")?;

        dataset.append(&frame(&["2023-03-10 00:00:00"], &[1.5]))?;
        dataset.append(&frame(&["2023-03-10 01:00:00"], &[2.5]))?;

        let content = fs::read_to_string(dataset.path())?;
        assert_eq!(content.matches("obsTimeLocal").count(), 1);
        assert_eq!(content.lines().count(), 3);
        Ok(())
    }

    #[test]
    fn test_append_aligns_to_stored_header() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let dataset = CsvDataset::open(tmp.path(), "d.csv")?;
        dataset.append(&frame(&["2023-03-10 00:00:00"], &[1.5]))?;

        let reordered = df!(
            "extra" => &["x"],
            "obsTimeLocal" => &["2023-03-10 01:00:00"],
        )?;
        dataset.append(&reordered)?;

        let stored = dataset.read()?.unwrap();
        assert_eq!(stored.get_column_names(), ["obsTimeLocal", "tempAvg"]);
        assert_eq!(stored.height(), 2);
        assert_eq!(stored.column("tempAvg")?.null_count(), 1);
        assert_eq!(
            dataset.column_values("obsTimeLocal")?,
            vec!["2023-03-10 00:00:00", "2023-03-10 01:00:00"]
        );
        Ok(())
    }

    #[test]
    fn test_remove_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let dataset = CsvDataset::open(tmp.path(), "d.csv")?;

        // Nothing stored yet: everything is new.
        let fresh = dataset.remove_existing_rows(
            frame(&["2023-03-10 00:00:00", "2023-03-10 01:00:00"], &[1.0, 2.0]),
            "obsTimeLocal",
        )?;
        assert_eq!(fresh.height(), 2);
        dataset.append(&fresh)?;

        let incoming = frame(
            &["2023-03-10 01:00:00", "2023-03-10 02:00:00", "2023-03-10 03:00:00"],
            &[2.0, 3.0, 4.0],
        );
        let remaining = dataset.remove_existing_rows(incoming, "obsTimeLocal")?;
        assert_eq!(remaining.height(), 2);
        assert_eq!(
            remaining.column("obsTimeLocal")?.str()?.get(0),
            Some("2023-03-10 02:00:00")
        );
        Ok(())
    }

    #[test]
    fn test_rewrite_replaces_content() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let dataset = CsvDataset::open(tmp.path(), "d.csv")?;
        dataset.append(&frame(&["b", "a"], &[2.0, 1.0]))?;

        let mut replacement = frame(&["a"], &[1.0]);
        dataset.rewrite(&mut replacement)?;

        assert_eq!(dataset.column_values("obsTimeLocal")?, vec!["a"]);
        assert!(!tmp.path().join("d.csv.tmp").exists());
        Ok(())
    }
}
