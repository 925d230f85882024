use crate::api::WeatherApi;
use crate::etl::counters::{DayCounts, DayReport, HistoryReport};
use crate::etl::error::EtlError;
use crate::storage::HistoryStorage;
use crate::throttle::DateWindow;
use crate::types::mode::HistoryMode;
use crate::types::station::Station;
use crate::types::units::Units;
use bon::bon;
use chrono::NaiveDate;
use log::info;
use polars::prelude::DataFrame;
use serde_json::Value;

/// Output of [`HistoryEtl::transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Observations in the raw payload, before anything was dropped.
    pub observations_len: usize,
    /// Rows not yet present in the dataset.
    pub frame: DataFrame,
}

impl Transformed {
    pub fn observations_existing(&self) -> usize {
        self.observations_len.saturating_sub(self.frame.height())
    }
}

/// Backfills one history dataset day by day over an inclusive date range.
pub struct HistoryEtl<'a> {
    station: &'a Station,
    api: &'a dyn WeatherApi,
    mode: HistoryMode,
    units: Units,
    storage: &'a HistoryStorage,
    window: DateWindow,
}

#[bon]
impl<'a> HistoryEtl<'a> {
    #[builder]
    pub fn new(
        station: &'a Station,
        api: &'a dyn WeatherApi,
        mode: HistoryMode,
        units: Units,
        storage: &'a HistoryStorage,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            station,
            api,
            mode,
            units,
            storage,
            window: DateWindow::new(start, end),
        }
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    /// Raw payload for `date`, or `None` when the API had nothing to give.
    pub fn extract(&self, date: NaiveDate) -> Option<Value> {
        self.station
            .fetch_history(self.api, date, self.mode, self.units)
    }

    /// Flattens `payload` and drops the observations the dataset already holds.
    pub fn transform(&self, payload: &Value) -> Result<Transformed, EtlError> {
        let observations_len = payload
            .get("observations")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| EtlError::MalformedPayload {
                station: self.station.to_string(),
                reason: "no 'observations' array".to_string(),
            })?;

        let frame = self.storage.transform(payload)?;
        Ok(Transformed {
            observations_len,
            frame,
        })
    }

    /// Appends `frame` and returns how many rows were stored.
    pub fn load(&self, frame: &DataFrame) -> Result<usize, EtlError> {
        if frame.height() == 0 {
            return Ok(0);
        }
        self.storage.load(frame)?;
        Ok(frame.height())
    }

    fn process_day(&self, date: NaiveDate) -> Result<DayReport, EtlError> {
        let Some(payload) = self.extract(date) else {
            return Ok(DayReport {
                date,
                fetched: false,
                counts: DayCounts::default(),
            });
        };

        let transformed = self.transform(&payload)?;
        let observations_stored = self.load(&transformed.frame)?;
        Ok(DayReport {
            date,
            fetched: true,
            counts: DayCounts {
                observations_len: transformed.observations_len,
                observations_existing: transformed.observations_existing(),
                observations_stored,
            },
        })
    }

    /// Runs every day of the window in order, then tidies the dataset up.
    pub fn run(&self) -> Result<HistoryReport, EtlError> {
        info!(
            "{}, getting history-{}-{} data from {}, to {}, storing to {}",
            self.station,
            self.mode,
            self.units.text(),
            self.window.start,
            self.window.end,
            self.storage.name()
        );

        let mut report = HistoryReport::default();
        for (i, date) in self.window.iter_days().enumerate() {
            let day = self.process_day(date)?;
            if day.fetched {
                info!("{}, {}: {}, {}", self.station, i + 1, date, day.counts);
            } else {
                info!("{}, {}: {}, nothing fetched", self.station, i + 1, date);
            }
            report.record(day);
        }

        info!("{}, Totals\t {}", self.station, report.totals);
        self.storage.tidyup()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{history_payload, FakeApi};
    use crate::storage::csv::CsvHistory;
    use crate::storage::Storage;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, day).unwrap()
    }

    fn station() -> Station {
        Station::new("athens", "IATHEN61", "37.97,23.72")
    }

    fn open(tmp: &TempDir) -> CsvHistory {
        CsvHistory::open(tmp.path(), &station(), HistoryMode::Hourly, Units::Metric).unwrap()
    }

    fn run(
        api: &FakeApi,
        storage: &CsvHistory,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoryReport, EtlError> {
        let station = station();
        HistoryEtl::builder()
            .station(&station)
            .api(api)
            .mode(HistoryMode::Hourly)
            .units(Units::Metric)
            .storage(storage)
            .start(start)
            .end(end)
            .build()
            .run()
    }

    #[test]
    fn test_backfill_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let storage = open(&tmp);
        let api = (10..=12).fold(FakeApi::default(), |api, d| {
            api.with_history(date(d), history_payload(date(d), 24, 60))
        });

        let first = run(&api, &storage, date(10), date(12))?;
        assert_eq!(first.totals.observations_stored, 72);
        let content = fs::read_to_string(storage.dataset().path())?;

        let second = run(&api, &storage, date(10), date(12))?;
        assert_eq!(second.totals.observations_len, 72);
        assert_eq!(second.totals.observations_existing, 72);
        assert_eq!(second.totals.observations_stored, 0);
        assert_eq!(fs::read_to_string(storage.dataset().path())?, content);
        Ok(())
    }

    #[test]
    fn test_failed_day_does_not_abort_backfill() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let storage = open(&tmp);
        let api = [10, 11, 13, 14].into_iter().fold(FakeApi::default(), |api, d| {
            api.with_history(date(d), history_payload(date(d), 24, 60))
        });

        let report = run(&api, &storage, date(10), date(14))?;

        assert_eq!(api.history_calls(), (10..=14).map(date).collect::<Vec<_>>());
        assert_eq!(report.days.len(), 5);
        assert_eq!(report.days[2].counts, DayCounts::default());
        assert_eq!(report.missed_days().collect::<Vec<_>>(), vec![date(12)]);
        assert_eq!(report.totals.observations_len, 96);
        assert_eq!(report.totals.observations_stored, 96);
        Ok(())
    }

    #[test]
    fn test_dedup_accounting() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let storage = open(&tmp);
        storage.load(&storage.transform(&history_payload(date(10), 100, 5))?)?;

        let api = FakeApi::default().with_history(date(10), history_payload(date(10), 144, 5));
        let report = run(&api, &storage, date(10), date(10))?;

        assert_eq!(
            report.days[0].counts,
            DayCounts {
                observations_len: 144,
                observations_existing: 100,
                observations_stored: 44,
            }
        );
        assert_eq!(storage.dataset().column_values("obsTimeLocal")?.len(), 144);
        Ok(())
    }

    #[test]
    fn test_empty_day_adds_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let storage = open(&tmp);
        let api = FakeApi::default().with_history(date(10), json!({ "observations": [] }));

        let report = run(&api, &storage, date(10), date(10))?;

        assert!(report.days[0].fetched);
        assert_eq!(report.totals, DayCounts::default());
        assert!(storage.dataset().is_empty()?);
        Ok(())
    }

    #[test]
    fn test_malformed_payload_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let storage = open(&tmp);
        let api = FakeApi::default().with_history(date(10), json!({ "errors": ["bad key"] }));

        let result = run(&api, &storage, date(10), date(11));

        assert!(matches!(result, Err(EtlError::MalformedPayload { .. })));
        assert_eq!(api.history_calls(), vec![date(10)]);
    }

    #[test]
    fn test_dataset_sorted_and_unique_after_run() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let storage = open(&tmp);
        let api = (10..=12).fold(FakeApi::default(), |api, d| {
            api.with_history(date(d), history_payload(date(d), 12, 120))
        });

        run(&api, &storage, date(12), date(12))?;
        run(&api, &storage, date(10), date(12))?;

        let times = storage.dataset().column_values("obsTimeLocal")?;
        assert_eq!(times.len(), 36);
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
        Ok(())
    }

    #[test]
    fn test_inverted_window_fetches_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = TempDir::new()?;
        let storage = open(&tmp);
        let api = FakeApi::default();

        let report = run(&api, &storage, date(12), date(10))?;

        assert!(report.days.is_empty());
        assert!(api.history_calls().is_empty());
        Ok(())
    }
}
