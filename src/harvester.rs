//! Drives every selected pipeline in a fixed order: stations, then history
//! modes, units and backends, then forecast modes, units and backends.

use crate::api::WeatherApi;
use crate::config::Config;
use crate::error::HarvestError;
use crate::etl::{ForecastHourlyEtl, ForecastReport, HistoryEtl, HistoryReport};
use crate::storage::{forecast_hourly_storage, history_storage, StorageBackend};
use crate::throttle::{backfill_window, forecast_cooldown, CooldownDecision};
use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::station::Station;
use crate::types::units::Units;
use bon::bon;
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use log::info;

/// What a run covers. Every field defaults to the configuration's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Station groups to visit; empty means all of them.
    pub groups: Vec<String>,
    pub history: Vec<HistoryMode>,
    pub forecast_hourly: Vec<ForecastMode>,
    pub units: Vec<Units>,
    pub store_to: Vec<StorageBackend>,
    /// First backfill day, overriding the resume point of every dataset.
    pub start: Option<NaiveDate>,
    /// Last backfill day, today when unset.
    pub end: Option<NaiveDate>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            groups: Vec::new(),
            history: config.history.clone(),
            forecast_hourly: config.forecast_hourly.clone(),
            units: config.units.clone(),
            store_to: config.store_to.clone(),
            start: None,
            end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRun {
    pub station: Station,
    pub mode: HistoryMode,
    pub units: Units,
    pub backend: StorageBackend,
    pub report: HistoryReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastOutcome {
    Fetched(ForecastReport),
    /// The stored batch is younger than the cooldown.
    Skipped { fresh_until: DateTime<FixedOffset> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRun {
    pub station: Station,
    pub mode: ForecastMode,
    pub units: Units,
    pub backend: StorageBackend,
    pub outcome: ForecastOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub history: Vec<HistoryRun>,
    pub forecasts: Vec<ForecastRun>,
}

impl HarvestSummary {
    pub fn observations_stored(&self) -> usize {
        self.history
            .iter()
            .map(|run| run.report.totals.observations_stored)
            .sum()
    }

    pub fn forecast_rows_stored(&self) -> usize {
        self.forecasts
            .iter()
            .filter_map(|run| match run.outcome {
                ForecastOutcome::Fetched(report) => Some(report.rows_stored),
                ForecastOutcome::Skipped { .. } => None,
            })
            .sum()
    }

    pub fn skipped_forecasts(&self) -> usize {
        self.forecasts
            .iter()
            .filter(|run| matches!(run.outcome, ForecastOutcome::Skipped { .. }))
            .count()
    }
}

pub struct Harvester<'a> {
    config: &'a Config,
    api: &'a dyn WeatherApi,
    options: RunOptions,
    now: DateTime<FixedOffset>,
}

#[bon]
impl<'a> Harvester<'a> {
    /// `options` defaults to [`RunOptions::from_config`], `now` to the local clock.
    #[builder]
    pub fn new(
        config: &'a Config,
        api: &'a dyn WeatherApi,
        options: Option<RunOptions>,
        now: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            config,
            api,
            options: options.unwrap_or_else(|| RunOptions::from_config(config)),
            now: now.unwrap_or_else(|| Local::now().fixed_offset()),
        }
    }

    pub fn run(&self) -> Result<HarvestSummary, HarvestError> {
        let stations = self.config.stations(&self.options.groups)?;
        let mut summary = HarvestSummary::default();

        for station in &stations {
            for &mode in &self.options.history {
                for &units in &self.options.units {
                    for &backend in &self.options.store_to {
                        let report = self.run_history(station, mode, units, backend)?;
                        summary.history.push(HistoryRun {
                            station: station.clone(),
                            mode,
                            units,
                            backend,
                            report,
                        });
                    }
                }
            }

            for &mode in &self.options.forecast_hourly {
                for &units in &self.options.units {
                    for &backend in &self.options.store_to {
                        let outcome = self.run_forecast(station, mode, units, backend)?;
                        summary.forecasts.push(ForecastRun {
                            station: station.clone(),
                            mode,
                            units,
                            backend,
                            outcome,
                        });
                    }
                }
            }
        }

        info!(
            "Harvested {} stations: {} observations stored, {} forecast rows stored, {} forecasts skipped",
            stations.len(),
            summary.observations_stored(),
            summary.forecast_rows_stored(),
            summary.skipped_forecasts()
        );
        Ok(summary)
    }

    fn run_history(
        &self,
        station: &Station,
        mode: HistoryMode,
        units: Units,
        backend: StorageBackend,
    ) -> Result<HistoryReport, HarvestError> {
        let storage = history_storage(backend, &self.config.data_dir, station, mode, units)?;
        let window = backfill_window(
            self.options.start,
            self.options.end,
            storage.last_date(),
            self.config.start_date,
            self.now.date_naive(),
        );

        let report = HistoryEtl::builder()
            .station(station)
            .api(self.api)
            .mode(mode)
            .units(units)
            .storage(storage.as_ref())
            .start(window.start)
            .end(window.end)
            .build()
            .run()?;
        Ok(report)
    }

    fn run_forecast(
        &self,
        station: &Station,
        mode: ForecastMode,
        units: Units,
        backend: StorageBackend,
    ) -> Result<ForecastOutcome, HarvestError> {
        let storage =
            forecast_hourly_storage(backend, &self.config.data_dir, station, mode, units)?;

        let cooldown_hours = self.config.forecast_hourly_after_n_hours;
        let decision = forecast_cooldown(
            storage.last_date(),
            mode.horizon_hours(),
            cooldown_hours,
            self.now,
        );
        if let CooldownDecision::Skip {
            last_request,
            fresh_until,
        } = decision
        {
            info!(
                "{} We already have forecast-hourly-{}-{} for the past {}h (requested {}, next after {})",
                station, mode, units, cooldown_hours, last_request, fresh_until
            );
            return Ok(ForecastOutcome::Skipped { fresh_until });
        }

        let report = ForecastHourlyEtl::builder()
            .station(station)
            .api(self.api)
            .mode(mode)
            .units(units)
            .storage(storage.as_ref())
            .build()
            .run()?;
        Ok(ForecastOutcome::Fetched(report))
    }
}
