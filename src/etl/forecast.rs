use crate::api::WeatherApi;
use crate::etl::counters::ForecastReport;
use crate::etl::error::EtlError;
use crate::storage::ForecastHourlyStorage;
use crate::types::mode::ForecastMode;
use crate::types::station::Station;
use crate::types::units::Units;
use bon::bon;
use log::info;
use polars::prelude::DataFrame;
use serde_json::Value;

/// Fetches one hourly forecast batch and appends it whole.
///
/// Whether a fetch is due is decided by the caller, see
/// [`forecast_cooldown`](crate::throttle::forecast_cooldown).
pub struct ForecastHourlyEtl<'a> {
    station: &'a Station,
    api: &'a dyn WeatherApi,
    mode: ForecastMode,
    units: Units,
    storage: &'a ForecastHourlyStorage,
}

#[bon]
impl<'a> ForecastHourlyEtl<'a> {
    #[builder]
    pub fn new(
        station: &'a Station,
        api: &'a dyn WeatherApi,
        mode: ForecastMode,
        units: Units,
        storage: &'a ForecastHourlyStorage,
    ) -> Self {
        Self {
            station,
            api,
            mode,
            units,
            storage,
        }
    }

    pub fn extract(&self) -> Option<Value> {
        self.station
            .fetch_forecast_hourly(self.api, self.mode, self.units)
    }

    pub fn transform(&self, payload: &Value) -> Result<DataFrame, EtlError> {
        Ok(self.storage.transform(payload)?)
    }

    pub fn load(&self, frame: &DataFrame) -> Result<usize, EtlError> {
        if frame.height() == 0 {
            return Ok(0);
        }
        self.storage.load(frame)?;
        Ok(frame.height())
    }

    pub fn run(&self) -> Result<ForecastReport, EtlError> {
        info!(
            "{}, getting forecast-{}-hourly-{} data, storing to {}",
            self.station,
            self.mode,
            self.units.text(),
            self.storage.name()
        );

        let Some(payload) = self.extract() else {
            return Ok(ForecastReport::default());
        };
        let frame = self.transform(&payload)?;
        let rows_stored = self.load(&frame)?;

        info!("{}, Inserted: {}", self.station, rows_stored);
        Ok(ForecastReport {
            fetched: true,
            rows_stored,
        })
    }
}
