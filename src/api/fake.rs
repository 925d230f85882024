use crate::api::WeatherApi;
use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::NaiveDate;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// In-memory [`WeatherApi`] serving canned payloads. Days without a payload
/// behave like a transport failure.
#[derive(Default)]
pub(crate) struct FakeApi {
    history: HashMap<NaiveDate, Value>,
    forecast: Option<Value>,
    history_calls: RefCell<Vec<NaiveDate>>,
    forecast_calls: Cell<usize>,
}

impl FakeApi {
    pub(crate) fn with_history(mut self, date: NaiveDate, payload: Value) -> Self {
        self.history.insert(date, payload);
        self
    }

    pub(crate) fn with_forecast(mut self, payload: Value) -> Self {
        self.forecast = Some(payload);
        self
    }

    pub(crate) fn history_calls(&self) -> Vec<NaiveDate> {
        self.history_calls.borrow().clone()
    }

    pub(crate) fn forecast_calls(&self) -> usize {
        self.forecast_calls.get()
    }
}

impl WeatherApi for FakeApi {
    fn history(
        &self,
        _station: &Station,
        date: NaiveDate,
        _mode: HistoryMode,
        _units: Units,
    ) -> Option<Value> {
        self.history_calls.borrow_mut().push(date);
        self.history.get(&date).cloned()
    }

    fn forecast_hourly(
        &self,
        _station: &Station,
        _mode: ForecastMode,
        _units: Units,
    ) -> Option<Value> {
        self.forecast_calls.set(self.forecast_calls.get() + 1);
        self.forecast.clone()
    }
}

/// A history payload with one observation every `step_minutes` starting at midnight of `date`.
pub(crate) fn history_payload(date: NaiveDate, count: usize, step_minutes: i64) -> Value {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap();
    let observations: Vec<Value> = (0..count)
        .map(|i| {
            let local = midnight + chrono::Duration::minutes(i as i64 * step_minutes);
            serde_json::json!({
                "stationID": "IATHEN61",
                "obsTimeLocal": local.format("%Y-%m-%d %H:%M:%S").to_string(),
                "humidityAvg": 60 + (i % 10) as i64,
                "metric": {
                    "tempAvg": 10.5 + i as f64,
                    "pressureMax": 1013.2,
                }
            })
        })
        .collect();
    serde_json::json!({ "observations": observations })
}
