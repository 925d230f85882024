use crate::api::error::FetchError;
use crate::api::WeatherApi;
use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;

pub const HISTORY_URL: &str = "https://api.weather.com/v2/pws/history";
pub const FORECAST_HOURLY_URL: &str = "https://api.weather.com/v3/wx/forecast/hourly";

/// History query dates must be `YYYYMMDD`.
const HISTORY_DATE_FORMAT: &str = "%Y%m%d";

/// Blocking client for the weather.com PWS endpoints.
#[derive(Debug, Clone)]
pub struct WundergroundClient {
    api_key: String,
    history_url: String,
    forecast_hourly_url: String,
    http: Client,
}

impl WundergroundClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_base_urls(api_key, HISTORY_URL, FORECAST_HOURLY_URL)
    }

    /// Same as [`WundergroundClient::new`] but against other endpoints, e.g. a proxy.
    /// The mode label is appended to each base URL as the last path segment.
    pub fn with_base_urls(
        api_key: impl Into<String>,
        history_url: impl Into<String>,
        forecast_hourly_url: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pws-harvester/", env!("CARGO_PKG_VERSION"))),
        );
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self {
            api_key: api_key.into(),
            history_url: history_url.into().trim_end_matches('/').to_string(),
            forecast_hourly_url: forecast_hourly_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn history_endpoint(&self, mode: HistoryMode) -> String {
        format!("{}/{}", self.history_url, mode.label())
    }

    fn forecast_hourly_endpoint(&self, mode: ForecastMode) -> String {
        format!("{}/{}", self.forecast_hourly_url, mode.label())
    }

    /// Requests one day of history. `Ok(None)` is a `204 No Content` reply.
    pub fn request_history(
        &self,
        station: &Station,
        date: NaiveDate,
        mode: HistoryMode,
        units: Units,
    ) -> Result<Option<Value>, FetchError> {
        let url = self.history_endpoint(mode);
        let date_param = date.format(HISTORY_DATE_FORMAT).to_string();
        debug!("Requesting {} history for {} on {}", mode, station, date_param);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("stationId", station.id.as_str()),
                ("format", "json"),
                ("units", units.code()),
                ("date", date_param.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("numericPrecision", "decimal"),
            ])
            .send()
            // The request URL carries the api key.
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e.without_url()))?;

        Self::decode(url, response)
    }

    /// Requests the hourly forecast for the station's geocode.
    pub fn request_forecast_hourly(
        &self,
        station: &Station,
        mode: ForecastMode,
        units: Units,
    ) -> Result<Option<Value>, FetchError> {
        let url = self.forecast_hourly_endpoint(mode);
        debug!("Requesting forecast-{}-hourly for {}", mode, station);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("geocode", station.geocode.as_str()),
                ("format", "json"),
                ("units", units.code()),
                ("language", "en"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e.without_url()))?;

        Self::decode(url, response)
    }

    fn decode(url: String, response: Response) -> Result<Option<Value>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            // The server explains rejected requests in the body.
            let body = response.text().unwrap_or_default();
            return Err(FetchError::HttpStatus { url, status, body });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        response
            .json::<Value>()
            .map(Some)
            .map_err(|e| FetchError::Decode(url, e.without_url()))
    }

    fn fail_soft(station: &Station, result: Result<Option<Value>, FetchError>) -> Option<Value> {
        match result {
            Ok(Some(payload)) => Some(payload),
            Ok(None) => {
                info!("{}: 204 No content", station);
                None
            }
            Err(e) => {
                warn!("{}: {}", station, e);
                None
            }
        }
    }
}

impl WeatherApi for WundergroundClient {
    fn history(
        &self,
        station: &Station,
        date: NaiveDate,
        mode: HistoryMode,
        units: Units,
    ) -> Option<Value> {
        Self::fail_soft(station, self.request_history(station, date, mode, units))
    }

    fn forecast_hourly(
        &self,
        station: &Station,
        mode: ForecastMode,
        units: Units,
    ) -> Option<Value> {
        Self::fail_soft(station, self.request_forecast_hourly(station, mode, units))
    }
}
