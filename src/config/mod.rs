//! Typed run configuration: API key, defaults for the command line and the
//! station registry.
//!
//! The configuration is validated when it is loaded and can be installed once
//! as process-wide read-only state with [`install`].

pub mod error;

use crate::config::error::ConfigError;
use crate::storage::StorageBackend;
use crate::types::mode::{ForecastMode, HistoryMode};
use crate::types::station::Station;
use crate::types::units::Units;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "pws-harvester.toml";

/// One year.
pub const MAX_COOLDOWN_HOURS: i64 = 24 * 365;

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub api_key: String,
    /// First backfill day for datasets that are still empty.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_units")]
    pub units: Vec<Units>,
    #[serde(default = "default_history")]
    pub history: Vec<HistoryMode>,
    #[serde(default)]
    pub forecast_hourly: Vec<ForecastMode>,
    /// Minimum hours between two requests of the same forecast.
    #[serde(default = "default_cooldown_hours")]
    pub forecast_hourly_after_n_hours: i64,
    #[serde(default = "default_store_to")]
    pub store_to: Vec<StorageBackend>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Stations keyed by group name.
    pub stations: BTreeMap<String, Vec<StationConfig>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    pub id: String,
    pub geocode: String,
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 12, 31).unwrap_or_default()
}

fn default_units() -> Vec<Units> {
    vec![Units::Metric]
}

fn default_history() -> Vec<HistoryMode> {
    vec![HistoryMode::Hourly]
}

fn default_cooldown_hours() -> i64 {
    24
}

fn default_store_to() -> Vec<StorageBackend> {
    vec![StorageBackend::Csv]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Config {
    /// Reads and validates the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "string")
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::Parse(origin.to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("api_key is empty".to_string()));
        }
        if !(0..=MAX_COOLDOWN_HOURS).contains(&self.forecast_hourly_after_n_hours) {
            return Err(ConfigError::Invalid(format!(
                "forecast_hourly_after_n_hours must be between 0 and {}, got {}",
                MAX_COOLDOWN_HOURS, self.forecast_hourly_after_n_hours
            )));
        }
        if self.stations.is_empty() {
            return Err(ConfigError::Invalid("no station groups".to_string()));
        }

        for (group, stations) in &self.stations {
            if stations.is_empty() {
                return Err(ConfigError::Invalid(format!("group '{group}' has no stations")));
            }
            let mut seen = HashSet::new();
            for station in stations {
                if station.id.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "group '{group}' has a station without id"
                    )));
                }
                if !seen.insert(station.id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "station '{}' appears twice in group '{group}'",
                        station.id
                    )));
                }
                validate_geocode(&station.geocode).map_err(|reason| {
                    ConfigError::Invalid(format!(
                        "station '{}' in group '{group}': {reason}",
                        station.id
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Stations of the given groups, in group name order. Repeated groups are
    /// visited once; an empty selection means every group.
    pub fn stations(&self, groups: &[String]) -> Result<Vec<Station>, ConfigError> {
        let selected: BTreeSet<&str> = if groups.is_empty() {
            self.stations.keys().map(String::as_str).collect()
        } else {
            groups.iter().map(String::as_str).collect()
        };

        let mut stations = Vec::new();
        for group in selected {
            let members = self
                .stations
                .get(group)
                .ok_or_else(|| ConfigError::UnknownGroup(group.to_string()))?;
            stations.extend(
                members
                    .iter()
                    .map(|s| Station::new(group, s.id.as_str(), s.geocode.as_str())),
            );
        }
        Ok(stations)
    }
}

fn validate_geocode(geocode: &str) -> Result<(), String> {
    let (lat, lon) = geocode
        .split_once(',')
        .ok_or_else(|| format!("geocode '{geocode}' is not 'lat,lon'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("latitude '{lat}' is not a number"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("longitude '{lon}' is not a number"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("geocode '{geocode}' is out of range"));
    }
    Ok(())
}

/// `pws-harvester.toml` in the working directory if present, otherwise
/// `pws-harvester/config.toml` under the user's config directory.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("pws-harvester").join("config.toml"))
        .unwrap_or(local)
}

/// Makes `config` the process-wide configuration. Fails if one is already installed.
pub fn install(config: Config) -> Result<&'static Config, ConfigError> {
    let mut installed = false;
    let current = CONFIG.get_or_init(|| {
        installed = true;
        config
    });
    if installed {
        Ok(current)
    } else {
        Err(ConfigError::AlreadyInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        api_key = "secret"

        [[stations.athens]]
        id = "IATHEN61"
        geocode = "37.97,23.72"
    "#;

    #[test]
    fn test_defaults() -> Result<(), ConfigError> {
        let config = Config::from_toml_str(MINIMAL)?;
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
        assert_eq!(config.units, vec![Units::Metric]);
        assert_eq!(config.history, vec![HistoryMode::Hourly]);
        assert!(config.forecast_hourly.is_empty());
        assert_eq!(config.forecast_hourly_after_n_hours, 24);
        assert_eq!(config.store_to, vec![StorageBackend::Csv]);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), ConfigError> {
        let config = Config::from_toml_str(
            r#"
            api_key = "secret"
            start_date = "2023-01-15"
            units = ["m", "e"]
            history = ["hourly", "all"]
            forecast_hourly = ["2day"]
            forecast_hourly_after_n_hours = 12
            store_to = ["csv"]
            data_dir = "/var/lib/pws"

            [[stations.athens]]
            id = "IATHEN61"
            geocode = "37.97,23.72"

            [[stations.athens]]
            id = "IATHEN76"
            geocode = "37.97,23.71"

            [[stations.my_group]]
            id = "IJAKAR14"
            geocode = "-6.19,106.80"
            "#,
        )?;
        assert_eq!(config.units, vec![Units::Metric, Units::Imperial]);
        assert_eq!(config.forecast_hourly, vec![ForecastMode::TwoDay]);
        assert_eq!(config.stations["athens"].len(), 2);
        Ok(())
    }

    #[test]
    fn test_station_selection() -> Result<(), ConfigError> {
        let config = Config::from_toml_str(
            r#"
            api_key = "secret"
            [[stations.osaka]]
            id = "I27TSURU2"
            geocode = "34.63,135.42"
            [[stations.athens]]
            id = "IATHEN61"
            geocode = "37.97,23.72"
            "#,
        )?;

        let all = config.stations(&[])?;
        assert_eq!(
            all.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            ["IATHEN61", "I27TSURU2"]
        );

        let osaka = config.stations(&["osaka".to_string(), "osaka".to_string()])?;
        assert_eq!(osaka, vec![Station::new("osaka", "I27TSURU2", "34.63,135.42")]);

        assert!(matches!(
            config.stations(&["paris".to_string()]),
            Err(ConfigError::UnknownGroup(group)) if group == "paris"
        ));
        Ok(())
    }

    #[test]
    fn test_validation_failures() {
        let invalid = [
            r#"api_key = "k"
               stations = {}"#,
            r#"api_key = "k"
               stations = { athens = [] }"#,
            r#"api_key = "k"
               [[stations.athens]]
               id = ""
               geocode = "37.97,23.72""#,
            r#"api_key = "k"
               [[stations.athens]]
               id = "IATHEN61"
               geocode = "37.97,23.72"
               [[stations.athens]]
               id = "IATHEN61"
               geocode = "37.97,23.72""#,
            r#"api_key = "k"
               [[stations.athens]]
               id = "IATHEN61"
               geocode = "97.97,23.72""#,
            r#"api_key = "k"
               [[stations.athens]]
               id = "IATHEN61"
               geocode = "athens""#,
        ];
        for text in invalid {
            assert!(
                matches!(Config::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn test_cooldown_hours_are_bounded() -> Result<(), ConfigError> {
        let with_cooldown = |hours: i64| {
            Config::from_toml_str(&MINIMAL.replace(
                "api_key = \"secret\"",
                &format!("api_key = \"secret\"\nforecast_hourly_after_n_hours = {hours}"),
            ))
        };

        assert_eq!(with_cooldown(0)?.forecast_hourly_after_n_hours, 0);
        assert_eq!(
            with_cooldown(MAX_COOLDOWN_HOURS)?.forecast_hourly_after_n_hours,
            MAX_COOLDOWN_HOURS
        );
        for hours in [-1, MAX_COOLDOWN_HOURS + 1, 3_000_000_000] {
            assert!(matches!(with_cooldown(hours), Err(ConfigError::Invalid(_))));
        }
        Ok(())
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            Config::from_toml_str("api_key = \"k\"\nunits = [\"kelvin\"]\nstations = {}"),
            Err(ConfigError::Parse(..))
        ));
        assert!(matches!(
            Config::load(Path::new("/nonexistent/pws-harvester.toml")),
            Err(ConfigError::Read(..))
        ));
    }

    #[test]
    fn test_install_once() -> Result<(), ConfigError> {
        let config = Config::from_toml_str(MINIMAL)?;
        let installed = install(config.clone())?;
        assert_eq!(installed, &config);
        assert!(matches!(install(config), Err(ConfigError::AlreadyInstalled)));
        Ok(())
    }
}
