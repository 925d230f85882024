pub mod api;
pub mod config;
pub mod error;
pub mod etl;
pub mod harvester;
pub mod storage;
pub mod throttle;
pub mod types;

pub use error::HarvestError;
pub use harvester::{HarvestSummary, Harvester, RunOptions};

pub use api::client::WundergroundClient;
pub use api::error::FetchError;
pub use api::WeatherApi;

pub use config::error::ConfigError;
pub use config::Config;

pub use etl::{EtlError, ForecastHourlyEtl, ForecastReport, HistoryEtl, HistoryReport};

pub use storage::error::StorageError;
pub use storage::{Storage, StorageBackend};

pub use types::category::Category;
pub use types::mode::{ForecastMode, HistoryMode};
pub use types::station::Station;
pub use types::units::Units;
