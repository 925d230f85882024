//! Extract, transform and load pipelines, one per data category.
//!
//! Each pipeline exposes its three stages as separate methods and composes
//! them in `run`. Fetch failures are absorbed by the API seam; storage
//! failures propagate and abort the run.

pub mod counters;
pub mod error;
pub mod forecast;
pub mod history;

pub use counters::{DayCounts, DayReport, ForecastReport, HistoryReport};
pub use error::EtlError;
pub use forecast::ForecastHourlyEtl;
pub use history::{HistoryEtl, Transformed};
