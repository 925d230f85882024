use crate::api::error::FetchError;
use crate::config::error::ConfigError;
use crate::etl::error::EtlError;
use crate::storage::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Etl(#[from] EtlError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
