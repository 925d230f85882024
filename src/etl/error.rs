use crate::storage::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Malformed payload for {station}: {reason}")]
    MalformedPayload { station: String, reason: String },
}
