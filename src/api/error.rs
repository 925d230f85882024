use thiserror::Error;

/// Transport-level failures of the remote weather API.
///
/// These never escape the [`crate::WeatherApi`] boundary: they are logged and
/// turned into an absent payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}: {body}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode JSON response from {0}")]
    Decode(String, #[source] reqwest::Error),
}
