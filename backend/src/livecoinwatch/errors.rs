use std::time::Duration;

use thiserror::Error;

/// A failed upstream call. The cycle that produced it writes nothing.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("malformed upstream payload: {0}")]
    Decode(String),

    #[error("invalid response from live coin watch: {0}")]
    InvalidResponse(String),

    #[error("upstream returned an empty batch")]
    EmptyBatch,

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
}
