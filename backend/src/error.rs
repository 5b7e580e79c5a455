use thiserror::Error;

pub use crate::livecoinwatch::errors::FetchError;

/// Failure of the persistence layer. Not retried; the cycle aborts and the
/// read path answers with a server error.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("snapshot store unavailable: {0:#}")]
    Unavailable(#[from] anyhow::Error),
}

/// Invalid or missing startup configuration. Always fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
