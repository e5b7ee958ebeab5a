/// Error types for Tab Grouper
use thiserror::Error;

use crate::tab_data::{TabId, WindowId};

/// Failure talking to a classification or embedding provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("no API key configured")]
    MissingKey,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// A `chrome.*` call was rejected or returned something we could not decode
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{call} failed: {message}")]
    Call { call: &'static str, message: String },

    #[error("could not decode {call} result: {message}")]
    Decode { call: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage access failed: {0}")]
    Access(String),

    #[error("could not (de)serialize `{key}`: {message}")]
    Serde { key: String, message: String },
}

#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("browser did not create a group for tab(s) {tab_ids:?} in window {window_id}")]
    GroupCreation { tab_ids: Vec<TabId>, window_id: WindowId },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Crate-level error for entry points that cross layers
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Grouping(#[from] GroupingError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
