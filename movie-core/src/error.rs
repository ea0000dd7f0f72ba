use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no TMDB access token configured (set TMDB_ACCESS_TOKEN)")]
    MissingCredential,
    #[error("invalid provider url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ProviderError {
    /// Transport failures and server-side errors may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(err) => !err.is_builder(),
            ProviderError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to locate the user configuration directory")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}
