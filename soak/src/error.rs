use soak_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoakError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Required input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Endpoint {endpoint} is unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to encode run state: {0}")]
    State(#[from] serde_json::Error),
}

impl SoakError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| SoakError::Io { path, source }
    }
}
