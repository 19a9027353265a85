//! Error types for aiserver

use thiserror::Error;

/// Main error type for aiserver
#[derive(Error, Debug)]
pub enum AiServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hardware detection error
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// External command failed
    #[error("Command failed: {0}")]
    Command(String),

    /// Manifest rendering or writing error
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Installation step error
    #[error("Install error: {0}")]
    Install(String),

    /// Service supervision error
    #[error("Supervisor error: {0}")]
    Supervisor(String),

    /// Stack has not been installed under the configured root
    #[error("Not installed: {0}")]
    NotInstalled(String),

    /// Model not present in the catalog
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for aiserver operations
pub type AiServerResult<T> = Result<T, AiServerError>;

impl From<serde_json::Error> for AiServerError {
    fn from(err: serde_json::Error) -> Self {
        AiServerError::Serialization(err.to_string())
    }
}
