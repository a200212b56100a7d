//! Error types shared by the configuration pipeline.

use thiserror::Error;

use crate::camera::CameraError;
use crate::json::TokenizeError;
use crate::network::RadioError;
use crate::storage::StorageError;

/// Errors produced while applying or reporting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input text could not be tokenized.
    #[error("malformed JSON: {0}")]
    Tokenize(#[from] TokenizeError),

    /// The token stream does not have the expected shape.
    #[error("parse error: {0}")]
    Parse(&'static str),

    /// A recognised field carried a value that was rejected.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        reason: &'static str,
    },

    /// Reading or writing persisted state failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Reconfiguring the radio failed.
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),

    /// The camera sensor refused an operation.
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),

    /// The report did not fit into the provided buffer.
    #[error("report buffer exhausted")]
    BufferExhausted,
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: &'static str) -> Self {
        ConfigError::InvalidValue { key, reason }
    }

    /// Whether the error was caused by the request itself rather than the device.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Tokenize(_) | ConfigError::Parse(_) | ConfigError::InvalidValue { .. }
        )
    }
}

impl From<std::fmt::Error> for ConfigError {
    fn from(_: std::fmt::Error) -> Self {
        ConfigError::BufferExhausted
    }
}
