use thiserror::Error;

use rover_core::ConfigError;

/// Errors surfaced by the controller and its runtime plumbing.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The device rejected a config apply or could not report.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The controller task is no longer running.
    #[error("controller stopped")]
    Stopped,
}
