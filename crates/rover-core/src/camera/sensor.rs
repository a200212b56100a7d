//! Camera sensor driver abstraction.

use thiserror::Error;

use super::types::{FrameSize, PixFormat, SensorSetting, SensorStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No sensor is attached or the driver is not initialised.
    #[error("camera sensor unavailable")]
    Unavailable,

    /// The sensor rejected a setting.
    #[error("sensor rejected {0}")]
    Rejected(&'static str),

    /// Re-creating the capture pipeline failed.
    #[error("reinitialization failed: {0}")]
    Reinit(String),

    /// Saving the sensor settings failed.
    #[error("saving settings failed: {0}")]
    Persist(String),
}

/// Operations the config pipeline needs from the camera driver.
pub trait CameraSensor: Send {
    /// Current parameters, or [`CameraError::Unavailable`] without a sensor.
    fn status(&self) -> Result<SensorStatus, CameraError>;

    fn set(&mut self, setting: SensorSetting) -> Result<(), CameraError>;

    /// Persists the current parameters so a reinitialisation restores them.
    fn save_settings(&mut self) -> Result<(), CameraError>;

    /// Tears down and re-creates the capture pipeline.
    fn reinitialize(&mut self, pixformat: PixFormat, framesize: FrameSize)
        -> Result<(), CameraError>;
}
