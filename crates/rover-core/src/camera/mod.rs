//! Camera sensor configuration.

pub mod codec;
pub mod sensor;
pub mod types;

use tracing::{error, info};

pub use codec::{framesize_needs_reinit, CameraOutcome};
pub use sensor::{CameraError, CameraSensor};
pub use types::{FrameSize, PixFormat, SensorSetting, SensorStatus, MAX_GAIN_CEILING};

use crate::error::ConfigError;
use crate::json::Node;

/// Applies a `camera` object, rebuilding the capture pipeline when needed.
///
/// Before a rebuild the sensor settings are saved so the new pipeline
/// starts with them.
pub fn apply(node: Node<'_>, sensor: &mut dyn CameraSensor) -> Result<CameraOutcome, ConfigError> {
    let outcome = codec::decode(node, sensor)?;
    if outcome.reinit_required {
        info!(
            target: "config-camera",
            pixformat = outcome.pixformat.name(),
            framesize = ?outcome.framesize,
            "reinitializing camera"
        );
        sensor.save_settings()?;
        if let Err(err) = sensor.reinitialize(outcome.pixformat, outcome.framesize) {
            error!(target: "config-camera", "camera reinitialization failed: {}", err);
            return Err(err.into());
        }
    }
    Ok(outcome)
}
