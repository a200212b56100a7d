//! JSON codec for the `camera` config object.
//!
//! Settings are written to the sensor as they are scanned. Changing the
//! pixel format, or changing the frame size other than narrowing it while
//! in JPEG mode, needs the capture pipeline re-created; decode reports that
//! instead of doing it.

use std::fmt::{self, Write};

use tracing::{debug, warn};

use super::sensor::{CameraError, CameraSensor};
use super::types::{FrameSize, PixFormat, SensorSetting, SensorStatus, MAX_GAIN_CEILING};
use crate::error::ConfigError;
use crate::json::{expect_scalar, Node, Scalar};

const TAG: &str = "config-camera";

/// Outcome of decoding a `camera` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraOutcome {
    pub reinit_required: bool,
    pub pixformat: PixFormat,
    pub framesize: FrameSize,
}

/// Whether switching between frame sizes needs a pipeline rebuild.
pub fn framesize_needs_reinit(pixformat: PixFormat, from: FrameSize, to: FrameSize) -> bool {
    if from == to {
        return false;
    }
    !(pixformat == PixFormat::Jpeg && to.pixels() <= from.pixels())
}

fn setting_for(key: &str, value: Scalar<'_>) -> Option<SensorSetting> {
    use SensorSetting as S;
    let setting = match key {
        "quality" => S::Quality(value.as_i32()),
        "hmirror" => S::HMirror(value.as_bool()),
        "vflip" => S::VFlip(value.as_bool()),
        "contrast" => S::Contrast(value.as_i32()),
        "brightness" => S::Brightness(value.as_i32()),
        "sharpness" => S::Sharpness(value.as_i32()),
        "denoise" => S::Denoise(value.as_i32()),
        "gain_ceiling" => {
            S::GainCeiling(value.as_i64().clamp(0, i64::from(MAX_GAIN_CEILING)) as u8)
        }
        "agc" => S::Agc(value.as_bool()),
        "agc_gain" => S::AgcGain(value.as_i32()),
        "aec" => S::Aec(value.as_bool()),
        "aec2" | "night" => S::Aec2(value.as_bool()),
        "ae_level" => S::AeLevel(value.as_i32()),
        "aec_value" => S::AecValue(value.as_i32()),
        "awb" => S::Awb(value.as_bool()),
        "awb_gain" => S::AwbGain(value.as_bool()),
        "wb_mode" => S::WbMode(value.as_i32()),
        "dcw" => S::Dcw(value.as_bool()),
        "bpc" => S::Bpc(value.as_bool()),
        "wpc" => S::Wpc(value.as_bool()),
        "raw_gma" => S::RawGma(value.as_bool()),
        "lenc" => S::Lenc(value.as_bool()),
        "special" | "special_effect" => S::SpecialEffect(value.as_i32()),
        _ => return None,
    };
    Some(setting)
}

/// `exposure` is either a manual exposure value, or `a` for automatic
/// exposure optionally followed by an AE level (`"a"`, `"a-1"`, `"auto 2"`).
fn exposure_settings(value: Scalar<'_>) -> [SensorSetting; 2] {
    let text = value.as_str();
    match text.strip_prefix('a') {
        Some(rest) => {
            let level = rest
                .find(|c: char| c.is_ascii_digit() || c == '-')
                .map(|pos| crate::parse::atoi(&rest[pos..]))
                .unwrap_or(0);
            [
                SensorSetting::Aec(true),
                SensorSetting::AeLevel(level.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
            ]
        }
        None => [
            SensorSetting::Aec(false),
            SensorSetting::AecValue(value.as_i32()),
        ],
    }
}

fn write_setting(sensor: &mut dyn CameraSensor, setting: SensorSetting) -> Result<(), ConfigError> {
    match sensor.set(setting) {
        Err(CameraError::Rejected(what)) => {
            warn!(target: TAG, "sensor ignored {}", what);
            Ok(())
        }
        other => other.map_err(ConfigError::from),
    }
}

/// Applies a `camera` object to the sensor.
pub fn decode(node: Node<'_>, sensor: &mut dyn CameraSensor) -> Result<CameraOutcome, ConfigError> {
    let status = sensor.status()?;
    let mut outcome = CameraOutcome {
        reinit_required: false,
        pixformat: status.pixformat,
        framesize: status.framesize,
    };

    node.scan(|key, entry| {
        let value = expect_scalar(entry)?;
        match key {
            "framesize" => {
                let framesize = FrameSize::parse(&value.as_str())
                    .ok_or(ConfigError::invalid("framesize", "unknown frame size"))?;
                if framesize_needs_reinit(outcome.pixformat, outcome.framesize, framesize) {
                    outcome.reinit_required = true;
                }
                outcome.framesize = framesize;
                write_setting(sensor, SensorSetting::FrameSize(framesize))?;
            }
            "pixformat" => {
                let pixformat = PixFormat::parse(&value.as_str())
                    .ok_or(ConfigError::invalid("pixformat", "unknown pixel format"))?;
                if pixformat != outcome.pixformat {
                    outcome.reinit_required = true;
                }
                outcome.pixformat = pixformat;
                write_setting(sensor, SensorSetting::PixFormat(pixformat))?;
            }
            "exposure" => {
                for setting in exposure_settings(value) {
                    write_setting(sensor, setting)?;
                }
            }
            _ => match setting_for(key, value) {
                Some(setting) => write_setting(sensor, setting)?,
                None => debug!(target: TAG, "Unknown field '{}', ignoring.", key),
            },
        }
        Ok(())
    })?;

    Ok(outcome)
}

/// Writes the `camera` report object. Without a sensor the object is empty.
pub fn write_report<W: Write>(w: &mut W, status: Option<&SensorStatus>) -> fmt::Result {
    let Some(s) = status else {
        return w.write_str("{}");
    };
    let b = |v: bool| u8::from(v);
    write!(
        w,
        concat!(
            "{{",
            "\"framesize\":{},\"pixformat\":{},\"quality\":{},",
            "\"hmirror\":{},\"vflip\":{},",
            "\"contrast\":{},\"brightness\":{},\"sharpness\":{},\"denoise\":{},",
            "\"gain_ceiling\":{},\"agc\":{},\"agc_gain\":{},",
            "\"aec\":{},\"aec2\":{},\"ae_level\":{},\"aec_value\":{},",
            "\"awb\":{},\"awb_gain\":{},\"wb_mode\":{},",
            "\"dcw\":{},\"bpc\":{},\"wpc\":{},\"raw_gma\":{},\"lenc\":{},",
            "\"special_effect\":{}",
            "}}"
        ),
        s.framesize.id(),
        s.pixformat.id(),
        s.quality,
        b(s.hmirror),
        b(s.vflip),
        s.contrast,
        s.brightness,
        s.sharpness,
        s.denoise,
        s.gain_ceiling,
        b(s.agc),
        s.agc_gain,
        b(s.aec),
        b(s.aec2),
        s.ae_level,
        s.aec_value,
        b(s.awb),
        b(s.awb_gain),
        s.wb_mode,
        b(s.dcw),
        b(s.bpc),
        b(s.wpc),
        b(s.raw_gma),
        b(s.lenc),
        s.special_effect,
    )
}
