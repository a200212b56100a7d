//! JSON codec for the `control` config object.

use std::fmt::{self, Write};
use std::time::Duration;

use tracing::debug;

use super::activity::ControlActivity;
use super::hardware::{Hardware, Light};
use crate::error::ConfigError;
use crate::json::{expect_scalar, Node};

const TAG: &str = "config-control";

/// Applies a `control` object. Any control object, even one with only
/// unknown keys, counts as control input.
pub fn decode(
    node: Node<'_>,
    now: Duration,
    activity: &mut ControlActivity,
    hardware: &mut dyn Hardware,
) -> Result<(), ConfigError> {
    activity.refresh(now);
    node.scan(|key, entry| {
        let value = expect_scalar(entry)?;
        match key {
            "mainLight" => hardware.set_light(Light::Main, value.as_bool()),
            "otherLight" => hardware.set_light(Light::Other, value.as_bool()),
            _ => debug!(target: TAG, "Unknown field '{}', ignoring.", key),
        }
        Ok(())
    })
}

/// Writes the `control` report object from the live outputs.
pub fn write_report<W: Write>(w: &mut W, hardware: &dyn Hardware) -> fmt::Result {
    write!(
        w,
        "{{\"mainLight\":{},\"otherLight\":{}}}",
        u8::from(hardware.light(Light::Main)),
        u8::from(hardware.light(Light::Other))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::Document;
    use crate::testing::MockHardware;

    #[test]
    fn test_decode_sets_lights_and_refreshes() {
        let mut activity = ControlActivity::default();
        let mut hardware = MockHardware::default();
        let doc = Document::parse(r#"{"mainLight":true,"otherLight":"no","horn":1}"#, 32).unwrap();

        decode(doc.root(), Duration::from_secs(3), &mut activity, &mut hardware).unwrap();

        assert!(hardware.light(Light::Main));
        assert!(!hardware.light(Light::Other));
        assert_eq!(activity.last_control(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_report_roundtrip() {
        let mut hardware = MockHardware::default();
        hardware.set_light(Light::Other, true);

        let mut text = String::new();
        write_report(&mut text, &hardware).unwrap();
        assert_eq!(text, r#"{"mainLight":0,"otherLight":1}"#);

        let mut restored = MockHardware::default();
        let doc = Document::parse(&text, 32).unwrap();
        decode(doc.root(), Duration::ZERO, &mut ControlActivity::default(), &mut restored).unwrap();
        assert!(!restored.light(Light::Main));
        assert!(restored.light(Light::Other));
    }

    #[test]
    fn test_nested_value_rejected() {
        let mut hardware = MockHardware::default();
        let doc = Document::parse(r#"{"mainLight":{"on":1}}"#, 32).unwrap();
        let result = decode(doc.root(), Duration::ZERO, &mut ControlActivity::default(), &mut hardware);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
