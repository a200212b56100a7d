//! JSON codec for the `network` config object.

use std::fmt::{self, Write};
use std::time::Duration;

use tracing::debug;

use super::types::{
    Interface, InterfaceConfig, NetworkSettings, OperatingMode, AP_CHANNELS, MAX_PASSWORD_LEN,
    MAX_SSID_LEN,
};
use crate::error::ConfigError;
use crate::json::{expect_object, expect_scalar, Entry, JsonStr, Node, Scalar};
use crate::parse::{mask_to_prefix, parse_ipv4, parse_netmask};

const TAG: &str = "config-network";

/// Smallest non-zero fallback timeout.
pub const MIN_FALLBACK: Duration = Duration::from_millis(1000);

/// Applies a fallback value in milliseconds. Zero or negative disables the
/// fallback, anything else is raised to at least [`MIN_FALLBACK`].
pub fn fallback_from_millis(millis: i64) -> Duration {
    match u64::try_from(millis) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(ms) => Duration::from_millis(ms).max(MIN_FALLBACK),
    }
}

/// Decodes a `network` object into `settings`.
///
/// On error `settings` may be partially updated; callers decode into a
/// draft and only use it when the whole object was accepted.
pub fn decode(node: Node<'_>, settings: &mut NetworkSettings) -> Result<(), ConfigError> {
    node.scan(|key, entry| {
        match key {
            "mode" => {
                let value = expect_scalar(entry)?;
                settings.mode = OperatingMode::from_name(&value.as_str())
                    .ok_or(ConfigError::invalid("mode", "expected sta, ap or apsta"))?;
            }
            "fallback" => {
                settings.fallback = fallback_from_millis(expect_scalar(entry)?.as_i64());
            }
            "ap" => decode_interface(expect_object(entry)?, Interface::Ap, &mut settings.ap)?,
            "sta" => decode_interface(expect_object(entry)?, Interface::Sta, &mut settings.sta)?,
            _ => debug!(target: TAG, "Unknown field '{}', ignoring.", key),
        }
        Ok(())
    })
}

fn decode_interface(
    node: Node<'_>,
    iface: Interface,
    config: &mut InterfaceConfig,
) -> Result<(), ConfigError> {
    node.scan(|key, entry| {
        let value = expect_scalar(entry)?;
        match (key, iface) {
            ("ip", _) => {
                config.ip.ip = parse_ipv4(&value.as_str())
                    .ok_or(ConfigError::invalid("ip", "expected IPv4 address"))?;
            }
            ("gateway" | "gw", _) => {
                config.ip.gateway = parse_ipv4(&value.as_str())
                    .ok_or(ConfigError::invalid("gateway", "expected IPv4 address"))?;
            }
            ("mask" | "netmask", _) => {
                config.ip.netmask = parse_netmask(&value.as_str()).ok_or(ConfigError::invalid(
                    "mask",
                    "expected dotted netmask or prefix length 0-30",
                ))?;
            }
            ("ssid", _) => {
                let ssid = value.as_str();
                if ssid.len() > MAX_SSID_LEN {
                    return Err(ConfigError::invalid("ssid", "longer than 32 bytes"));
                }
                config.ssid = ssid.into_owned();
            }
            ("psk" | "password", _) => config.password = decode_password(value)?,
            ("channel", Interface::Ap) => {
                let (lo, hi) = (*AP_CHANNELS.start(), *AP_CHANNELS.end());
                config.channel = value.as_i64().clamp(i64::from(lo), i64::from(hi)) as u8;
            }
            ("hidden", Interface::Ap) => config.hidden = value.as_bool(),
            ("static", Interface::Sta) => config.static_ip = value.as_bool(),
            _ => debug!(target: TAG, "Unknown field '{}' for {}, ignoring.", key, iface.prefix()),
        }
        Ok(())
    })
}

/// Anything but a non-empty string means an open network.
fn decode_password(value: Scalar<'_>) -> Result<String, ConfigError> {
    if !value.is_string() {
        return Ok(String::new());
    }
    let password = value.as_str();
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ConfigError::invalid("password", "longer than 64 bytes"));
    }
    Ok(password.into_owned())
}

/// Writes the `network` report object.
///
/// Passwords are never reported; each interface carries its derived
/// authentication mode instead.
pub fn write_report<W: Write>(w: &mut W, settings: &NetworkSettings) -> fmt::Result {
    write!(
        w,
        "{{\"mode\":{},\"fallback\":{},\"sta\":",
        JsonStr(settings.mode.name()),
        settings.fallback.as_millis()
    )?;
    write_interface(w, Interface::Sta, &settings.sta)?;
    w.write_str(",\"ap\":")?;
    write_interface(w, Interface::Ap, &settings.ap)?;
    w.write_char('}')
}

fn write_interface<W: Write>(w: &mut W, iface: Interface, config: &InterfaceConfig) -> fmt::Result {
    write!(
        w,
        "{{\"ssid\":{},\"auth\":{},\"ip\":\"{}\",\"mask\":",
        JsonStr(&config.ssid),
        JsonStr(config.auth_mode().name()),
        config.ip.ip,
    )?;
    // Masks without a prefix form are reported dotted so they decode back.
    match mask_to_prefix(config.ip.netmask) {
        Some(prefix) => write!(w, "{}", prefix)?,
        None => write!(w, "\"{}\"", config.ip.netmask)?,
    }
    write!(w, ",\"gateway\":\"{}\"", config.ip.gateway)?;
    match iface {
        Interface::Sta => write!(w, ",\"static\":{}}}", u8::from(config.static_ip)),
        Interface::Ap => write!(
            w,
            ",\"channel\":{},\"hidden\":{}}}",
            config.channel,
            u8::from(config.hidden)
        ),
    }
}
