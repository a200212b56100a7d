//! Network data model.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Maximum SSID length in bytes.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length in bytes.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Valid access point channels.
pub const AP_CHANNELS: std::ops::RangeInclusive<u8> = 1..=14;

/// Radio operating mode. Raw values match the persisted `wifi_mode` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Sta = 1,
    Ap = 2,
    ApSta = 3,
}

impl OperatingMode {
    /// Parses a mode name. `nat` is an alias of `apsta`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sta" => Some(OperatingMode::Sta),
            "ap" => Some(OperatingMode::Ap),
            "apsta" | "nat" => Some(OperatingMode::ApSta),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OperatingMode::Sta => "sta",
            OperatingMode::Ap => "ap",
            OperatingMode::ApSta => "apsta",
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(OperatingMode::Sta),
            2 => Some(OperatingMode::Ap),
            3 => Some(OperatingMode::ApSta),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Whether the access point interface is active.
    pub fn has_ap(self) -> bool {
        matches!(self, OperatingMode::Ap | OperatingMode::ApSta)
    }

    /// Whether the station interface is active.
    pub fn has_sta(self) -> bool {
        matches!(self, OperatingMode::Sta | OperatingMode::ApSta)
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the two radio interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Ap,
    Sta,
}

impl Interface {
    /// Prefix used for persisted keys and log lines.
    pub fn prefix(self) -> &'static str {
        match self {
            Interface::Ap => "ap",
            Interface::Sta => "sta",
        }
    }
}

/// IPv4 settings of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl IpInfo {
    pub const fn new(ip: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        Self {
            ip,
            netmask,
            gateway,
        }
    }
}

/// Authentication derived from whether a password is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wpa2Psk,
}

impl AuthMode {
    pub fn name(self) -> &'static str {
        match self {
            AuthMode::Open => "open",
            AuthMode::Wpa2Psk => "wpa2-psk",
        }
    }
}

/// Configuration of one interface.
///
/// `channel` and `hidden` only apply to the access point, `static_ip` only
/// to the station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub ip: IpInfo,
    pub ssid: String,
    pub password: String,
    pub channel: u8,
    pub hidden: bool,
    pub static_ip: bool,
}

impl InterfaceConfig {
    pub fn new(ip: IpInfo) -> Self {
        Self {
            ip,
            ssid: String::new(),
            password: String::new(),
            channel: 1,
            hidden: false,
            static_ip: false,
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.password.is_empty() {
            AuthMode::Open
        } else {
            AuthMode::Wpa2Psk
        }
    }
}

/// Complete network configuration as applied and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub mode: OperatingMode,
    /// Zero disables the fallback.
    pub fallback: Duration,
    pub ap: InterfaceConfig,
    pub sta: InterfaceConfig,
}

impl NetworkSettings {
    pub fn interface(&self, iface: Interface) -> &InterfaceConfig {
        match iface {
            Interface::Ap => &self.ap,
            Interface::Sta => &self.sta,
        }
    }

    pub fn interface_mut(&mut self, iface: Interface) -> &mut InterfaceConfig {
        match iface {
            Interface::Ap => &mut self.ap,
            Interface::Sta => &mut self.sta,
        }
    }
}

/// A client associated with the access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationInfo {
    pub mac: [u8; 6],
    pub rssi: i8,
}

impl StationInfo {
    pub fn mac_string(&self) -> String {
        let m = self.mac;
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}
