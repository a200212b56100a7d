//! Persisted network state.
//!
//! Every network setting is stored under a fixed key. Writes are staged
//! with the individual `save_*` calls and made durable by one `commit`.

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

use super::types::{Interface, InterfaceConfig, IpInfo, NetworkSettings, OperatingMode};
use crate::storage::{KvStorage, StorageError};

const KEY_MODE: &str = "wifi_mode";
const KEY_FALLBACK: &str = "fallback";
const KEY_STA_STATIC: &str = "sta.static";

struct InterfaceKeys {
    ip: &'static str,
    gateway: &'static str,
    netmask: &'static str,
    ssid: &'static str,
    password: &'static str,
    channel: &'static str,
    hidden: &'static str,
}

const AP_KEYS: InterfaceKeys = InterfaceKeys {
    ip: "ap.ip",
    gateway: "ap.gw",
    netmask: "ap.mask",
    ssid: "ap.ssid",
    password: "ap.psk",
    channel: "ap.chan",
    hidden: "ap.hidden",
};

const STA_KEYS: InterfaceKeys = InterfaceKeys {
    ip: "sta.ip",
    gateway: "sta.gw",
    netmask: "sta.mask",
    ssid: "sta.ssid",
    password: "sta.psk",
    channel: "sta.chan",
    hidden: "sta.hidden",
};

fn keys(iface: Interface) -> &'static InterfaceKeys {
    match iface {
        Interface::Ap => &AP_KEYS,
        Interface::Sta => &STA_KEYS,
    }
}

/// Addresses are kept as the in-memory form of a network-order address on
/// a little-endian target.
fn addr_to_raw(addr: Ipv4Addr) -> u32 {
    u32::from_le_bytes(addr.octets())
}

fn raw_to_addr(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw.to_le_bytes())
}

/// Treats a missing entry as `default`, propagating any other error.
fn or_default<T>(result: Result<T, StorageError>, default: T) -> Result<T, StorageError> {
    match result {
        Err(StorageError::NotFound(_)) => Ok(default),
        other => other,
    }
}

/// Typed access to the network entries of a key-value store.
pub struct NetworkStore {
    storage: Box<dyn KvStorage>,
}

impl NetworkStore {
    pub fn new(storage: Box<dyn KvStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &dyn KvStorage {
        self.storage.as_ref()
    }

    // ========================================================================
    // IP info
    // ========================================================================

    pub fn load_ip_info(&self, iface: Interface) -> Result<IpInfo, StorageError> {
        let keys = keys(iface);
        Ok(IpInfo {
            ip: raw_to_addr(self.storage.get_u32(keys.ip)?),
            netmask: raw_to_addr(self.storage.get_u32(keys.netmask)?),
            gateway: raw_to_addr(self.storage.get_u32(keys.gateway)?),
        })
    }

    pub fn save_ip_info(&mut self, iface: Interface, info: &IpInfo) -> Result<(), StorageError> {
        let keys = keys(iface);
        self.storage.set_u32(keys.ip, addr_to_raw(info.ip))?;
        self.storage.set_u32(keys.netmask, addr_to_raw(info.netmask))?;
        self.storage.set_u32(keys.gateway, addr_to_raw(info.gateway))?;
        Ok(())
    }

    // ========================================================================
    // Interfaces
    // ========================================================================

    /// Loads an interface. Fails with `NotFound` unless its IP info exists;
    /// the remaining fields fall back to defaults.
    pub fn load(&self, iface: Interface) -> Result<InterfaceConfig, StorageError> {
        let keys = keys(iface);
        let mut config = InterfaceConfig::new(self.load_ip_info(iface)?);
        config.ssid = or_default(self.storage.get_str(keys.ssid), String::new())?;
        config.password = or_default(self.storage.get_str(keys.password), String::new())?;
        match iface {
            Interface::Ap => {
                config.channel = or_default(self.storage.get_u8(keys.channel), 1)?;
                config.hidden = or_default(self.storage.get_u8(keys.hidden), 0)? != 0;
            }
            Interface::Sta => {
                config.static_ip = self.load_static()?;
            }
        }
        Ok(config)
    }

    pub fn save(&mut self, iface: Interface, config: &InterfaceConfig) -> Result<(), StorageError> {
        let keys = keys(iface);
        self.save_ip_info(iface, &config.ip)?;
        self.storage.set_str(keys.ssid, &config.ssid)?;
        self.storage.set_str(keys.password, &config.password)?;
        match iface {
            Interface::Ap => {
                self.storage.set_u8(keys.channel, config.channel)?;
                self.storage.set_u8(keys.hidden, u8::from(config.hidden))?;
            }
            Interface::Sta => {
                self.storage.set_u8(KEY_STA_STATIC, u8::from(config.static_ip))?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Mode, fallback and flags
    // ========================================================================

    pub fn load_mode(&self) -> Result<OperatingMode, StorageError> {
        let raw = self.storage.get_u32(KEY_MODE)?;
        OperatingMode::from_raw(raw).ok_or_else(|| StorageError::TypeMismatch(KEY_MODE.to_string()))
    }

    pub fn save_mode(&mut self, mode: OperatingMode) -> Result<(), StorageError> {
        self.storage.set_u32(KEY_MODE, mode.as_raw())
    }

    /// Fallback timeout, persisted in milliseconds.
    pub fn load_fallback(&self) -> Result<Duration, StorageError> {
        self.storage.get_u64(KEY_FALLBACK).map(Duration::from_millis)
    }

    pub fn save_fallback(&mut self, timeout: Duration) -> Result<(), StorageError> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.storage.set_u64(KEY_FALLBACK, millis)
    }

    /// Missing flag reads as false.
    pub fn load_static(&self) -> Result<bool, StorageError> {
        Ok(or_default(self.storage.get_u8(KEY_STA_STATIC), 0)? != 0)
    }

    pub fn save_static(&mut self, static_ip: bool) -> Result<(), StorageError> {
        self.storage.set_u8(KEY_STA_STATIC, u8::from(static_ip))
    }

    /// Stages every field of `settings`; call [`NetworkStore::commit`] after.
    pub fn save_settings(&mut self, settings: &NetworkSettings) -> Result<(), StorageError> {
        self.save(Interface::Ap, &settings.ap)?;
        self.save(Interface::Sta, &settings.sta)?;
        self.save_mode(settings.mode)?;
        self.save_fallback(settings.fallback)?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), StorageError> {
        debug!(target: "init-network", "committing network settings");
        self.storage.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn store() -> NetworkStore {
        NetworkStore::new(Box::new(MemoryStorage::new()))
    }

    fn sample_ip() -> IpInfo {
        IpInfo::new(
            Ipv4Addr::new(192, 168, 1, 50),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(192, 168, 1, 1),
        )
    }

    #[test]
    fn test_load_missing_interface() {
        let store = store();
        assert!(store.load(Interface::Sta).unwrap_err().is_not_found());
        assert!(store.load_mode().unwrap_err().is_not_found());
        assert!(store.load_fallback().unwrap_err().is_not_found());
        assert!(!store.load_static().unwrap());
    }

    #[test]
    fn test_interface_roundtrip() {
        let mut store = store();
        let mut sta = InterfaceConfig::new(sample_ip());
        sta.ssid = "Home".into();
        sta.password = "secret123".into();
        sta.static_ip = true;
        store.save(Interface::Sta, &sta).unwrap();

        let mut ap = InterfaceConfig::new(sample_ip());
        ap.ssid = "Rover".into();
        ap.channel = 6;
        ap.hidden = true;
        store.save(Interface::Ap, &ap).unwrap();

        assert_eq!(store.load(Interface::Sta).unwrap(), sta);
        assert_eq!(store.load(Interface::Ap).unwrap(), ap);
    }

    #[test]
    fn test_address_encoding() {
        let mut store = store();
        store.save_ip_info(Interface::Ap, &sample_ip()).unwrap();
        // 192.168.1.50 in network order, read as a little-endian word.
        assert_eq!(store.storage().get_u32("ap.ip").unwrap(), 0x3201_A8C0);
        assert_eq!(store.storage().get_u32("ap.mask").unwrap(), 0x00FF_FFFF);
    }

    #[test]
    fn test_mode_and_fallback() {
        let mut store = store();
        store.save_mode(OperatingMode::ApSta).unwrap();
        store.save_fallback(Duration::from_secs(10)).unwrap();
        assert_eq!(store.load_mode().unwrap(), OperatingMode::ApSta);
        assert_eq!(store.load_fallback().unwrap(), Duration::from_millis(10_000));
        assert_eq!(store.storage().get_u64("fallback").unwrap(), 10_000);
        assert_eq!(store.storage().get_u32("wifi_mode").unwrap(), 3);
    }

    #[test]
    fn test_invalid_persisted_mode() {
        let mut storage = MemoryStorage::new();
        storage.set_u32("wifi_mode", 9).unwrap();
        let store = NetworkStore::new(Box::new(storage));
        assert!(matches!(store.load_mode(), Err(StorageError::TypeMismatch(_))));
    }
}
