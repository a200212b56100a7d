//! Owner of the radio, the persisted network settings and the fallback
//! machine.

use std::fmt::Write;
use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::codec;
use super::fallback::{FallbackContext, FallbackMachine, RetryTimer};
use super::radio::{Radio, RadioError, RadioEvent};
use super::store::NetworkStore;
use super::types::{Interface, InterfaceConfig, IpInfo, NetworkSettings, OperatingMode, StationInfo};
use crate::control::ControlActivity;
use crate::error::ConfigError;
use crate::json::Node;
use crate::storage::KvStorage;

const TAG: &str = "init-network";

/// Fallback timeout used when none is persisted.
pub const DEFAULT_FALLBACK: Duration = Duration::from_secs(10);

pub const FACTORY_AP_SSID: &str = "RoverSetup";
pub const FACTORY_AP_PSK: &str = "rover1234";
pub const FACTORY_AP_CHANNEL: u8 = 1;

const DEFAULT_AP_IP: IpInfo = IpInfo::new(
    Ipv4Addr::new(192, 168, 4, 1),
    Ipv4Addr::new(255, 255, 255, 0),
    Ipv4Addr::new(192, 168, 4, 1),
);

const DEFAULT_STA_IP: IpInfo = IpInfo::new(
    Ipv4Addr::UNSPECIFIED,
    Ipv4Addr::new(255, 255, 255, 0),
    Ipv4Addr::UNSPECIFIED,
);

fn default_ip(iface: Interface) -> IpInfo {
    match iface {
        Interface::Ap => DEFAULT_AP_IP,
        Interface::Sta => DEFAULT_STA_IP,
    }
}

/// Factory access point settings, used until a mode has been persisted.
pub fn factory_settings() -> NetworkSettings {
    let mut ap = InterfaceConfig::new(DEFAULT_AP_IP);
    ap.ssid = FACTORY_AP_SSID.to_string();
    ap.password = FACTORY_AP_PSK.to_string();
    ap.channel = FACTORY_AP_CHANNEL;
    NetworkSettings {
        mode: OperatingMode::Ap,
        fallback: DEFAULT_FALLBACK,
        ap,
        sta: InterfaceConfig::new(DEFAULT_STA_IP),
    }
}

pub struct NetworkManager {
    radio: Box<dyn Radio>,
    store: NetworkStore,
    timer: Box<dyn RetryTimer>,
    machine: FallbackMachine,
    /// Last applied settings. Drafts for new applies start from here.
    configured: NetworkSettings,
}

impl NetworkManager {
    pub fn new(
        radio: Box<dyn Radio>,
        storage: Box<dyn KvStorage>,
        timer: Box<dyn RetryTimer>,
    ) -> Self {
        let configured = factory_settings();
        Self {
            radio,
            store: NetworkStore::new(storage),
            timer,
            machine: FallbackMachine::new(configured.fallback),
            configured,
        }
    }

    // ========================================================================
    // Boot
    // ========================================================================

    /// Loads the persisted settings and brings the radio up with them.
    ///
    /// Missing IP info is seeded with interface defaults and persisted right
    /// away. Without a persisted mode the factory access point is used.
    pub fn init(&mut self) -> Result<(), ConfigError> {
        let mut seeded = false;
        for iface in [Interface::Ap, Interface::Sta] {
            match self.store.load_ip_info(iface) {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    debug!(target: TAG, "seeding {} ip info", iface.prefix());
                    self.store.save_ip_info(iface, &default_ip(iface))?;
                    seeded = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
        if seeded {
            self.store.commit()?;
        }

        let fallback = match self.store.load_fallback() {
            Err(err) if err.is_not_found() => DEFAULT_FALLBACK,
            other => other?,
        };

        let settings = match self.store.load_mode() {
            Ok(mode) => NetworkSettings {
                mode,
                fallback,
                ap: self.store.load(Interface::Ap)?,
                sta: self.store.load(Interface::Sta)?,
            },
            Err(err) if err.is_not_found() => {
                warn!(
                    target: TAG,
                    "no network mode stored, starting access point '{}' with password '{}'",
                    FACTORY_AP_SSID,
                    FACTORY_AP_PSK
                );
                let mut settings = factory_settings();
                settings.fallback = fallback;
                settings.ap.ip = self.store.load_ip_info(Interface::Ap)?;
                settings.sta = self.store.load(Interface::Sta)?;
                settings
            }
            Err(err) => return Err(err.into()),
        };

        info!(target: TAG, mode = %settings.mode, fallback = ?settings.fallback, "starting network");
        self.machine.set_timeout(settings.fallback);
        self.configured = settings;
        self.reconfigure()?;

        let mut dump = String::new();
        if self.write_report(&mut dump).is_ok() {
            debug!(target: TAG, "{}", dump);
        }
        Ok(())
    }

    // ========================================================================
    // Apply
    // ========================================================================

    /// Applies a `network` object: decode into a draft, persist it, then
    /// restart the radio with it.
    ///
    /// A decode error leaves both the radio and the store untouched.
    pub fn apply(&mut self, node: Node<'_>) -> Result<(), ConfigError> {
        let mut draft = self.configured.clone();
        codec::decode(node, &mut draft)?;

        self.store.save_settings(&draft)?;
        self.store.commit()?;

        self.machine.set_timeout(draft.fallback);
        self.configured = draft;
        self.reconfigure().map_err(|err| {
            error!(target: "config-network", "radio reconfiguration failed: {}", err);
            ConfigError::from(err)
        })
    }

    /// Restarts the radio with the configured settings.
    fn reconfigure(&mut self) -> Result<(), RadioError> {
        self.machine.reset(self.timer.as_mut());

        if let Err(err) = self.radio.disconnect() {
            debug!(target: TAG, "disconnect: {}", err);
        }
        if let Err(err) = self.radio.stop() {
            debug!(target: TAG, "stop: {}", err);
        }
        self.radio.set_dhcp(Interface::Ap, false)?;
        self.radio.set_dhcp(Interface::Sta, false)?;

        // Both interfaces must be active to write their configuration.
        let settings = &self.configured;
        self.radio.set_mode(OperatingMode::ApSta)?;
        self.radio.set_interface_config(Interface::Ap, &settings.ap)?;
        self.radio.set_interface_config(Interface::Sta, &settings.sta)?;
        self.radio.set_mode(settings.mode)?;

        if settings.mode.has_ap() {
            self.radio.set_dhcp(Interface::Ap, true)?;
        }
        if settings.mode.has_sta() && !settings.sta.static_ip {
            self.radio.set_dhcp(Interface::Sta, true)?;
        }
        self.radio.start()
    }

    // ========================================================================
    // Report
    // ========================================================================

    /// Settings as currently in effect on the radio.
    ///
    /// Differs from the configured settings while the fallback is engaged.
    pub fn live_settings(&self) -> Result<NetworkSettings, RadioError> {
        let mut sta = self.radio.interface_config(Interface::Sta)?;
        sta.static_ip = self.configured.sta.static_ip;
        Ok(NetworkSettings {
            mode: self.radio.mode()?,
            fallback: self.machine.timeout(),
            ap: self.radio.interface_config(Interface::Ap)?,
            sta,
        })
    }

    pub fn write_report<W: Write>(&self, w: &mut W) -> Result<(), ConfigError> {
        let settings = self.live_settings()?;
        codec::write_report(w, &settings)?;
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn handle_event(
        &mut self,
        event: &RadioEvent,
        now: Duration,
        activity: &ControlActivity,
    ) -> Result<(), RadioError> {
        match event {
            RadioEvent::ApStationConnected { mac } | RadioEvent::ApStationDisconnected { mac } => {
                let station = StationInfo { mac: *mac, rssi: 0 };
                debug!(target: "ap-fallback", mac = %station.mac_string(), ?event, "access point client");
            }
            _ => {}
        }
        let mut ctx = FallbackContext {
            now,
            radio: self.radio.as_mut(),
            timer: self.timer.as_mut(),
            activity,
        };
        self.machine.handle_event(event, &mut ctx)
    }

    pub fn on_retry_timer(
        &mut self,
        now: Duration,
        activity: &ControlActivity,
    ) -> Result<(), RadioError> {
        let mut ctx = FallbackContext {
            now,
            radio: self.radio.as_mut(),
            timer: self.timer.as_mut(),
            activity,
        };
        self.machine.on_retry_timer(&mut ctx)
    }

    pub fn machine(&self) -> &FallbackMachine {
        &self.machine
    }

    pub fn configured(&self) -> &NetworkSettings {
        &self.configured
    }

    pub fn connected_stations(&self) -> Result<Vec<StationInfo>, RadioError> {
        self.radio.connected_stations()
    }

    pub fn station_rssi(&self) -> Option<i8> {
        self.radio.station_rssi()
    }
}
