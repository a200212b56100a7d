//! Simulated drivers for running the firmware logic on a host.
//!
//! The radio behaves like a station that can only reach one configurable
//! upstream network and reports its outcome through radio events, so the
//! fallback logic runs exactly as on the device.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use rover_core::camera::{CameraError, CameraSensor, FrameSize, PixFormat, SensorSetting, SensorStatus};
use rover_core::control::{Hardware, Light, Motor};
use rover_core::network::{
    Interface, InterfaceConfig, IpInfo, OperatingMode, Radio, RadioError, RadioEvent, StationInfo,
};

/// Disconnect reasons reported by the simulated radio.
pub const REASON_ASSOC_LEAVE: u8 = 8;
pub const REASON_NO_AP_FOUND: u8 = 201;

const UPSTREAM_RSSI: i8 = -55;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Radio
// ============================================================================

#[derive(Debug)]
struct RadioState {
    mode: OperatingMode,
    ap: InterfaceConfig,
    sta: InterfaceConfig,
    started: bool,
    connected: bool,
    upstream: Option<String>,
    stations: Vec<StationInfo>,
}

impl RadioState {
    fn active(&self, iface: Interface) -> bool {
        match iface {
            Interface::Ap => self.mode.has_ap(),
            Interface::Sta => self.mode.has_sta(),
        }
    }
}

/// Shared view of the simulated radio, for driving it from outside.
#[derive(Debug, Clone)]
pub struct SimRadioHandle {
    state: Arc<Mutex<RadioState>>,
    events: mpsc::UnboundedSender<RadioEvent>,
}

impl SimRadioHandle {
    /// Makes `ssid` reachable, or nothing when `None`. Drops a connection
    /// to a network that is no longer reachable.
    pub fn set_upstream(&self, ssid: Option<&str>) {
        let mut state = lock(&self.state);
        state.upstream = ssid.map(str::to_string);
        if state.connected && state.upstream.as_deref() != Some(state.sta.ssid.as_str()) {
            state.connected = false;
            info!(target: "ap-fallback", "simulated upstream lost");
            let _ = self.events.send(RadioEvent::StaDisconnected {
                reason: REASON_NO_AP_FOUND,
            });
        }
    }

    /// Associates a client with the access point.
    pub fn join_client(&self, mac: [u8; 6]) {
        lock(&self.state).stations.push(StationInfo { mac, rssi: -40 });
        let _ = self.events.send(RadioEvent::ApStationConnected { mac });
    }

    pub fn leave_client(&self, mac: [u8; 6]) {
        lock(&self.state).stations.retain(|s| s.mac != mac);
        let _ = self.events.send(RadioEvent::ApStationDisconnected { mac });
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    pub fn mode(&self) -> OperatingMode {
        lock(&self.state).mode
    }
}

pub struct SimRadio {
    state: Arc<Mutex<RadioState>>,
    events: mpsc::UnboundedSender<RadioEvent>,
}

impl SimRadio {
    /// A stopped radio in station mode and the receiver of its events.
    pub fn new() -> (Self, SimRadioHandle, mpsc::UnboundedReceiver<RadioEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let blank = InterfaceConfig::new(IpInfo::new(
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
        ));
        let state = Arc::new(Mutex::new(RadioState {
            mode: OperatingMode::Sta,
            ap: blank.clone(),
            sta: blank,
            started: false,
            connected: false,
            upstream: None,
            stations: Vec::new(),
        }));
        let handle = SimRadioHandle {
            state: state.clone(),
            events: events.clone(),
        };
        (Self { state, events }, handle, rx)
    }

    fn emit(&self, event: RadioEvent) {
        trace!(target: "ap-fallback", ?event, "simulated radio event");
        let _ = self.events.send(event);
    }
}

impl Radio for SimRadio {
    fn mode(&self) -> Result<OperatingMode, RadioError> {
        Ok(lock(&self.state).mode)
    }

    fn set_mode(&mut self, mode: OperatingMode) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        if !mode.has_ap() {
            state.stations.clear();
        }
        state.mode = mode;
        Ok(())
    }

    fn interface_config(&self, iface: Interface) -> Result<InterfaceConfig, RadioError> {
        let state = lock(&self.state);
        Ok(match iface {
            Interface::Ap => state.ap.clone(),
            Interface::Sta => state.sta.clone(),
        })
    }

    fn set_interface_config(
        &mut self,
        iface: Interface,
        config: &InterfaceConfig,
    ) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        if !state.active(iface) {
            return Err(RadioError::InterfaceInactive(iface));
        }
        match iface {
            Interface::Ap => state.ap = config.clone(),
            Interface::Sta => state.sta = config.clone(),
        }
        Ok(())
    }

    fn set_dhcp(&mut self, iface: Interface, enabled: bool) -> Result<(), RadioError> {
        debug!(target: "init-network", iface = iface.prefix(), enabled, "dhcp");
        Ok(())
    }

    fn start(&mut self) -> Result<(), RadioError> {
        let has_sta = {
            let mut state = lock(&self.state);
            state.started = true;
            state.mode.has_sta()
        };
        if has_sta {
            self.emit(RadioEvent::StaStarted);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        let mut state = lock(&self.state);
        if !state.started {
            return Err(RadioError::NotStarted);
        }
        state.started = false;
        state.connected = false;
        state.stations.clear();
        Ok(())
    }

    fn connect(&mut self) -> Result<(), RadioError> {
        let reachable = {
            let mut state = lock(&self.state);
            if !state.started {
                return Err(RadioError::NotStarted);
            }
            if !state.active(Interface::Sta) {
                return Err(RadioError::InterfaceInactive(Interface::Sta));
            }
            let reachable = !state.sta.ssid.is_empty()
                && state.upstream.as_deref() == Some(state.sta.ssid.as_str());
            state.connected = reachable;
            reachable
        };
        if reachable {
            self.emit(RadioEvent::StaConnected);
        } else {
            self.emit(RadioEvent::StaDisconnected {
                reason: REASON_NO_AP_FOUND,
            });
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), RadioError> {
        let was_connected = {
            let mut state = lock(&self.state);
            if !state.started {
                return Err(RadioError::NotStarted);
            }
            std::mem::replace(&mut state.connected, false)
        };
        if was_connected {
            self.emit(RadioEvent::StaDisconnected {
                reason: REASON_ASSOC_LEAVE,
            });
        }
        Ok(())
    }

    fn connected_stations(&self) -> Result<Vec<StationInfo>, RadioError> {
        Ok(lock(&self.state).stations.clone())
    }

    fn station_rssi(&self) -> Option<i8> {
        lock(&self.state).connected.then_some(UPSTREAM_RSSI)
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Default)]
struct CameraState {
    live: SensorStatus,
    saved: Option<SensorStatus>,
    reinits: usize,
}

/// Camera sensor that records parameters without capturing anything.
#[derive(Debug, Clone, Default)]
pub struct SimCamera(Arc<Mutex<CameraState>>);

impl SimCamera {
    pub fn reinit_count(&self) -> usize {
        lock(&self.0).reinits
    }

    pub fn saved(&self) -> Option<SensorStatus> {
        lock(&self.0).saved.clone()
    }
}

impl CameraSensor for SimCamera {
    fn status(&self) -> Result<SensorStatus, CameraError> {
        Ok(lock(&self.0).live.clone())
    }

    fn set(&mut self, setting: SensorSetting) -> Result<(), CameraError> {
        trace!(target: "config-camera", ?setting, "sensor write");
        lock(&self.0).live.apply(setting);
        Ok(())
    }

    fn save_settings(&mut self) -> Result<(), CameraError> {
        let mut state = lock(&self.0);
        state.saved = Some(state.live.clone());
        Ok(())
    }

    fn reinitialize(&mut self, pixformat: PixFormat, framesize: FrameSize) -> Result<(), CameraError> {
        let mut state = lock(&self.0);
        let mut restored = state.saved.clone().unwrap_or_default();
        restored.pixformat = pixformat;
        restored.framesize = framesize;
        state.live = restored;
        state.reinits += 1;
        info!(target: "config-camera", pixformat = pixformat.name(), ?framesize, "capture pipeline rebuilt");
        Ok(())
    }
}

// ============================================================================
// Hardware
// ============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Outputs {
    pub main_light: bool,
    pub other_light: bool,
    pub left: f32,
    pub right: f32,
}

/// Light and motor outputs kept in memory.
#[derive(Debug, Clone, Default)]
pub struct SimHardware(Arc<Mutex<Outputs>>);

impl SimHardware {
    pub fn outputs(&self) -> Outputs {
        *lock(&self.0)
    }
}

impl Hardware for SimHardware {
    fn set_light(&mut self, light: Light, on: bool) {
        let mut outputs = lock(&self.0);
        match light {
            Light::Main => outputs.main_light = on,
            Light::Other => outputs.other_light = on,
        }
    }

    fn light(&self, light: Light) -> bool {
        let outputs = lock(&self.0);
        match light {
            Light::Main => outputs.main_light,
            Light::Other => outputs.other_light,
        }
    }

    fn set_motor(&mut self, motor: Motor, duty: f32) {
        let mut outputs = lock(&self.0);
        match motor {
            Motor::Left => outputs.left = duty,
            Motor::Right => outputs.right = duty,
        }
    }

    fn motor(&self, motor: Motor) -> f32 {
        let outputs = lock(&self.0);
        match motor {
            Motor::Left => outputs.left,
            Motor::Right => outputs.right,
        }
    }
}
