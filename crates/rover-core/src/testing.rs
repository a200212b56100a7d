//! Recording test doubles for the driver traits.
//!
//! Each double keeps its state behind a shared handle so a test can keep a
//! clone after moving the double into the code under test.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::camera::{CameraError, CameraSensor, FrameSize, PixFormat, SensorSetting, SensorStatus};
use crate::control::{Hardware, Light, Motor};
use crate::network::{
    Interface, InterfaceConfig, IpInfo, OperatingMode, Radio, RadioError, RetryTimer, StationInfo,
};
use crate::storage::{KvStorage, MemoryStorage, StorageError, StoredValue};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Radio
// ============================================================================

#[derive(Debug)]
pub struct MockRadioState {
    pub mode: OperatingMode,
    pub ap: InterfaceConfig,
    pub sta: InterfaceConfig,
    pub dhcp_server: bool,
    pub dhcp_client: bool,
    pub started: bool,
    pub stations: usize,
    pub fail_station_list: bool,
    pub fail_start: bool,
    pub connect_calls: usize,
    pub set_mode_calls: Vec<OperatingMode>,
    pub ops: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockRadio(Arc<Mutex<MockRadioState>>);

impl MockRadio {
    pub fn with_mode(mode: OperatingMode) -> Self {
        let blank = InterfaceConfig::new(IpInfo::new(
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::UNSPECIFIED,
        ));
        Self(Arc::new(Mutex::new(MockRadioState {
            mode,
            ap: blank.clone(),
            sta: blank,
            dhcp_server: false,
            dhcp_client: false,
            started: false,
            stations: 0,
            fail_station_list: false,
            fail_start: false,
            connect_calls: 0,
            set_mode_calls: Vec::new(),
            ops: Vec::new(),
        })))
    }

    pub fn state(&self) -> MutexGuard<'_, MockRadioState> {
        lock(&self.0)
    }
}

impl Radio for MockRadio {
    fn mode(&self) -> Result<OperatingMode, RadioError> {
        Ok(self.state().mode)
    }

    fn set_mode(&mut self, mode: OperatingMode) -> Result<(), RadioError> {
        let mut s = self.state();
        s.mode = mode;
        s.set_mode_calls.push(mode);
        s.ops.push(format!("mode {mode}"));
        Ok(())
    }

    fn interface_config(&self, iface: Interface) -> Result<InterfaceConfig, RadioError> {
        let s = self.state();
        Ok(match iface {
            Interface::Ap => s.ap.clone(),
            Interface::Sta => s.sta.clone(),
        })
    }

    fn set_interface_config(
        &mut self,
        iface: Interface,
        config: &InterfaceConfig,
    ) -> Result<(), RadioError> {
        let mut s = self.state();
        let active = match iface {
            Interface::Ap => s.mode.has_ap(),
            Interface::Sta => s.mode.has_sta(),
        };
        if !active {
            return Err(RadioError::InterfaceInactive(iface));
        }
        s.ops.push(format!("config {}", iface.prefix()));
        match iface {
            Interface::Ap => s.ap = config.clone(),
            Interface::Sta => s.sta = config.clone(),
        }
        Ok(())
    }

    fn set_dhcp(&mut self, iface: Interface, enabled: bool) -> Result<(), RadioError> {
        let mut s = self.state();
        s.ops.push(format!("dhcp {} {}", iface.prefix(), if enabled { "on" } else { "off" }));
        match iface {
            Interface::Ap => s.dhcp_server = enabled,
            Interface::Sta => s.dhcp_client = enabled,
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), RadioError> {
        let mut s = self.state();
        if s.fail_start {
            return Err(RadioError::Driver("start refused".into()));
        }
        s.started = true;
        s.ops.push("start".into());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        let mut s = self.state();
        if !s.started {
            return Err(RadioError::NotStarted);
        }
        s.started = false;
        s.ops.push("stop".into());
        Ok(())
    }

    fn connect(&mut self) -> Result<(), RadioError> {
        self.state().connect_calls += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), RadioError> {
        let mut s = self.state();
        if !s.started {
            return Err(RadioError::NotStarted);
        }
        s.ops.push("disconnect".into());
        Ok(())
    }

    fn connected_stations(&self) -> Result<Vec<StationInfo>, RadioError> {
        let s = self.state();
        if s.fail_station_list {
            return Err(RadioError::Driver("station list unavailable".into()));
        }
        Ok((0..s.stations)
            .map(|i| StationInfo {
                mac: [0x02, 0, 0, 0, 0, i as u8],
                rssi: -50,
            })
            .collect())
    }

    fn station_rssi(&self) -> Option<i8> {
        None
    }
}

// ============================================================================
// Retry timer
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MockTimer(Arc<Mutex<Option<Duration>>>);

impl MockTimer {
    pub fn pending(&self) -> Option<Duration> {
        *lock(&self.0)
    }

    /// Returns the pending delay and disarms the timer, as if it fired.
    pub fn take(&self) -> Option<Duration> {
        lock(&self.0).take()
    }
}

impl RetryTimer for MockTimer {
    fn schedule(&mut self, delay: Duration) {
        *lock(&self.0) = Some(delay);
    }

    fn cancel(&mut self) {
        *lock(&self.0) = None;
    }
}

// ============================================================================
// Hardware
// ============================================================================

#[derive(Debug, Default)]
pub struct MockHardwareState {
    pub main_light: bool,
    pub other_light: bool,
    pub left: f32,
    pub right: f32,
    pub writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockHardware(Arc<Mutex<MockHardwareState>>);

impl MockHardware {
    pub fn state(&self) -> MutexGuard<'_, MockHardwareState> {
        lock(&self.0)
    }
}

impl Hardware for MockHardware {
    fn set_light(&mut self, light: Light, on: bool) {
        let mut s = self.state();
        s.writes += 1;
        match light {
            Light::Main => s.main_light = on,
            Light::Other => s.other_light = on,
        }
    }

    fn light(&self, light: Light) -> bool {
        let s = self.state();
        match light {
            Light::Main => s.main_light,
            Light::Other => s.other_light,
        }
    }

    fn set_motor(&mut self, motor: Motor, duty: f32) {
        let mut s = self.state();
        s.writes += 1;
        match motor {
            Motor::Left => s.left = duty,
            Motor::Right => s.right = duty,
        }
    }

    fn motor(&self, motor: Motor) -> f32 {
        let s = self.state();
        match motor {
            Motor::Left => s.left,
            Motor::Right => s.right,
        }
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug)]
pub struct MockCameraState {
    pub status: Option<SensorStatus>,
    pub saves: usize,
    pub reinits: Vec<(PixFormat, FrameSize)>,
    pub fail_reinit: bool,
}

#[derive(Debug, Clone)]
pub struct MockCamera(Arc<Mutex<MockCameraState>>);

impl Default for MockCamera {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(MockCameraState {
            status: Some(SensorStatus::default()),
            saves: 0,
            reinits: Vec::new(),
            fail_reinit: false,
        })))
    }
}

impl MockCamera {
    pub fn unavailable() -> Self {
        let camera = Self::default();
        camera.state().status = None;
        camera
    }

    pub fn state(&self) -> MutexGuard<'_, MockCameraState> {
        lock(&self.0)
    }
}

impl CameraSensor for MockCamera {
    fn status(&self) -> Result<SensorStatus, CameraError> {
        self.state().status.clone().ok_or(CameraError::Unavailable)
    }

    fn set(&mut self, setting: SensorSetting) -> Result<(), CameraError> {
        let mut s = self.state();
        let status = s.status.as_mut().ok_or(CameraError::Unavailable)?;
        status.apply(setting);
        Ok(())
    }

    fn save_settings(&mut self) -> Result<(), CameraError> {
        self.state().saves += 1;
        Ok(())
    }

    fn reinitialize(&mut self, pixformat: PixFormat, framesize: FrameSize) -> Result<(), CameraError> {
        let mut s = self.state();
        if s.fail_reinit {
            return Err(CameraError::Reinit("sensor did not respond".into()));
        }
        s.reinits.push((pixformat, framesize));
        Ok(())
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Memory storage that can be told to fail commits, shared like the others.
#[derive(Debug, Clone, Default)]
pub struct SharedStorage(Arc<Mutex<(MemoryStorage, bool)>>);

impl SharedStorage {
    pub fn fail_commits(&self, fail: bool) {
        lock(&self.0).1 = fail;
    }

    pub fn snapshot(&self) -> MemoryStorage {
        lock(&self.0).0.clone()
    }
}

impl KvStorage for SharedStorage {
    fn get(&self, key: &str) -> Result<StoredValue, StorageError> {
        lock(&self.0).0.get(key)
    }

    fn set(&mut self, key: &str, value: StoredValue) -> Result<(), StorageError> {
        lock(&self.0).0.set(key, value)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let mut inner = lock(&self.0);
        if inner.1 {
            return Err(StorageError::Backend("flash write failed".into()));
        }
        inner.0.commit()
    }
}
