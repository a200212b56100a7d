//! Runtime-agnostic core of the rover firmware.
//!
//! Contains the config pipeline (JSON tokenizer, key scanner, per-domain
//! codecs and the root [`Device`] dispatcher), persisted network settings,
//! the station/access point fallback machine and the remote control safety
//! logic. Drivers are reached through the [`Radio`], [`KvStorage`],
//! [`CameraSensor`] and [`Hardware`] traits; nothing here is async.

pub mod camera;
pub mod config;
pub mod control;
pub mod error;
pub mod json;
pub mod network;
pub mod parse;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use camera::{CameraError, CameraSensor, FrameSize, PixFormat, SensorSetting, SensorStatus};
pub use config::{ApplyOutcome, Device, DeviceStatus, MIN_RESTART_DELAY};
pub use control::{ControlActivity, ControlPacket, Hardware, Light, Motor, PacketError, SafetyAction};
pub use error::ConfigError;
pub use json::{TokenizeError, DEFAULT_TOKEN_BUDGET};
pub use network::{
    Interface, InterfaceConfig, IpInfo, NetworkManager, OperatingMode, Radio, RadioError,
    RadioEvent, RetryTimer, StationInfo,
};
pub use storage::{KvStorage, MemoryStorage, StorageError, StoredValue};
