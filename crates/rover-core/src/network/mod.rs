//! Wireless connectivity: settings, persistence, the `network` config
//! object and the station/access point fallback.

pub mod codec;
pub mod fallback;
pub mod manager;
pub mod radio;
pub mod store;
pub mod types;

pub use fallback::{FallbackMachine, LinkState, RetryTimer};
pub use manager::{factory_settings, NetworkManager, DEFAULT_FALLBACK};
pub use radio::{Radio, RadioError, RadioEvent};
pub use store::NetworkStore;
pub use types::{
    AuthMode, Interface, InterfaceConfig, IpInfo, NetworkSettings, OperatingMode, StationInfo,
    MAX_PASSWORD_LEN, MAX_SSID_LEN,
};
