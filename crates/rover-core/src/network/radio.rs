//! Radio driver abstraction.

use thiserror::Error;

use super::types::{Interface, InterfaceConfig, OperatingMode, StationInfo};

/// Errors reported by a radio driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    /// The operation requires the radio to be started.
    #[error("radio not started")]
    NotStarted,

    /// The interface is not active in the current mode.
    #[error("interface {0:?} is not active")]
    InterfaceInactive(Interface),

    /// Any other driver failure.
    #[error("driver error: {0}")]
    Driver(String),
}

/// Asynchronous notifications from the radio driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The station interface started; a connection may be attempted.
    StaStarted,
    /// The station associated with its access point.
    StaConnected,
    /// The station lost its connection or failed to connect.
    StaDisconnected { reason: u8 },
    /// A client joined our access point.
    ApStationConnected { mac: [u8; 6] },
    /// A client left our access point.
    ApStationDisconnected { mac: [u8; 6] },
}

/// Operations the network manager needs from the radio driver.
///
/// Calls may block briefly (driver synchronisation) and are always issued
/// from the task that owns the network manager.
pub trait Radio: Send {
    fn mode(&self) -> Result<OperatingMode, RadioError>;

    fn set_mode(&mut self, mode: OperatingMode) -> Result<(), RadioError>;

    /// Current configuration of an interface, including its IP info.
    fn interface_config(&self, iface: Interface) -> Result<InterfaceConfig, RadioError>;

    /// Writes credentials, AP parameters and IP info of an interface.
    ///
    /// Only interfaces active in the current mode can be written.
    fn set_interface_config(
        &mut self,
        iface: Interface,
        config: &InterfaceConfig,
    ) -> Result<(), RadioError>;

    /// DHCP server on the access point, DHCP client on the station.
    fn set_dhcp(&mut self, iface: Interface, enabled: bool) -> Result<(), RadioError>;

    fn start(&mut self) -> Result<(), RadioError>;

    fn stop(&mut self) -> Result<(), RadioError>;

    /// Starts a station connection attempt. The outcome arrives as an event.
    fn connect(&mut self) -> Result<(), RadioError>;

    fn disconnect(&mut self) -> Result<(), RadioError>;

    /// Clients currently associated with the access point.
    fn connected_stations(&self) -> Result<Vec<StationInfo>, RadioError>;

    /// Signal strength of the upstream access point, if connected.
    fn station_rssi(&self) -> Option<i8>;
}
