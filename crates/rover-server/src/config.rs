//! Runtime settings of the host build.
//!
//! Everything has a default; environment variables override single fields.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rover_core::control::{DEFAULT_CONTROL_TIMEOUT, DEFAULT_LIGHT_TIMEOUT};
use rover_core::DEFAULT_TOKEN_BUDGET;

use crate::error::ControllerError;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Address of the HTTP config server.
    pub http_addr: SocketAddr,
    /// Address receiving UDP control packets.
    pub udp_addr: SocketAddr,
    /// File backing the persisted key-value entries.
    pub state_file: PathBuf,
    pub control_timeout: Duration,
    pub light_timeout: Duration,
    /// Period of the control safety check.
    pub tick_period: Duration,
    /// Maximum number of JSON tokens in a config document.
    pub token_budget: usize,
    /// Maximum size of a config report.
    pub report_capacity: usize,
    /// SSID the simulated radio can reach, if any.
    pub sim_upstream: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            udp_addr: SocketAddr::from(([0, 0, 0, 0], 8083)),
            state_file: PathBuf::from("rover-state.json"),
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            light_timeout: DEFAULT_LIGHT_TIMEOUT,
            tick_period: Duration::from_millis(100),
            token_budget: DEFAULT_TOKEN_BUDGET,
            report_capacity: 2048,
            sim_upstream: None,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `ROVER_*` environment variables.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`RuntimeConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = parsed::<SocketAddr, _>(&lookup, "ROVER_HTTP_ADDR")? {
            config.http_addr = addr;
        }
        if let Some(addr) = parsed::<SocketAddr, _>(&lookup, "ROVER_UDP_ADDR")? {
            config.udp_addr = addr;
        }
        if let Some(path) = lookup("ROVER_STATE_FILE") {
            config.state_file = PathBuf::from(path);
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "ROVER_CONTROL_TIMEOUT_MS")? {
            config.control_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "ROVER_LIGHT_TIMEOUT_MS")? {
            config.light_timeout = Duration::from_millis(ms);
        }
        config.sim_upstream = lookup("ROVER_SIM_UPSTREAM").filter(|ssid| !ssid.is_empty());
        Ok(config)
    }
}

fn parsed<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ControllerError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ControllerError::InvalidEnv { name, value }),
        },
    }
}
