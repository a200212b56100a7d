//! Root of the configuration pipeline.
//!
//! [`Device`] owns every collaborator the config pipeline touches and is
//! the single entry point for config applies, reports, control input and
//! radio events. It is not thread-safe; runtimes give it a single owner.

use std::fmt::Write;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::camera::{self, CameraError, CameraSensor};
use crate::control::{
    self, ControlActivity, ControlPacket, Hardware, PacketError, SafetyAction,
};
use crate::error::ConfigError;
use crate::json::{expect_object, expect_scalar, Document, ReportWriter, Scalar, DEFAULT_TOKEN_BUDGET};
use crate::network::{NetworkManager, RadioError, RadioEvent, StationInfo};

/// Shortest delay before a requested restart.
pub const MIN_RESTART_DELAY: Duration = Duration::from_millis(100);

/// Side effects of an apply that the runtime has to carry out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Restart the device after this delay.
    pub restart_after: Option<Duration>,
}

/// Snapshot served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub uptime: Duration,
    /// Signal strength of the upstream access point.
    pub rssi: Option<i8>,
    /// Clients of our access point, when requested.
    pub stations: Option<Vec<StationInfo>>,
}

/// `true` restarts after the minimum delay, a number after that many
/// milliseconds (at least the minimum), `false` or `0` not at all.
fn restart_delay(value: Scalar<'_>) -> Option<Duration> {
    let raw = value.raw();
    if raw.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        let millis = u64::try_from(value.as_i64()).ok().filter(|&ms| ms > 0)?;
        Some(Duration::from_millis(millis).max(MIN_RESTART_DELAY))
    } else if value.as_bool() {
        Some(MIN_RESTART_DELAY)
    } else {
        None
    }
}

pub struct Device {
    network: NetworkManager,
    camera: Box<dyn CameraSensor>,
    hardware: Box<dyn Hardware>,
    activity: ControlActivity,
    token_budget: usize,
}

impl Device {
    pub fn new(
        network: NetworkManager,
        camera: Box<dyn CameraSensor>,
        hardware: Box<dyn Hardware>,
    ) -> Self {
        Self {
            network,
            camera,
            hardware,
            activity: ControlActivity::default(),
            token_budget: DEFAULT_TOKEN_BUDGET,
        }
    }

    pub fn with_activity(mut self, activity: ControlActivity) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    /// Boot initialization: brings the network up from persisted state and
    /// starts with no control session.
    pub fn init(&mut self) -> Result<(), ConfigError> {
        self.activity.clear();
        self.network.init()
    }

    // ========================================================================
    // Config
    // ========================================================================

    /// Applies a config document.
    ///
    /// Domains are applied in document order. A failing domain aborts the
    /// rest of the document; domains applied before it stay applied.
    pub fn apply(&mut self, text: &str, now: Duration) -> Result<ApplyOutcome, ConfigError> {
        let doc = Document::parse(text, self.token_budget)?;
        trace!(target: "httpd", tokens = doc.token_count(), "config document");

        let mut outcome = ApplyOutcome::default();
        doc.root().scan(|key, entry| {
            match key {
                "network" => self.network.apply(expect_object(entry)?)?,
                "camera" => {
                    camera::apply(expect_object(entry)?, self.camera.as_mut())?;
                }
                "control" => control::codec::decode(
                    expect_object(entry)?,
                    now,
                    &mut self.activity,
                    self.hardware.as_mut(),
                )?,
                "restart" => {
                    outcome.restart_after = restart_delay(expect_scalar(entry)?);
                    if let Some(delay) = outcome.restart_after {
                        info!(target: "httpd", ?delay, "restart requested");
                    }
                }
                _ => debug!(target: "httpd", "Unknown field '{}', ignoring.", key),
            }
            Ok(())
        })?;
        Ok(outcome)
    }

    /// Writes the full report into `buf`, returning its length.
    ///
    /// Fails with [`ConfigError::BufferExhausted`] rather than producing a
    /// truncated document.
    pub fn report(&self, buf: &mut [u8], now: Duration) -> Result<usize, ConfigError> {
        let mut writer = ReportWriter::new(buf);
        self.write_report(&mut writer, now)?;
        Ok(writer.len())
    }

    /// [`Device::report`] into an owned string of at most `capacity` bytes.
    pub fn report_string(&self, capacity: usize, now: Duration) -> Result<String, ConfigError> {
        let mut buf = vec![0u8; capacity];
        let mut writer = ReportWriter::new(&mut buf);
        self.write_report(&mut writer, now)?;
        Ok(writer.as_str().to_owned())
    }

    fn write_report<W: Write>(&self, w: &mut W, now: Duration) -> Result<(), ConfigError> {
        let camera = match self.camera.status() {
            Ok(status) => Some(status),
            Err(CameraError::Unavailable) => None,
            Err(err) => return Err(err.into()),
        };

        w.write_str("{\"network\":")?;
        self.network.write_report(w)?;
        w.write_str(",\"camera\":")?;
        camera::codec::write_report(w, camera.as_ref())?;
        w.write_str(",\"control\":")?;
        control::codec::write_report(w, self.hardware.as_ref())?;
        write!(w, ",\"uptime\":{}}}", now.as_micros())?;
        Ok(())
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Periodic safety check of the motor and light outputs.
    pub fn tick(&mut self, now: Duration) -> SafetyAction {
        self.activity.tick(now, self.hardware.as_mut())
    }

    /// Decodes and applies a UDP control packet.
    pub fn handle_packet(&mut self, bytes: &[u8], now: Duration) -> Result<ControlPacket, PacketError> {
        let packet = ControlPacket::decode(bytes)?;
        packet.apply(now, self.hardware.as_mut(), &mut self.activity);
        Ok(packet)
    }

    pub fn activity(&self) -> &ControlActivity {
        &self.activity
    }

    // ========================================================================
    // Network
    // ========================================================================

    pub fn handle_radio_event(&mut self, event: &RadioEvent, now: Duration) -> Result<(), RadioError> {
        self.network.handle_event(event, now, &self.activity)
    }

    pub fn on_retry_timer(&mut self, now: Duration) -> Result<(), RadioError> {
        self.network.on_retry_timer(now, &self.activity)
    }

    pub fn network(&self) -> &NetworkManager {
        &self.network
    }

    pub fn status(&self, now: Duration, details: bool) -> DeviceStatus {
        let stations = details.then(|| {
            self.network.connected_stations().unwrap_or_else(|err| {
                warn!(target: "httpd", "station list unavailable: {}", err);
                Vec::new()
            })
        });
        DeviceStatus {
            uptime: now,
            rssi: self.network.station_rssi(),
            stations,
        }
    }
}
