//! Station reconnect and access point fallback.
//!
//! The machine reacts to radio events and to a single reusable retry timer.
//! While the station is disconnected it keeps scheduling reconnect attempts;
//! once the station has been down for the fallback timeout in pure station
//! mode it brings up the access point next to the station (AP+STA) so the
//! vehicle stays reachable. The fallback is transient: nothing is persisted
//! and it stays engaged until the next network reconfiguration or restart.
//!
//! Reconnect attempts never interrupt an active control session; they are
//! deferred until just after the session times out.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::radio::{Radio, RadioError, RadioEvent};
use super::types::{Interface, OperatingMode};
use crate::control::ControlActivity;

const TAG: &str = "ap-fallback";

/// Shortest delay ever used for a retry.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Retry delay when nobody depends on our access point.
pub const RECONNECT_DELAY_NO_STATIONS: Duration = Duration::from_secs(5);

/// Retry delay when clients are associated with our access point. A
/// connection attempt may retune the radio channel and drop them.
pub const RECONNECT_DELAY_WITH_STATIONS: Duration = Duration::from_secs(60);

/// Whether a reconnect attempt may disrupt an active control session.
const RECONNECT_WHILE_CONTROLLED: bool = false;

/// A single one-shot timer, re-armed by every scheduling decision.
pub trait RetryTimer: Send {
    /// Cancels any pending expiry and fires once after `delay`.
    fn schedule(&mut self, delay: Duration);

    /// Cancels any pending expiry.
    fn cancel(&mut self);
}

/// Station link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    /// Down since the given time (since boot).
    Disconnected { since: Duration },
}

/// Collaborators the machine drives, borrowed for a single call.
pub struct FallbackContext<'a> {
    /// Time since boot.
    pub now: Duration,
    pub radio: &'a mut dyn Radio,
    pub timer: &'a mut dyn RetryTimer,
    pub activity: &'a ControlActivity,
}

#[derive(Debug, Clone)]
pub struct FallbackMachine {
    state: LinkState,
    timeout: Duration,
    engaged: bool,
    next_retry_at: Option<Duration>,
}

impl FallbackMachine {
    /// A zero `timeout` disables the fallback.
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: LinkState::Connected,
            timeout,
            engaged: false,
            next_retry_at: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Whether the access point was brought up by the fallback.
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// When the pending retry fires, if one is scheduled.
    pub fn next_retry_at(&self) -> Option<Duration> {
        self.next_retry_at
    }

    /// Forgets all runtime state. Used before the radio is reconfigured.
    pub fn reset(&mut self, timer: &mut dyn RetryTimer) {
        timer.cancel();
        self.state = LinkState::Connected;
        self.engaged = false;
        self.next_retry_at = None;
    }

    pub fn handle_event(
        &mut self,
        event: &RadioEvent,
        ctx: &mut FallbackContext<'_>,
    ) -> Result<(), RadioError> {
        match event {
            RadioEvent::StaStarted => {
                // Not associated yet; the fallback period starts now.
                if self.state == LinkState::Connected {
                    self.state = LinkState::Disconnected { since: ctx.now };
                }
                self.connect_as_station(ctx)
            }
            RadioEvent::StaConnected => {
                info!(target: TAG, "station connected");
                self.state = LinkState::Connected;
                self.next_retry_at = None;
                ctx.timer.cancel();
                Ok(())
            }
            RadioEvent::StaDisconnected { reason } => {
                if self.state == LinkState::Connected {
                    info!(target: TAG, reason, "station disconnected");
                    self.state = LinkState::Disconnected { since: ctx.now };
                } else {
                    debug!(target: TAG, reason, "station still disconnected");
                }
                self.schedule_retry(ctx)
            }
            RadioEvent::ApStationConnected { .. } => Ok(()),
            RadioEvent::ApStationDisconnected { .. } => {
                // The client count changed, which changes the retry delay.
                if matches!(self.state, LinkState::Disconnected { .. }) {
                    self.schedule_retry(ctx)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Called when the retry timer fires.
    pub fn on_retry_timer(&mut self, ctx: &mut FallbackContext<'_>) -> Result<(), RadioError> {
        self.next_retry_at = None;
        if self.state == LinkState::Connected {
            return Ok(());
        }

        self.engage_if_due(ctx)?;
        if self.defer_for_control(ctx) {
            return Ok(());
        }
        if let Err(err) = ctx.radio.connect() {
            warn!(target: TAG, "connect failed: {}", err);
        }
        // Covers drivers that report a failed attempt late or not at all; a
        // disconnect event simply re-arms the same timer.
        self.schedule_retry(ctx)
    }

    fn connect_as_station(&mut self, ctx: &mut FallbackContext<'_>) -> Result<(), RadioError> {
        if self.defer_for_control(ctx) {
            return Ok(());
        }
        debug!(target: TAG, "connecting as station");
        match ctx.radio.connect() {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(target: TAG, "connect failed: {}", err);
                self.schedule_retry(ctx)
            }
        }
    }

    /// Defers a reconnect while the vehicle is being driven.
    fn defer_for_control(&mut self, ctx: &mut FallbackContext<'_>) -> bool {
        if RECONNECT_WHILE_CONTROLLED || !ctx.activity.is_active(ctx.now) {
            return false;
        }
        let delay = ctx.activity.remaining(ctx.now) + MIN_RECONNECT_DELAY;
        debug!(target: TAG, ?delay, "being controlled, deferring reconnect");
        self.arm(ctx, delay);
        true
    }

    fn schedule_retry(&mut self, ctx: &mut FallbackContext<'_>) -> Result<(), RadioError> {
        ctx.timer.cancel();
        self.next_retry_at = None;

        self.engage_if_due(ctx)?;

        let delay = match ctx.radio.mode()? {
            OperatingMode::ApSta => {
                let stations = ctx.radio.connected_stations().map(|s| s.len()).unwrap_or(0);
                if stations > 0 {
                    debug!(target: TAG, stations, "access point in use, retrying later");
                    RECONNECT_DELAY_WITH_STATIONS
                } else {
                    RECONNECT_DELAY_NO_STATIONS
                }
            }
            // Nobody to disrupt: retry right away.
            OperatingMode::Sta => MIN_RECONNECT_DELAY,
            OperatingMode::Ap => return Ok(()),
        };
        self.arm(ctx, delay);
        Ok(())
    }

    fn fallback_deadline(&self) -> Option<Duration> {
        match self.state {
            LinkState::Disconnected { since } if !self.timeout.is_zero() => {
                Some(since + self.timeout)
            }
            _ => None,
        }
    }

    fn engage_if_due(&mut self, ctx: &mut FallbackContext<'_>) -> Result<(), RadioError> {
        if self.engaged {
            return Ok(());
        }
        let due = matches!(self.fallback_deadline(), Some(deadline) if ctx.now >= deadline);
        if !due || ctx.radio.mode()? != OperatingMode::Sta {
            return Ok(());
        }

        info!(target: TAG, timeout = ?self.timeout, "station unreachable, enabling access point");
        ctx.radio.set_mode(OperatingMode::ApSta)?;
        ctx.radio.set_dhcp(Interface::Ap, true)?;
        self.engaged = true;
        Ok(())
    }

    fn arm(&mut self, ctx: &mut FallbackContext<'_>, delay: Duration) {
        ctx.timer.schedule(delay);
        self.next_retry_at = Some(ctx.now + delay);
    }
}
