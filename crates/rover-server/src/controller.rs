//! The controller actor.
//!
//! A single task owns the [`Device`]. HTTP handlers and the UDP listener
//! talk to it through a [`ControllerHandle`]; radio events arrive on their
//! own channel. The loop also drives the reconnect deadline, the control
//! safety tick and deferred restarts, so every device mutation happens on
//! this one task.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use rover_core::{ConfigError, Device, DeviceStatus, RadioEvent};

use crate::config::RuntimeConfig;
use crate::error::ControllerError;
use crate::timer::RetryDeadline;

const COMMAND_QUEUE: usize = 64;

/// Requests handled by the controller task.
#[derive(Debug)]
pub enum Command {
    /// Apply a config document and reply with the resulting report.
    Apply {
        body: String,
        reply: oneshot::Sender<Result<String, ConfigError>>,
    },
    Report {
        reply: oneshot::Sender<Result<String, ConfigError>>,
    },
    Status {
        details: bool,
        reply: oneshot::Sender<DeviceStatus>,
    },
    /// A raw UDP control packet. Fire and forget.
    Packet { bytes: Vec<u8> },
}

/// Cloneable sender side of the controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Command>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ControllerError::Stopped)?;
        rx.await.map_err(|_| ControllerError::Stopped)
    }

    /// Applies `body` and returns the report taken right after.
    pub async fn apply(&self, body: impl Into<String>) -> Result<String, ControllerError> {
        let body = body.into();
        Ok(self.request(|reply| Command::Apply { body, reply }).await??)
    }

    pub async fn report(&self) -> Result<String, ControllerError> {
        Ok(self.request(|reply| Command::Report { reply }).await??)
    }

    pub async fn status(&self, details: bool) -> Result<DeviceStatus, ControllerError> {
        self.request(|reply| Command::Status { details, reply }).await
    }

    pub async fn control_packet(&self, bytes: Vec<u8>) -> Result<(), ControllerError> {
        self.tx
            .send(Command::Packet { bytes })
            .await
            .map_err(|_| ControllerError::Stopped)
    }
}

pub struct Controller {
    device: Device,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedReceiver<RadioEvent>,
    retry: RetryDeadline,
    booted_at: Instant,
    restart_at: Option<Instant>,
    tick_period: Duration,
    report_capacity: usize,
}

impl Controller {
    /// `retry` must be the deadline behind the device's retry timer.
    pub fn new(
        device: Device,
        events: mpsc::UnboundedReceiver<RadioEvent>,
        retry: RetryDeadline,
        config: &RuntimeConfig,
    ) -> (Self, ControllerHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let controller = Self {
            device,
            commands,
            events,
            retry,
            booted_at: Instant::now(),
            restart_at: None,
            tick_period: config.tick_period,
            report_capacity: config.report_capacity,
        };
        (controller, ControllerHandle { tx })
    }

    /// Time since the last boot.
    fn now(&self) -> Duration {
        self.booted_at.elapsed()
    }

    /// Brings the device up from persisted state and restarts the uptime.
    pub fn boot(&mut self) -> Result<(), ConfigError> {
        self.booted_at = Instant::now();
        self.restart_at = None;
        self.device.init()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until every [`ControllerHandle`] is dropped.
    pub async fn run(mut self) {
        let mut tick = time::interval(self.tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let retry_at = self.retry.get();
            let restart_at = self.restart_at;

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!(target: "control", "all handles dropped, controller stopping");
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_radio_event(event),
                _ = wait_until(retry_at) => {
                    if let Some(at) = retry_at {
                        if self.retry.take_if(at) {
                            let now = self.now();
                            if let Err(err) = self.device.on_retry_timer(now) {
                                error!(target: "ap-fallback", "reconnect handling failed: {}", err);
                            }
                        }
                    }
                }
                _ = tick.tick() => {
                    let now = self.now();
                    self.device.tick(now);
                }
                _ = wait_until(restart_at) => {
                    info!(target: "httpd", "restarting");
                    if let Err(err) = self.boot() {
                        error!(target: "init-network", "boot after restart failed: {}", err);
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        let now = self.now();
        match command {
            Command::Apply { body, reply } => {
                let result = match self.device.apply(&body, now) {
                    Ok(outcome) => {
                        if let Some(delay) = outcome.restart_after {
                            self.restart_at = Some(Instant::now() + delay);
                        }
                        self.device.report_string(self.report_capacity, now)
                    }
                    Err(err) => {
                        warn!(target: "httpd", "config apply failed: {}", err);
                        Err(err)
                    }
                };
                let _ = reply.send(result);
            }
            Command::Report { reply } => {
                let _ = reply.send(self.device.report_string(self.report_capacity, now));
            }
            Command::Status { details, reply } => {
                let _ = reply.send(self.device.status(now, details));
            }
            Command::Packet { bytes } => {
                if let Err(err) = self.device.handle_packet(&bytes, now) {
                    warn!(target: "udp", len = bytes.len(), "dropping control packet: {}", err);
                }
            }
        }
    }

    fn handle_radio_event(&mut self, event: RadioEvent) {
        debug!(target: "ap-fallback", ?event, "radio event");
        let now = self.now();
        if let Err(err) = self.device.handle_radio_event(&event, now) {
            error!(target: "ap-fallback", "radio event handling failed: {}", err);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
