//! # rover-server
//!
//! Tokio runtime for the rover core.
//!
//! - [`Controller`]: the task owning the device, plus its [`ControllerHandle`]
//! - [`TokioRetryTimer`]: the reconnect timer, polled by the controller loop
//! - [`UdpControl`]: UDP listener for control packets
//! - [`FileStorage`]: persisted entries in a JSON file
//! - [`sim`]: simulated radio, camera and outputs for host runs

pub mod config;
pub mod controller;
pub mod error;
pub mod persist;
pub mod sim;
pub mod timer;
pub mod udp;

pub use config::RuntimeConfig;
pub use controller::{Command, Controller, ControllerHandle};
pub use error::ControllerError;
pub use persist::FileStorage;
pub use timer::{RetryDeadline, TokioRetryTimer};
pub use udp::UdpControl;

use rover_core::{ControlActivity, Device, KvStorage, NetworkManager};

/// A device wired to simulated drivers, ready to be handed to a
/// [`Controller`].
pub struct SimulatedRover {
    pub controller: Controller,
    pub handle: ControllerHandle,
    pub radio: sim::SimRadioHandle,
    pub camera: sim::SimCamera,
    pub hardware: sim::SimHardware,
}

impl SimulatedRover {
    pub fn new(storage: Box<dyn KvStorage>, config: &RuntimeConfig) -> Self {
        let (radio, radio_handle, events) = sim::SimRadio::new();
        radio_handle.set_upstream(config.sim_upstream.as_deref());
        let camera = sim::SimCamera::default();
        let hardware = sim::SimHardware::default();
        let retry = RetryDeadline::default();

        let network = NetworkManager::new(
            Box::new(radio),
            storage,
            Box::new(TokioRetryTimer::new(retry.clone())),
        );
        let device = Device::new(network, Box::new(camera.clone()), Box::new(hardware.clone()))
            .with_activity(ControlActivity::new(config.control_timeout, config.light_timeout))
            .with_token_budget(config.token_budget);
        let (controller, handle) = Controller::new(device, events, retry, config);

        Self {
            controller,
            handle,
            radio: radio_handle,
            camera,
            hardware,
        }
    }
}
