//! Remote control freshness and the safety stop.

use std::time::Duration;

use tracing::{debug, info};

use super::hardware::{Hardware, Light, Motor};

const TAG: &str = "control";

/// Default time without control input before the motors are stopped.
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default time without control input before the lights are switched off.
pub const DEFAULT_LIGHT_TIMEOUT: Duration = Duration::from_secs(30);

/// What a [`ControlActivity::tick`] did to the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyAction {
    /// Control is fresh; outputs untouched.
    None,
    /// Motors forced to zero.
    MotorsStopped,
    /// Motors forced to zero and lights switched off.
    AllStopped,
}

/// Tracks when the vehicle was last driven.
///
/// Times are durations since boot. Before the first control input the
/// vehicle counts as idle.
#[derive(Debug, Clone)]
pub struct ControlActivity {
    last_control: Option<Duration>,
    control_timeout: Duration,
    light_timeout: Duration,
}

impl Default for ControlActivity {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_TIMEOUT, DEFAULT_LIGHT_TIMEOUT)
    }
}

impl ControlActivity {
    pub fn new(control_timeout: Duration, light_timeout: Duration) -> Self {
        Self {
            last_control: None,
            control_timeout,
            light_timeout: light_timeout.max(control_timeout),
        }
    }

    pub fn control_timeout(&self) -> Duration {
        self.control_timeout
    }

    pub fn last_control(&self) -> Option<Duration> {
        self.last_control
    }

    /// Marks control input as received at `now`.
    pub fn refresh(&mut self, now: Duration) {
        self.last_control = Some(now);
    }

    /// Forgets the last control input, as after a restart.
    pub fn clear(&mut self) {
        self.last_control = None;
    }

    fn elapsed(&self, now: Duration) -> Option<Duration> {
        self.last_control.map(|at| now.saturating_sub(at))
    }

    /// Whether someone is currently driving.
    pub fn is_active(&self, now: Duration) -> bool {
        matches!(self.elapsed(now), Some(elapsed) if elapsed < self.control_timeout)
    }

    /// Time until the current session times out, zero when idle.
    pub fn remaining(&self, now: Duration) -> Duration {
        match self.elapsed(now) {
            Some(elapsed) => self.control_timeout.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    /// Periodic safety check.
    ///
    /// Past the control timeout both motors are zeroed on every call; past
    /// the light timeout both lights are switched off as well. Before the
    /// timeout the hardware is not touched.
    pub fn tick(&self, now: Duration, hardware: &mut dyn Hardware) -> SafetyAction {
        let expired_for = self.elapsed(now);
        if matches!(expired_for, Some(elapsed) if elapsed < self.control_timeout) {
            return SafetyAction::None;
        }

        let was_moving = Motor::ALL.iter().any(|&m| hardware.motor(m) != 0.0);
        for motor in Motor::ALL {
            hardware.set_motor(motor, 0.0);
        }
        if was_moving {
            info!(target: TAG, "no control received in time, stopping motors");
        }

        match expired_for {
            Some(elapsed) if elapsed < self.light_timeout => SafetyAction::MotorsStopped,
            _ => {
                let lights_on = Light::ALL.iter().any(|&l| hardware.light(l));
                for light in Light::ALL {
                    hardware.set_light(light, false);
                }
                if lights_on {
                    debug!(target: TAG, "control idle, switching lights off");
                }
                SafetyAction::AllStopped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHardware;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_idle_before_first_control() {
        let activity = ControlActivity::default();
        assert!(!activity.is_active(Duration::ZERO));
        assert_eq!(activity.remaining(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_active_window() {
        let mut activity = ControlActivity::default();
        activity.refresh(100 * MS);
        assert!(activity.is_active(100 * MS));
        assert!(activity.is_active(1099 * MS));
        assert_eq!(activity.remaining(600 * MS), 500 * MS);
        assert!(!activity.is_active(1100 * MS));
    }

    #[test]
    fn test_tick_before_timeout_never_touches_hardware() {
        let mut activity = ControlActivity::default();
        let mut hardware = MockHardware::default();
        hardware.set_motor(Motor::Left, 40.0);
        hardware.set_light(Light::Main, true);
        let writes = hardware.state().writes;

        activity.refresh(Duration::ZERO);
        for t in [0, 200, 500, 999] {
            assert_eq!(activity.tick(t * MS, &mut hardware), SafetyAction::None);
        }
        assert_eq!(hardware.state().writes, writes);
        assert_eq!(hardware.motor(Motor::Left), 40.0);
    }

    #[test]
    fn test_tick_after_timeout_is_idempotent() {
        let mut activity = ControlActivity::default();
        let mut hardware = MockHardware::default();
        activity.refresh(Duration::ZERO);
        hardware.set_motor(Motor::Left, 40.0);
        hardware.set_motor(Motor::Right, -20.0);
        hardware.set_light(Light::Other, true);

        for t in [1000, 1100, 1200, 5000] {
            assert_eq!(activity.tick(t * MS, &mut hardware), SafetyAction::MotorsStopped);
            assert_eq!(hardware.motor(Motor::Left), 0.0);
            assert_eq!(hardware.motor(Motor::Right), 0.0);
            assert!(hardware.light(Light::Other));
        }
    }

    #[test]
    fn test_tick_switches_lights_off_after_light_timeout() {
        let mut activity = ControlActivity::default();
        let mut hardware = MockHardware::default();
        activity.refresh(Duration::ZERO);
        hardware.set_light(Light::Main, true);

        assert_eq!(
            activity.tick(DEFAULT_LIGHT_TIMEOUT, &mut hardware),
            SafetyAction::AllStopped
        );
        assert!(!hardware.light(Light::Main));
        assert_eq!(
            activity.tick(DEFAULT_LIGHT_TIMEOUT * 2, &mut hardware),
            SafetyAction::AllStopped
        );
    }
}
