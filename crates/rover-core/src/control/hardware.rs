//! Motor and light outputs.

/// One of the two headlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Light {
    Main,
    Other,
}

/// One of the two drive motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motor {
    Left,
    Right,
}

impl Motor {
    pub const ALL: [Motor; 2] = [Motor::Left, Motor::Right];
}

impl Light {
    pub const ALL: [Light; 2] = [Light::Main, Light::Other];
}

/// Output driver for lights and motors.
///
/// Duty is a signed percentage: `12.3` means 12.3% forward, negative
/// values drive backwards.
pub trait Hardware: Send {
    fn set_light(&mut self, light: Light, on: bool);

    fn light(&self, light: Light) -> bool;

    fn set_motor(&mut self, motor: Motor, duty: f32);

    fn motor(&self, motor: Motor) -> f32;
}
