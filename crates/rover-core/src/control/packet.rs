//! Binary control packets received over UDP.
//!
//! Layout (little-endian), first byte is the packet type:
//!
//! | type | bytes | fields                                                  |
//! |------|-------|---------------------------------------------------------|
//! | 1    | 4     | flags, left duty `u8`, right duty `u8`                  |
//! | 2    | 12    | flags, smoothing `u16` ms, left `f32` %, right `f32` %  |
//!
//! Flag bits: 0 main light, 1 other light, 6 left backward, 7 right
//! backward. Direction bits only apply to short packets; long packets carry
//! signed duties.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use super::activity::ControlActivity;
use super::hardware::{Hardware, Light, Motor};

/// Largest datagram accepted.
pub const MAX_PACKET_LEN: usize = 16;

const TYPE_SHORT: u8 = 1;
const TYPE_LONG: u8 = 2;
const SHORT_LEN: usize = 4;
const LONG_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,

    #[error("packet too long ({0} bytes)")]
    TooLong(usize),

    #[error("unknown packet type {0}")]
    UnknownType(u8),

    #[error("truncated packet: type {kind} needs {expected} bytes, got {actual}")]
    Truncated {
        kind: u8,
        expected: usize,
        actual: usize,
    },
}

/// Packet flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags(pub u8);

impl ControlFlags {
    pub fn main_light(self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn other_light(self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn left_backward(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn right_backward(self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// A decoded control packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlPacket {
    Short {
        flags: ControlFlags,
        left: u8,
        right: u8,
    },
    Long {
        flags: ControlFlags,
        smoothing: Duration,
        left: f32,
        right: f32,
    },
}

/// Scales a raw byte duty to a signed percentage.
fn byte_duty(raw: u8, backward: bool) -> f32 {
    let percent = f32::from(raw) * 100.0 / f32::from(u8::MAX);
    if backward {
        -percent
    } else {
        percent
    }
}

fn clamp_duty(duty: f32) -> f32 {
    if duty.is_nan() {
        0.0
    } else {
        duty.clamp(-100.0, 100.0)
    }
}

impl ControlPacket {
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let kind = *bytes.first().ok_or(PacketError::Empty)?;
        if bytes.len() > MAX_PACKET_LEN {
            return Err(PacketError::TooLong(bytes.len()));
        }
        let expected = match kind {
            TYPE_SHORT => SHORT_LEN,
            TYPE_LONG => LONG_LEN,
            other => return Err(PacketError::UnknownType(other)),
        };
        if bytes.len() < expected {
            return Err(PacketError::Truncated {
                kind,
                expected,
                actual: bytes.len(),
            });
        }

        let flags = ControlFlags(bytes[1]);
        Ok(match kind {
            TYPE_SHORT => ControlPacket::Short {
                flags,
                left: bytes[2],
                right: bytes[3],
            },
            _ => ControlPacket::Long {
                flags,
                smoothing: Duration::from_millis(u64::from(u16::from_le_bytes([
                    bytes[2], bytes[3],
                ]))),
                left: f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
                right: f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            },
        })
    }

    pub fn flags(&self) -> ControlFlags {
        match *self {
            ControlPacket::Short { flags, .. } | ControlPacket::Long { flags, .. } => flags,
        }
    }

    /// Signed duty percentages for the left and right motor.
    pub fn duties(&self) -> (f32, f32) {
        match *self {
            ControlPacket::Short { flags, left, right } => (
                byte_duty(left, flags.left_backward()),
                byte_duty(right, flags.right_backward()),
            ),
            ControlPacket::Long { left, right, .. } => (clamp_duty(left), clamp_duty(right)),
        }
    }

    /// Drives the outputs and marks the vehicle as being controlled.
    pub fn apply(&self, now: Duration, hardware: &mut dyn Hardware, activity: &mut ControlActivity) {
        let flags = self.flags();
        let (left, right) = self.duties();
        debug!(target: "udp", flags = flags.0, left, right, "control packet");

        hardware.set_light(Light::Main, flags.main_light());
        hardware.set_light(Light::Other, flags.other_light());
        hardware.set_motor(Motor::Left, left);
        hardware.set_motor(Motor::Right, right);
        activity.refresh(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHardware;

    fn long_packet(flags: u8, smoothing: u16, left: f32, right: f32) -> Vec<u8> {
        let mut bytes = vec![TYPE_LONG, flags];
        bytes.extend_from_slice(&smoothing.to_le_bytes());
        bytes.extend_from_slice(&left.to_le_bytes());
        bytes.extend_from_slice(&right.to_le_bytes());
        bytes
    }

    #[test]
    fn test_short_packet() {
        let packet = ControlPacket::decode(&[1, 0b0100_0001, 255, 51]).unwrap();
        let flags = packet.flags();
        assert!(flags.main_light());
        assert!(!flags.other_light());
        assert!(flags.left_backward());
        assert!(!flags.right_backward());
        assert_eq!(packet.duties(), (-100.0, 20.0));
    }

    #[test]
    fn test_long_packet() {
        let packet = ControlPacket::decode(&long_packet(0b10, 250, 62.5, -150.0)).unwrap();
        assert_eq!(
            packet,
            ControlPacket::Long {
                flags: ControlFlags(0b10),
                smoothing: Duration::from_millis(250),
                left: 62.5,
                right: -150.0,
            }
        );
        assert_eq!(packet.duties(), (62.5, -100.0));
    }

    #[test]
    fn test_rejected_packets() {
        assert_eq!(ControlPacket::decode(&[]), Err(PacketError::Empty));
        assert_eq!(ControlPacket::decode(&[9, 0, 0, 0]), Err(PacketError::UnknownType(9)));
        assert_eq!(
            ControlPacket::decode(&[2, 0, 0, 0]),
            Err(PacketError::Truncated {
                kind: 2,
                expected: 12,
                actual: 4
            })
        );
        assert_eq!(ControlPacket::decode(&[1; 17]), Err(PacketError::TooLong(17)));
    }

    #[test]
    fn test_apply_drives_outputs() {
        let mut hardware = MockHardware::default();
        let mut activity = ControlActivity::default();
        let packet = ControlPacket::decode(&[1, 0b1000_0011, 0, 255]).unwrap();

        packet.apply(Duration::from_secs(2), &mut hardware, &mut activity);

        assert!(hardware.light(Light::Main));
        assert!(hardware.light(Light::Other));
        assert_eq!(hardware.motor(Motor::Left), 0.0);
        assert_eq!(hardware.motor(Motor::Right), -100.0);
        assert!(activity.is_active(Duration::from_secs(2)));
    }
}
