//! Remote control: light/motor outputs, the `control` config object, UDP
//! control packets and the safety stop.

pub mod activity;
pub mod codec;
pub mod hardware;
pub mod packet;

pub use activity::{ControlActivity, SafetyAction, DEFAULT_CONTROL_TIMEOUT, DEFAULT_LIGHT_TIMEOUT};
pub use hardware::{Hardware, Light, Motor};
pub use packet::{ControlFlags, ControlPacket, PacketError, MAX_PACKET_LEN};
