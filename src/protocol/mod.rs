//! Protocol implementation module
//!
//! This module defines the control and telemetry packets, their wire encoding,
//! and the presence-detection state machine.

pub mod codec;
pub mod message;
pub mod state;

pub use self::codec::{
    decode_telemetry, encode_control, ControlCodec, TelemetryCodec, CONTROL_PACKET_LEN,
    MIN_TELEMETRY_LEN,
};
pub use self::message::{ControlPacket, Mode, RebootAction, TelemetryRecord};
pub use self::state::{ConnectionState, Effect, LinkEvent, LinkState, Timer};
