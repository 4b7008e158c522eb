//! Core types for the driver station link
//!
//! This module contains the error type, configuration and the fixed protocol
//! constants used throughout the library.

use std::time::Duration;

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{Alliance, AllianceStation, Config};

/// Port the robot listens on for control packets
pub const ROBOT_PORT: u16 = 1110;

/// Port the station listens on for telemetry
pub const STATION_PORT: u16 = 1150;

/// Transmit period while no robot has been observed (1 Hz)
pub const DISCOVERY_INTERVAL: Duration = Duration::from_millis(1000);

/// Transmit period once the robot has replied (50 Hz)
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(20);

/// Heartbeat ticks without a reply before the link is declared lost
pub const MISSED_PACKET_THRESHOLD: u32 = 10;

/// Largest datagram the receive path accepts
pub const MAX_DATAGRAM_SIZE: usize = 1500;
