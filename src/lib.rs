//! ds_link: driver station link
//!
//! This library implements the station side of a small UDP control protocol:
//! it transmits a 6-byte control packet at 1 Hz while searching for the robot
//! and at 50 Hz once the robot answers, declares the link lost after a run of
//! unanswered heartbeats, and decodes the telemetry the robot sends back.
//!
//! ```no_run
//! use ds_link::{Config, Station};
//!
//! # async fn example() -> ds_link::Result<()> {
//! let mut station = Station::bind(Config::for_team(254)).await?;
//! let mut telemetry = station.telemetry().expect("fresh station");
//! let handle = station.spawn();
//!
//! while let Some(record) = telemetry.next_record().await {
//!     println!("battery {}", record.battery_voltage);
//! }
//! handle.stop().await
//! # }
//! ```
pub mod core;
pub mod network;
pub mod protocol;
pub mod station;

// Re-export commonly used items
pub use crate::core::{Alliance, AllianceStation, Config, Error, Result};
pub use crate::network::{AddressResolver, TargetAddress};
pub use crate::protocol::{ConnectionState, LinkEvent, Mode, RebootAction, TelemetryRecord};
pub use crate::station::{Station, StationHandle, TelemetryStream};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
