//! Network glue
//!
//! This module owns the station's UDP sockets and derives the robot address
//! from the team number.

mod connection;
mod discovery;

pub use self::connection::Transport;
pub use self::discovery::{AddressResolver, TargetAddress, TargetResolver};
