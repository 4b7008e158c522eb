use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};
use crate::network::TargetAddress;

/// Alliance colour the station is assigned to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alliance {
    #[default]
    Red,
    Blue,
}

impl FromStr for Alliance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(Alliance::Red),
            "blue" => Ok(Alliance::Blue),
            other => Err(Error::config(format!("unknown alliance '{}'", other))),
        }
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alliance::Red => f.write_str("red"),
            Alliance::Blue => f.write_str("blue"),
        }
    }
}

/// Alliance colour plus driver position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllianceStation {
    pub alliance: Alliance,
    pub position: u8,
}

impl fmt::Display for AllianceStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.alliance, self.position)
    }
}

/// Configuration for a driver station link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Team number, used to derive the robot address
    pub team_number: Option<u32>,
    /// Alliance colour
    pub alliance: Alliance,
    /// Driver position within the alliance (1-3)
    pub position: u8,
    /// How the robot address is derived from the team number
    pub target: TargetAddress,
    /// Local address both sockets bind to
    pub bind_address: IpAddr,
    /// Robot port control packets are sent to
    pub send_port: u16,
    /// Local port telemetry is received on
    pub receive_port: u16,
    /// Transmit period while searching for the robot
    #[serde(serialize_with = "super::serde::serialize_millis")]
    #[serde(deserialize_with = "super::serde::deserialize_millis")]
    pub discovery_interval: Duration,
    /// Transmit period while connected
    #[serde(serialize_with = "super::serde::serialize_millis")]
    #[serde(deserialize_with = "super::serde::deserialize_millis")]
    pub heartbeat_interval: Duration,
    /// Heartbeat ticks without a reply tolerated before the link is lost
    pub missed_packet_threshold: u32,
    /// Telemetry records held for a slow consumer before new ones are dropped
    pub telemetry_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            team_number: None,
            alliance: Alliance::Red,
            position: 1,
            target: TargetAddress::default(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            send_port: super::ROBOT_PORT,
            receive_port: super::STATION_PORT,
            discovery_interval: super::DISCOVERY_INTERVAL,
            heartbeat_interval: super::HEARTBEAT_INTERVAL,
            missed_packet_threshold: super::MISSED_PACKET_THRESHOLD,
            telemetry_buffer: 64,
        }
    }
}

impl Config {
    /// Creates a default configuration for a team
    pub fn for_team(team_number: u32) -> Self {
        Config {
            team_number: Some(team_number),
            ..Default::default()
        }
    }

    /// Loads a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Returns the validated team number
    pub fn team(&self) -> Result<u32> {
        match self.team_number {
            Some(0) => Err(Error::config("team number must be positive")),
            Some(team) => Ok(team),
            None => Err(Error::config("team number is required")),
        }
    }

    /// Returns the alliance station
    pub fn station(&self) -> AllianceStation {
        AllianceStation {
            alliance: self.alliance,
            position: self.position,
        }
    }

    /// Checks every field before the engine is built
    pub fn validate(&self) -> Result<()> {
        let team = self.team()?;

        if !(1..=3).contains(&self.position) {
            return Err(Error::config(format!(
                "position must be between 1 and 3, got {}",
                self.position
            )));
        }

        self.target.validate(team)?;

        if self.discovery_interval.is_zero() || self.heartbeat_interval.is_zero() {
            return Err(Error::config("transmit intervals must be non-zero"));
        }

        if self.telemetry_buffer == 0 {
            return Err(Error::config("telemetry buffer must hold at least one record"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.alliance, Alliance::Red);
        assert_eq!(config.position, 1);
        assert_eq!(config.send_port, 1110);
        assert_eq!(config.receive_port, 1150);
        assert_eq!(config.discovery_interval, Duration::from_millis(1000));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(20));
        assert_eq!(config.missed_packet_threshold, 10);
    }

    #[test]
    fn test_team_number_required() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::for_team(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: team number must be positive");

        assert!(Config::for_team(254).validate().is_ok());
    }

    #[test]
    fn test_position_range() {
        let mut config = Config::for_team(1678);
        config.position = 4;
        assert!(config.validate().is_err());

        config.position = 3;
        config.alliance = Alliance::Blue;
        assert!(config.validate().is_ok());
        assert_eq!(config.station().to_string(), "blue3");
    }

    #[test]
    fn test_alliance_parse() {
        assert_eq!("Red".parse::<Alliance>().unwrap(), Alliance::Red);
        assert_eq!("blue".parse::<Alliance>().unwrap(), Alliance::Blue);
        assert!("green".parse::<Alliance>().is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"team_number": 971, "alliance": "blue", "heartbeat_interval": 25}"#)
                .unwrap();
        assert_eq!(config.team_number, Some(971));
        assert_eq!(config.alliance, Alliance::Blue);
        assert_eq!(config.position, 1);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(25));
        assert_eq!(config.discovery_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_telemetry_buffer_rejected() {
        let mut config = Config::for_team(118);
        config.telemetry_buffer = 0;
        assert!(config.validate().is_err());
    }
}
