use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Operating mode requested from the robot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    Disabled,
    Test,
    Autonomous,
    TeleOperated,
    EmergencyStop,
}

impl Mode {
    /// Wire value of this mode
    pub fn to_byte(self) -> u8 {
        match self {
            Mode::Disabled => 0x00,
            Mode::TeleOperated => 0x04,
            Mode::Test => 0x05,
            Mode::Autonomous => 0x06,
            Mode::EmergencyStop => 0x80,
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" => Ok(Mode::Disabled),
            "test" => Ok(Mode::Test),
            "auto" | "autonomous" => Ok(Mode::Autonomous),
            "teleop" | "tele-operated" => Ok(Mode::TeleOperated),
            "estop" | "emergency-stop" => Ok(Mode::EmergencyStop),
            other => Err(Error::config(format!("unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Disabled => "disabled",
            Mode::Test => "test",
            Mode::Autonomous => "auto",
            Mode::TeleOperated => "teleop",
            Mode::EmergencyStop => "estop",
        };
        f.write_str(name)
    }
}

/// Reboot directive carried in every control packet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebootAction {
    #[default]
    Idle,
    RobotCode,
    DeviceReboot,
}

impl RebootAction {
    /// Wire value of this directive
    pub fn to_byte(self) -> u8 {
        match self {
            RebootAction::Idle => 0x10,
            RebootAction::RobotCode => 0x14,
            RebootAction::DeviceReboot => 0x18,
        }
    }
}

impl FromStr for RebootAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "idle" => Ok(RebootAction::Idle),
            "restart-code" => Ok(RebootAction::RobotCode),
            "reboot" => Ok(RebootAction::DeviceReboot),
            other => Err(Error::config(format!("unknown reboot action '{}'", other))),
        }
    }
}

/// Outbound control packet state, owned by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    /// Sequence counter, wraps at 65536
    pub ping: u16,
    pub mode: Mode,
    pub reboot: RebootAction,
}

impl Default for ControlPacket {
    fn default() -> Self {
        ControlPacket {
            ping: 1,
            mode: Mode::Disabled,
            reboot: RebootAction::Idle,
        }
    }
}

impl ControlPacket {
    /// Advances the sequence counter after a transmit
    pub fn advance(&mut self) {
        self.ping = self.ping.wrapping_add(1);
    }
}

/// Telemetry reported by the robot, one per inbound datagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Echoed sequence counter
    pub pong: u16,
    /// Raw mode byte as reported by the robot
    pub mode: u8,
    /// Two hex byte pairs joined by a dot, e.g. "0c.05"
    pub battery_voltage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_packet_defaults() {
        let packet = ControlPacket::default();
        assert_eq!(packet.ping, 1);
        assert_eq!(packet.mode, Mode::Disabled);
        assert_eq!(packet.reboot, RebootAction::Idle);
    }

    #[test]
    fn test_ping_wraps() {
        let mut packet = ControlPacket {
            ping: u16::MAX,
            ..Default::default()
        };
        packet.advance();
        assert_eq!(packet.ping, 0);
        packet.advance();
        assert_eq!(packet.ping, 1);
    }

    #[test]
    fn test_mode_bytes() {
        assert_eq!(Mode::Disabled.to_byte(), 0x00);
        assert_eq!(Mode::Test.to_byte(), 0x05);
        assert_eq!(Mode::Autonomous.to_byte(), 0x06);
        assert_eq!(Mode::TeleOperated.to_byte(), 0x04);
        assert_eq!(Mode::EmergencyStop.to_byte(), 0x80);

        assert_eq!(RebootAction::Idle.to_byte(), 0x10);
        assert_eq!(RebootAction::RobotCode.to_byte(), 0x14);
        assert_eq!(RebootAction::DeviceReboot.to_byte(), 0x18);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("teleop".parse::<Mode>().unwrap(), Mode::TeleOperated);
        assert_eq!("AUTO".parse::<Mode>().unwrap(), Mode::Autonomous);
        assert_eq!("estop".parse::<Mode>().unwrap(), Mode::EmergencyStop);
        assert!("practice".parse::<Mode>().is_err());

        for mode in [Mode::Disabled, Mode::Test, Mode::Autonomous, Mode::TeleOperated, Mode::EmergencyStop] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_reboot_parse() {
        assert_eq!("reboot".parse::<RebootAction>().unwrap(), RebootAction::DeviceReboot);
        assert_eq!("restart-code".parse::<RebootAction>().unwrap(), RebootAction::RobotCode);
        assert!("halt".parse::<RebootAction>().is_err());
    }
}
