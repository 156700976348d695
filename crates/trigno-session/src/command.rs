use std::fmt;

use crate::error::{Result, SessionError};

/// Token in the first pairing reply when the station started pairing.
pub const PAIR_INITIATED: &str = "INITIATED";

/// Token in the second pairing reply when the sensor was paired.
pub const PAIR_COMPLETE: &str = "COMPLETE";

/// Exact reply to a paired query for a paired sensor.
pub const PAIRED_YES: &str = "YES";

/// Commands understood by the base station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Claim control of the station.
    Master,
    /// Start acquisition on both data channels.
    Start,
    /// Stop acquisition.
    Stop,
    /// End the session.
    Quit,
    /// Ask whether a sensor is paired.
    SensorPaired(u32),
    /// Start pairing a sensor.
    SensorPair(u32),
}

impl Command {
    /// Build a sensor command, rejecting id 0.
    pub fn paired_query(sensor: u32) -> Result<Self> {
        check_sensor_id(sensor).map(Command::SensorPaired)
    }

    /// Build a pairing command, rejecting id 0.
    pub fn pair(sensor: u32) -> Result<Self> {
        check_sensor_id(sensor).map(Command::SensorPair)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Master => f.write_str("MASTER"),
            Command::Start => f.write_str("START"),
            Command::Stop => f.write_str("STOP"),
            Command::Quit => f.write_str("QUIT"),
            Command::SensorPaired(id) => write!(f, "SENSOR {id} PAIRED?"),
            Command::SensorPair(id) => write!(f, "SENSOR {id} PAIR"),
        }
    }
}

fn check_sensor_id(sensor: u32) -> Result<u32> {
    if sensor == 0 {
        return Err(SessionError::InvalidSensorId(sensor));
    }
    Ok(sensor)
}

/// First pairing reply: did the station start pairing?
pub fn pairing_initiated(reply: &str) -> bool {
    reply.contains(PAIR_INITIATED)
}

/// Second pairing reply: did pairing finish?
pub fn pairing_complete(reply: &str) -> bool {
    reply.contains(PAIR_COMPLETE)
}

/// Paired query reply. Only the exact token counts.
pub fn is_paired_reply(reply: &str) -> bool {
    reply == PAIRED_YES
}
