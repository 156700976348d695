use std::time::Duration;

use trigno_frame::{ChannelRole, FrameError};
use trigno_transport::TransportError;

/// Errors that can occur in station session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// One of the three station channels could not be opened.
    #[error("failed to open {channel} channel: {source}")]
    Connect {
        channel: ChannelRole,
        source: TransportError,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No response arrived on the command channel within the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The station closed the command channel, or the session was quit.
    #[error("station disconnected")]
    Disconnected,

    /// Sensor ids start at 1.
    #[error("invalid sensor id {0}: sensor ids start at 1")]
    InvalidSensorId(u32),
}

impl SessionError {
    /// Returns true for an expired command channel deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
