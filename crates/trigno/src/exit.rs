use std::fmt;
use std::io;

use trigno_frame::FrameError;
use trigno_mock::StationError;
use trigno_session::SessionError;
use trigno_transport::TransportError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ZeroChannels => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::InvalidLine { .. } | FrameError::BlockWidth { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Connect { source, .. } | SessionError::Transport(source) => {
            transport_error(context, source)
        }
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Disconnected => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        SessionError::InvalidSensorId(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn station_error(context: &str, err: StationError) -> CliError {
    match err {
        StationError::Transport(err) => transport_error(context, err),
        StationError::Frame(err) => frame_error(context, err),
        StationError::InvalidSampleRate(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        let err = session_error("start failed", SessionError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("start failed: "));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let err = session_error(
            "connect failed",
            SessionError::Connect {
                channel: trigno_frame::ChannelRole::Primary,
                source: TransportError::Connect {
                    addr: "127.0.0.1:50043".to_string(),
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                },
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn bad_sensor_id_is_usage() {
        let err = session_error("pair failed", SessionError::InvalidSensorId(0));
        assert_eq!(err.code, USAGE);
    }
}
