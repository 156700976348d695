/// Errors that can occur while encoding or decoding station channel data.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A sample block layout must have at least one channel.
    #[error("sample block layout needs at least one channel")]
    ZeroChannels,

    /// A block handed to the writer does not match the channel layout.
    #[error("sample block has {actual} values, layout expects {expected}")]
    BlockWidth { expected: usize, actual: usize },

    /// A command line cannot be put on the wire as-is.
    #[error("invalid command line {line:?}: {reason}")]
    InvalidLine { line: String, reason: &'static str },

    /// An I/O error occurred while reading or writing the channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the channel before a complete line was received.
    #[error("connection closed (incomplete line)")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true if this error is an expired socket deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameError::Io(err) if trigno_transport::is_timeout(err))
    }
}

impl From<trigno_transport::TransportError> for FrameError {
    fn from(err: trigno_transport::TransportError) -> Self {
        match err {
            trigno_transport::TransportError::Io(io)
            | trigno_transport::TransportError::Accept(io) => FrameError::Io(io),
            trigno_transport::TransportError::Bind { source, .. }
            | trigno_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
