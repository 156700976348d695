use trigno_frame::{ChannelRole, FrameError};
use trigno_transport::TransportError;

/// Errors that can occur while running the mock station.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The configured sample rate cannot drive a generator.
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    /// A thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    /// A generator thread panicked instead of returning.
    #[error("{0} generator panicked")]
    GeneratorPanicked(ChannelRole),

    /// The station thread panicked instead of returning.
    #[error("station thread panicked")]
    StationPanicked,
}

pub type Result<T> = std::result::Result<T, StationError>;
