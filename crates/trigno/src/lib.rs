//! Client and mock station for the Delsys Trigno streaming protocol.
//!
//! A Trigno base station exposes three TCP channels: an ASCII command
//! channel and two unframed binary sample streams (primary EMG and
//! auxiliary accelerometer data).
//!
//! # Crate Structure
//!
//! - [`transport`]: Blocking TCP channels and single-peer listeners
//! - [`frame`]: Wire constants, command line codec, sample block assembly
//! - [`session`]: Command session state machine and the [`TrignoClient`] facade
//! - [`mock`]: Mock base station (behind the `mock` feature)

/// Re-export transport types.
pub mod transport {
    pub use trigno_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use trigno_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use trigno_session::*;
}

/// Re-export mock station types (requires `mock` feature).
#[cfg(feature = "mock")]
pub mod mock {
    pub use trigno_mock::*;
}

pub use trigno_frame::{BlockLayout, PortMap, SampleMatrix};
pub use trigno_session::{SessionConfig, SessionError, TrignoClient};
