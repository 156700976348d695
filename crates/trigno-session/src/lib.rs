//! Client side of the Trigno station protocol.
//!
//! [`CommandSession`] drives the ASCII command channel (greeting,
//! mastership, pairing, start/stop, quit). [`TrignoClient`] composes it with
//! the two data channels into one blocking session.
//!
//! ```no_run
//! use std::time::Duration;
//! use trigno_session::{SessionConfig, TrignoClient};
//!
//! let config = SessionConfig::new("127.0.0.1").with_timeout(Some(Duration::from_millis(500)));
//! let mut client = TrignoClient::connect(&config)?;
//! client.start()?;
//! std::thread::sleep(Duration::from_secs(1));
//! client.stop()?;
//! let emg = client.read_primary(None)?;
//! println!("{} samples", emg.samples());
//! client.close();
//! # Ok::<(), trigno_session::SessionError>(())
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod session;

pub use client::TrignoClient;
pub use command::{Command, PAIRED_YES, PAIR_COMPLETE, PAIR_INITIATED};
pub use config::{SessionConfig, DEFAULT_TIMEOUT};
pub use error::{Result, SessionError};
pub use session::{CommandSession, SessionState};
