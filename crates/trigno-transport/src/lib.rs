//! Blocking TCP transport for the Trigno station protocol.
//!
//! A station session is made of three independent TCP connections (command,
//! primary data, auxiliary data). This crate provides the connected
//! [`StationStream`] and the single-peer [`StationListener`] used by the mock
//! station. Everything else builds on these two types.

pub mod error;
pub mod listener;
pub mod stream;

pub use error::{Result, TransportError};
pub use listener::StationListener;
pub use stream::{is_timeout, StationStream};
