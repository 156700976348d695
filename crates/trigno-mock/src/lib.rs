//! Mock Trigno base station.
//!
//! Listens on the three station ports, serves one client, and on `START`
//! streams synthetic sample blocks on both data channels at a fixed rate
//! until `STOP`. Used to exercise the client without hardware.
//!
//! ```no_run
//! use trigno_mock::{MockStation, StationConfig};
//!
//! let station = MockStation::bind(StationConfig::default())?;
//! let summary = station.run()?;
//! println!("served {} commands", summary.commands);
//! # Ok::<(), trigno_mock::StationError>(())
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod station;

pub use config::{StationConfig, DEFAULT_GREETING, DEFAULT_SAMPLE_RATE_HZ, DEFAULT_WRITE_TIMEOUT};
pub use error::{Result, StationError};
pub use generator::{sample_period, synthesize, Generator, RateController};
pub use station::{MockStation, StationHandle, StationSummary};
