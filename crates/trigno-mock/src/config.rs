use std::time::Duration;

use trigno_frame::{BlockLayout, PortMap};

/// Sample rate of both generators unless overridden.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 4000.0;

/// First line sent on the command channel after all peers connected.
pub const DEFAULT_GREETING: &str = "Delsys Trigno Server PROTOCOL MOCK";

/// How long a generator may block on a client that stopped reading.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the mock station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    /// Address to listen on.
    pub host: String,
    /// Listening ports; zero picks an ephemeral port.
    pub ports: PortMap,
    /// Blocks per second on each data channel.
    pub sample_rate_hz: f64,
    /// Block layout of the primary data channel.
    pub primary: BlockLayout,
    /// Block layout of the auxiliary data channel.
    pub auxiliary: BlockLayout,
    /// Greeting line.
    pub greeting: String,
    /// Write deadline on the data channels. Bounds how long STOP can wait
    /// for a generator stuck on a full socket buffer.
    pub write_timeout: Option<Duration>,
}

impl StationConfig {
    /// Default station listening on `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, ports: PortMap) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate_hz: f64) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn with_primary_layout(mut self, layout: BlockLayout) -> Self {
        self.primary = layout;
        self
    }

    pub fn with_auxiliary_layout(mut self, layout: BlockLayout) -> Self {
        self.auxiliary = layout;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            ports: PortMap::default(),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            primary: BlockLayout::PRIMARY,
            auxiliary: BlockLayout::AUXILIARY,
            greeting: DEFAULT_GREETING.to_string(),
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
        }
    }
}
