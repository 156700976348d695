use std::time::Duration;

use trigno_frame::{BlockLayout, PortMap, DEFAULT_STATION_HOST};

/// Read deadline applied to all three channels unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a client session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Station address.
    pub host: String,
    /// Ports of the three channels.
    pub ports: PortMap,
    /// Connect, read and write deadline for every channel. `None` blocks
    /// forever.
    pub timeout: Option<Duration>,
    /// Block layout of the primary data channel.
    pub primary: BlockLayout,
    /// Block layout of the auxiliary data channel.
    pub auxiliary: BlockLayout,
}

impl SessionConfig {
    /// Default configuration for a station at `host`.
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

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
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
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_STATION_HOST.to_string(),
            ports: PortMap::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            primary: BlockLayout::PRIMARY,
            auxiliary: BlockLayout::AUXILIARY,
        }
    }
}
