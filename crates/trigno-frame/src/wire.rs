//! Fixed protocol definitions.
//!
//! Ports and channel counts are the station defaults. Both are carried as
//! values ([`PortMap`], [`BlockLayout`]) so alternate stations can be
//! targeted without touching these constants.

use crate::error::{FrameError, Result};

/// Command-and-control channel port.
pub const COMMAND_PORT: u16 = 50040;

/// Primary (EMG) sample stream port.
pub const PRIMARY_PORT: u16 = 50043;

/// Auxiliary (accelerometer) sample stream port.
pub const AUXILIARY_PORT: u16 = 50044;

/// Link-local address the base station answers on out of the box.
pub const DEFAULT_STATION_HOST: &str = "169.254.113.0";

/// Width of one sample value on the wire (IEEE-754 single, little-endian).
pub const VALUE_WIDTH: usize = 4;

/// Channels per block on the primary stream.
pub const PRIMARY_CHANNELS: usize = 16;

/// Channels per block on the auxiliary stream.
pub const AUXILIARY_CHANNELS: usize = 48;

/// Terminator appended to every command and response line.
pub const TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// The three channels of a station session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Command,
    Primary,
    Auxiliary,
}

impl ChannelRole {
    /// All roles in connection order.
    pub const ALL: [ChannelRole; 3] = [
        ChannelRole::Command,
        ChannelRole::Primary,
        ChannelRole::Auxiliary,
    ];

    /// Human-readable channel name.
    pub fn name(self) -> &'static str {
        match self {
            ChannelRole::Command => "command",
            ChannelRole::Primary => "primary",
            ChannelRole::Auxiliary => "auxiliary",
        }
    }
}

impl std::fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Port assignment for the three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMap {
    pub command: u16,
    pub primary: u16,
    pub auxiliary: u16,
}

impl PortMap {
    /// Port for a given channel.
    pub fn port(&self, role: ChannelRole) -> u16 {
        match role {
            ChannelRole::Command => self.command,
            ChannelRole::Primary => self.primary,
            ChannelRole::Auxiliary => self.auxiliary,
        }
    }

    /// All-zero map; listeners bound with it pick ephemeral ports.
    pub fn ephemeral() -> Self {
        Self {
            command: 0,
            primary: 0,
            auxiliary: 0,
        }
    }
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            command: COMMAND_PORT,
            primary: PRIMARY_PORT,
            auxiliary: AUXILIARY_PORT,
        }
    }
}

/// Shape of one sample block: `channels` values of [`VALUE_WIDTH`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    channels: usize,
}

impl BlockLayout {
    /// Default primary stream layout.
    pub const PRIMARY: Self = Self {
        channels: PRIMARY_CHANNELS,
    };

    /// Default auxiliary stream layout.
    pub const AUXILIARY: Self = Self {
        channels: AUXILIARY_CHANNELS,
    };

    /// Layout with an explicit channel count. Zero channels is rejected.
    pub fn new(channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(FrameError::ZeroChannels);
        }
        Ok(Self { channels })
    }

    /// Values per block.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Bytes per block.
    pub fn block_size(&self) -> usize {
        self.channels * VALUE_WIDTH
    }
}
