//! Wire-level handling of the three Trigno station channels.
//!
//! - The command channel carries ASCII lines terminated by `\r\n\r\n`
//!   ([`LineReader`], [`LineWriter`]).
//! - The two data channels carry an unframed sequence of sample blocks, each
//!   `channels × 4` bytes of little-endian `f32`. [`SampleReader`] reassembles
//!   blocks from arbitrary-sized reads; [`BlockWriter`] emits them.

pub mod assembler;
pub mod block;
pub mod error;
pub mod line;
pub mod wire;
pub mod writer;

pub use assembler::{assemble_blocks, SampleReader};
pub use block::{decode_blocks, encode_block, SampleMatrix};
pub use error::{FrameError, Result};
pub use line::{decode_line, encode_line, LineReader, LineWriter};
pub use wire::{
    BlockLayout, ChannelRole, PortMap, AUXILIARY_CHANNELS, AUXILIARY_PORT, COMMAND_PORT,
    DEFAULT_STATION_HOST, PRIMARY_CHANNELS, PRIMARY_PORT, TERMINATOR, VALUE_WIDTH,
};
pub use writer::BlockWriter;
