use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use trigno_transport::StationStream;

use crate::error::{FrameError, Result};
use crate::wire::TERMINATOR;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Encode a command or response line into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬────────────────┐
/// │ ASCII text           │ \r \n \r \n    │
/// └──────────────────────┴────────────────┘
/// ```
pub fn encode_line(line: &str, dst: &mut BytesMut) -> Result<()> {
    if !line.is_ascii() {
        return Err(FrameError::InvalidLine {
            line: line.to_string(),
            reason: "not ASCII",
        });
    }
    if line.contains("\r\n\r\n") {
        return Err(FrameError::InvalidLine {
            line: line.to_string(),
            reason: "contains the line terminator",
        });
    }
    dst.reserve(line.len() + TERMINATOR.len());
    dst.put_slice(line.as_bytes());
    dst.put_slice(TERMINATOR);
    Ok(())
}

/// Decode one line from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a terminated line yet.
/// On success, consumes the line and its terminator from the buffer; the
/// returned text has the terminator stripped.
pub fn decode_line(src: &mut BytesMut) -> Result<Option<String>> {
    let Some(end) = src
        .windows(TERMINATOR.len())
        .position(|window| window == TERMINATOR)
    else {
        return Ok(None);
    };

    let line = String::from_utf8_lossy(&src[..end]).into_owned();
    src.advance(end + TERMINATOR.len());
    Ok(Some(line))
}

/// Reads terminated lines from any `Read` stream.
///
/// Bytes received past the end of a line are kept for the next call, so two
/// replies arriving in one segment are both delivered.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> LineReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next complete line (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached and
    /// `Err(FrameError::Io(_))` with a timeout kind when the stream's read
    /// deadline expires. A partial line stays buffered across a timeout.
    pub fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = decode_line(&mut self.buf)? {
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet returned as a line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Writes terminated lines to any `Write` stream.
pub struct LineWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> LineWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send one line (blocking).
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        self.buf.clear();
        encode_line(line, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl LineReader<StationStream> {
    /// Split a command channel into a line reader and writer sharing the
    /// same connection.
    pub fn split(stream: StationStream) -> Result<(Self, LineWriter<StationStream>)> {
        let writer_stream = stream.try_clone()?;
        Ok((Self::new(stream), LineWriter::new(writer_stream)))
    }
}
