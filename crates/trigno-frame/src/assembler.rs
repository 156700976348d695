use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::BytesMut;
use tracing::trace;
use trigno_transport::{is_timeout, StationStream};

use crate::block::{decode_blocks, SampleMatrix};
use crate::error::{FrameError, Result};
use crate::wire::BlockLayout;

const MAX_INITIAL_CAPACITY: usize = 64 * 1024;

/// Accumulate whole sample blocks from `reader`.
///
/// Reads at most `block_size + shortfall` bytes at a time, where the
/// shortfall is what the current partial block still needs, and never lets
/// the buffer grow past `max_blocks` blocks. Reading stops when:
///
/// - `max_blocks` blocks have been accumulated,
/// - the stream ends (a read returns zero bytes), or
/// - the stream's read deadline expires.
///
/// In the last two cases an incomplete final block is completed with zero
/// bytes, exactly once. The returned buffer is therefore always a whole
/// number of blocks. `max_blocks == Some(0)` returns without reading.
pub fn assemble_blocks<R: Read>(
    reader: &mut R,
    layout: BlockLayout,
    max_blocks: Option<usize>,
) -> Result<BytesMut> {
    let block_size = layout.block_size();
    let limit = max_blocks.map(|blocks| blocks.saturating_mul(block_size));

    let capacity = limit.unwrap_or(MAX_INITIAL_CAPACITY).min(MAX_INITIAL_CAPACITY);
    let mut buf = BytesMut::with_capacity(capacity);
    if limit == Some(0) {
        return Ok(buf);
    }

    let mut chunk = vec![0u8; block_size * 2];
    let mut shortfall = 0usize;

    loop {
        let mut want = block_size + shortfall;
        if let Some(limit) = limit {
            want = want.min(limit - buf.len());
        }

        let read = match reader.read(&mut chunk[..want]) {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(&err) => {
                trace!(shortfall, "read deadline expired, closing block");
                pad_zeros(&mut buf, shortfall);
                break;
            }
            Err(err) => return Err(FrameError::Io(err)),
        };

        if read == 0 {
            trace!(shortfall, "stream ended, closing block");
            pad_zeros(&mut buf, shortfall);
            break;
        }

        buf.extend_from_slice(&chunk[..read]);

        let partial = buf.len() % block_size;
        if partial != 0 {
            shortfall = block_size - partial;
            continue;
        }
        shortfall = 0;

        if limit.is_some_and(|limit| buf.len() >= limit) {
            break;
        }
    }

    Ok(buf)
}

fn pad_zeros(buf: &mut BytesMut, count: usize) {
    buf.resize(buf.len() + count, 0);
}

/// Reads sample blocks from one data channel.
///
/// Holds no state between calls beyond the stream position: every call
/// starts on a block boundary as long as the previous call ended on one
/// (it always does unless it had to zero-pad).
pub struct SampleReader<T> {
    inner: T,
    layout: BlockLayout,
}

impl<T: Read> SampleReader<T> {
    pub fn new(inner: T, layout: BlockLayout) -> Self {
        Self { inner, layout }
    }

    /// Read up to `max_blocks` blocks (`None` = until timeout or end of
    /// stream) and decode them into a `(channels, samples)` matrix.
    pub fn read_blocks(&mut self, max_blocks: Option<usize>) -> Result<SampleMatrix> {
        let bytes = assemble_blocks(&mut self.inner, self.layout, max_blocks)?;
        let matrix = decode_blocks(&bytes, self.layout);
        trace!(
            channels = matrix.channels(),
            samples = matrix.samples(),
            "assembled sample blocks"
        );
        Ok(matrix)
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
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

impl SampleReader<StationStream> {
    /// Create a reader for a data channel and apply its read deadline.
    pub fn with_timeout(
        inner: StationStream,
        layout: BlockLayout,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        inner.set_read_timeout(timeout)?;
        Ok(Self::new(inner, layout))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;
    use crate::block::encode_block;

    fn layout(channels: usize) -> BlockLayout {
        BlockLayout::new(channels).unwrap()
    }

    fn blocks(count: usize, channels: usize) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for sample in 0..count {
            let values: Vec<f32> = (0..channels)
                .map(|channel| (sample * 100 + channel) as f32)
                .collect();
            encode_block(&values, &mut buf);
        }
        buf.to_vec()
    }

    /// Records every read request and serves the data in fixed-size pieces.
    struct ScriptedReader {
        data: Vec<u8>,
        pos: usize,
        piece: usize,
        requests: Vec<usize>,
        on_exhausted: Exhausted,
    }

    #[derive(Clone, Copy)]
    enum Exhausted {
        Eof,
        Timeout,
    }

    impl ScriptedReader {
        fn new(data: Vec<u8>, piece: usize, on_exhausted: Exhausted) -> Self {
            Self {
                data,
                pos: 0,
                piece,
                requests: Vec::new(),
                on_exhausted,
            }
        }

        fn consumed(&self) -> usize {
            self.pos
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.requests.push(buf.len());
            if self.pos >= self.data.len() {
                return match self.on_exhausted {
                    Exhausted::Eof => Ok(0),
                    Exhausted::Timeout => Err(std::io::Error::from(ErrorKind::WouldBlock)),
                };
            }
            let n = self.piece.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn unbounded_read_to_clean_end() {
        let wire = blocks(5, 3);
        let mut reader = SampleReader::new(Cursor::new(wire), layout(3));
        let matrix = reader.read_blocks(None).unwrap();

        assert_eq!(matrix.shape(), (3, 5));
        assert_eq!(matrix.channel(0).unwrap(), &[0.0, 100.0, 200.0, 300.0, 400.0]);
        assert_eq!(matrix.channel(2).unwrap(), &[2.0, 102.0, 202.0, 302.0, 402.0]);
    }

    #[test]
    fn stream_ending_mid_block_is_zero_padded() {
        let mut wire = blocks(2, 3);
        wire.extend_from_slice(&7.5f32.to_le_bytes());
        wire.extend_from_slice(&[0xAA, 0xBB]);

        let mut reader = SampleReader::new(Cursor::new(wire), layout(3));
        let matrix = reader.read_blocks(None).unwrap();

        assert_eq!(matrix.shape(), (3, 3));
        assert_eq!(matrix.get(0, 2), Some(7.5));
        let mut tail = [0u8; 4];
        tail[..2].copy_from_slice(&[0xAA, 0xBB]);
        assert_eq!(matrix.get(1, 2), Some(f32::from_le_bytes(tail)));
        assert_eq!(matrix.get(2, 2), Some(0.0));
    }

    #[test]
    fn timeout_mid_block_is_zero_padded() {
        let mut wire = blocks(1, 2);
        wire.extend_from_slice(&3.0f32.to_le_bytes());

        let mut scripted = ScriptedReader::new(wire, 3, Exhausted::Timeout);
        let bytes = assemble_blocks(&mut scripted, layout(2), None).unwrap();

        assert_eq!(bytes.len(), 16);
        let matrix = decode_blocks(&bytes, layout(2));
        assert_eq!(matrix.block(1).unwrap(), vec![3.0, 0.0]);
    }

    #[test]
    fn timeout_on_boundary_adds_nothing() {
        let mut scripted = ScriptedReader::new(blocks(4, 2), 5, Exhausted::Timeout);
        let bytes = assemble_blocks(&mut scripted, layout(2), None).unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn timeout_before_any_data_returns_empty() {
        let mut scripted = ScriptedReader::new(Vec::new(), 8, Exhausted::Timeout);
        let mut reader = SampleReader::new(&mut scripted, layout(4));
        let matrix = reader.read_blocks(None).unwrap();
        assert_eq!(matrix.shape(), (4, 0));
    }

    #[test]
    fn max_blocks_stops_without_over_read() {
        let wire = blocks(50, 4);
        let mut scripted = ScriptedReader::new(wire, 7, Exhausted::Eof);
        let bytes = assemble_blocks(&mut scripted, layout(4), Some(10)).unwrap();

        assert_eq!(bytes.len(), 10 * 16);
        assert_eq!(scripted.consumed(), 10 * 16);
    }

    #[test]
    fn read_requests_follow_shortfall() {
        let wire = blocks(3, 2);
        let mut scripted = ScriptedReader::new(wire, 5, Exhausted::Eof);
        let bytes = assemble_blocks(&mut scripted, layout(2), Some(2)).unwrap();

        assert_eq!(bytes.len(), 16);
        // Each request is block + shortfall, capped at the bytes left before the bound.
        assert_eq!(scripted.requests, vec![8, 11, 6, 1]);
    }

    #[test]
    fn zero_max_blocks_never_reads() {
        let mut scripted = ScriptedReader::new(blocks(3, 2), 8, Exhausted::Eof);
        let mut reader = SampleReader::new(&mut scripted, layout(2));
        let matrix = reader.read_blocks(Some(0)).unwrap();

        assert_eq!(matrix.shape(), (2, 0));
        drop(reader);
        assert!(scripted.requests.is_empty());
    }

    #[test]
    fn successive_reads_continue_from_stream_position() {
        let wire = blocks(6, 2);
        let mut reader = SampleReader::new(Cursor::new(wire), layout(2));

        let first = reader.read_blocks(Some(4)).unwrap();
        let rest = reader.read_blocks(None).unwrap();

        assert_eq!(first.samples(), 4);
        assert_eq!(rest.samples(), 2);
        assert_eq!(rest.get(0, 0), Some(400.0));
    }

    #[test]
    fn interrupted_read_retries() {
        struct InterruptedThenData {
            interrupted: bool,
            inner: Cursor<Vec<u8>>,
        }

        impl Read for InterruptedThenData {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.inner.read(buf)
            }
        }

        let mut reader = SampleReader::new(
            InterruptedThenData {
                interrupted: false,
                inner: Cursor::new(blocks(2, 1)),
            },
            layout(1),
        );
        assert_eq!(reader.read_blocks(None).unwrap().samples(), 2);
    }

    #[test]
    fn other_io_errors_propagate() {
        struct Reset;

        impl Read for Reset {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(ErrorKind::ConnectionReset))
            }
        }

        let mut reader = SampleReader::new(Reset, layout(1));
        let err = reader.read_blocks(None).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
    }

    #[test]
    fn reads_from_socket_until_deadline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = StationStream::connect("127.0.0.1", port, None).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let wire = blocks(8, 16);
        server.write_all(&wire).unwrap();
        server.write_all(&[1, 2, 3]).unwrap();

        let mut reader =
            SampleReader::with_timeout(stream, BlockLayout::PRIMARY, Some(Duration::from_millis(100)))
                .unwrap();
        let matrix = reader.read_blocks(None).unwrap();
        assert_eq!(matrix.shape(), (16, 9));
        assert_eq!(matrix.get(15, 7), Some(715.0));
    }
}
