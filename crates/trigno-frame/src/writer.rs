use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::block::encode_block;
use crate::error::{FrameError, Result};
use crate::wire::BlockLayout;

/// Writes sample blocks to any `Write` stream.
///
/// A block that could only be partly written before the stream's write
/// deadline expired stays pending; [`BlockWriter::drain`] resumes it, so the
/// stream never carries a torn block unless the caller abandons it.
pub struct BlockWriter<T> {
    inner: T,
    layout: BlockLayout,
    buf: BytesMut,
    offset: usize,
    blocks: u64,
}

impl<T: Write> BlockWriter<T> {
    pub fn new(inner: T, layout: BlockLayout) -> Self {
        Self {
            inner,
            layout,
            buf: BytesMut::with_capacity(layout.block_size()),
            offset: 0,
            blocks: 0,
        }
    }

    /// Encode and send one block (blocking).
    ///
    /// Any pending remainder of the previous block is written first.
    pub fn write_block(&mut self, values: &[f32]) -> Result<()> {
        if values.len() != self.layout.channels() {
            return Err(FrameError::BlockWidth {
                expected: self.layout.channels(),
                actual: values.len(),
            });
        }

        if self.pending() > 0 {
            self.drain()?;
        }

        self.buf.clear();
        self.offset = 0;
        encode_block(values, &mut self.buf);
        self.drain()
    }

    /// Write whatever is left of the current block.
    ///
    /// On a write timeout the remaining bytes stay pending and the timeout is
    /// returned as `FrameError::Io`.
    pub fn drain(&mut self) -> Result<()> {
        let completing = self.pending() > 0;
        while self.offset < self.buf.len() {
            match self.inner.write(&self.buf[self.offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => self.offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        if completing {
            self.blocks += 1;
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Bytes of the current block not yet accepted by the stream.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Blocks fully accepted by the stream so far, including resumed ones.
    pub fn blocks_written(&self) -> u64 {
        self.blocks
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::block::decode_blocks;

    #[test]
    fn writes_blocks_back_to_back() {
        let layout = BlockLayout::new(2).unwrap();
        let mut writer = BlockWriter::new(Cursor::new(Vec::<u8>::new()), layout);

        writer.write_block(&[1.0, 2.0]).unwrap();
        writer.write_block(&[3.0, 4.0]).unwrap();

        let wire = writer.into_inner().into_inner();
        let matrix = decode_blocks(&wire, layout);
        assert_eq!(matrix.channel(0).unwrap(), &[1.0, 3.0]);
        assert_eq!(matrix.channel(1).unwrap(), &[2.0, 4.0]);
    }

    #[test]
    fn rejects_wrong_width() {
        let layout = BlockLayout::new(3).unwrap();
        let mut writer = BlockWriter::new(Cursor::new(Vec::<u8>::new()), layout);
        let err = writer.write_block(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BlockWidth {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn timeout_keeps_remainder_pending() {
        let layout = BlockLayout::new(2).unwrap();
        let sink = StallingWriter {
            written: Vec::new(),
            budget: 3,
        };
        let mut writer = BlockWriter::new(sink, layout);

        let err = writer.write_block(&[1.0, 2.0]).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(writer.pending(), 5);

        assert_eq!(writer.blocks_written(), 0);

        writer.inner.budget = usize::MAX;
        writer.drain().unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.blocks_written(), 1);

        // Nothing left to resume, so a second drain counts nothing.
        writer.drain().unwrap();
        assert_eq!(writer.blocks_written(), 1);

        let matrix = decode_blocks(&writer.get_ref().written, layout);
        assert_eq!(matrix.block(0).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn block_completed_by_a_resume_is_counted_once() {
        let layout = BlockLayout::new(1).unwrap();
        let sink = StallingWriter {
            written: Vec::new(),
            budget: 2,
        };
        let mut writer = BlockWriter::new(sink, layout);

        // First block torn after two bytes.
        assert!(writer.write_block(&[1.0]).unwrap_err().is_timeout());

        // The resume finishes the first block, then the second one tears.
        writer.inner.budget = 3;
        assert!(writer.write_block(&[2.0]).unwrap_err().is_timeout());
        assert_eq!(writer.blocks_written(), 1);
        assert_eq!(writer.pending(), 3);

        writer.inner.budget = usize::MAX;
        writer.write_block(&[3.0]).unwrap();
        assert_eq!(writer.blocks_written(), 3);
        assert_eq!(writer.get_ref().written.len(), 3 * layout.block_size());
    }

    #[test]
    fn closed_stream_reported() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = BlockWriter::new(Closed, BlockLayout::new(1).unwrap());
        assert!(matches!(
            writer.write_block(&[0.5]),
            Err(FrameError::ConnectionClosed)
        ));
    }

    /// Accepts `budget` bytes, then reports a write timeout.
    struct StallingWriter {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for StallingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget == 0 {
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
