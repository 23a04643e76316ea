//! The zlib stream every strategy compresses with.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

use crate::{
    compression::{CompressorResult, CompressorWriter},
    errors::CompressorError,
};

/// A zlib [CompressorWriter] backed by a growable buffer.
///
/// Only flushed output is guaranteed to show up in [CompressorWriter::len].
#[derive(Debug)]
pub struct ZlibCompressor {
    level: Compression,
    encoder: ZlibEncoder<Vec<u8>>,
    /// Offset of the first unread byte in the encoder's output.
    read_pos: usize,
    closed: bool,
}

impl ZlibCompressor {
    /// Creates a compressor at the best compression level.
    pub fn new() -> Self {
        Self::with_level(Compression::best())
    }

    /// Creates a compressor at the given level.
    pub fn with_level(level: Compression) -> Self {
        Self { level, encoder: ZlibEncoder::new(Vec::new(), level), read_pos: 0, closed: false }
    }

    /// Total number of input bytes accepted since the last reset.
    pub fn total_in(&self) -> u64 {
        self.encoder.total_in()
    }

    /// Whether the stream has been finalized.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for ZlibCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressorWriter for ZlibCompressor {
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize> {
        if self.closed {
            return Err(CompressorError::Closed)
        }
        self.encoder.write_all(data)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> CompressorResult<()> {
        if self.closed {
            return Ok(())
        }
        self.encoder.flush()?;
        Ok(())
    }

    fn close(&mut self) -> CompressorResult<()> {
        if !self.closed {
            self.encoder.try_finish()?;
            self.closed = true;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.encoder = ZlibEncoder::new(Vec::new(), self.level);
        self.read_pos = 0;
        self.closed = false;
    }

    fn len(&self) -> usize {
        self.encoder.get_ref().len() - self.read_pos
    }

    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize> {
        // The encoder only ever appends, so read bytes are skipped, never moved.
        let unread = &self.encoder.get_ref()[self.read_pos..];
        let n = buf.len().min(unread.len());
        buf[..n].copy_from_slice(&unread[..n]);
        self.read_pos += n;
        Ok(n)
    }
}
