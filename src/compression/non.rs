//! A compressor that stores rather than compresses.

use flate2::Compression;

use crate::{
    compression::{Compressor, CompressorResult, CompressorWriter, ZlibCompressor},
    errors::CompressorError,
};

/// Non Compressor
///
/// Writes through a level 0 zlib stream, flushing before every write so the
/// length is always exact. Useful for testing, as output size tracks input size.
#[derive(Debug)]
pub struct NonCompressor {
    target_output_size: u64,
    compressor: ZlibCompressor,
}

impl NonCompressor {
    /// Creates a [NonCompressor] with the given target.
    pub fn new(target_output_size: u64) -> Self {
        Self { target_output_size, compressor: ZlibCompressor::with_level(Compression::none()) }
    }
}

impl CompressorWriter for NonCompressor {
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize> {
        self.compressor.flush()?;
        self.full_err()?;
        self.compressor.write(data)
    }

    fn flush(&mut self) -> CompressorResult<()> {
        self.compressor.flush()
    }

    fn close(&mut self) -> CompressorResult<()> {
        self.compressor.close()
    }

    fn reset(&mut self) {
        self.compressor.reset();
    }

    fn len(&self) -> usize {
        self.compressor.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize> {
        self.compressor.read(buf)
    }
}

impl Compressor for NonCompressor {
    fn full_err(&self) -> CompressorResult<()> {
        if self.compressor.len() as u64 >= self.target_output_size {
            return Err(CompressorError::Full)
        }
        Ok(())
    }

    fn target_output_size(&self) -> u64 {
        self.target_output_size
    }
}
