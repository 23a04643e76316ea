//! The shadow compressor.

use tracing::trace;

use crate::{
    compression::{Compressor, CompressorResult, CompressorWriter, ZlibCompressor},
    errors::CompressorError,
};

/// The largest potential blow-up in bytes we expect to see when compressing
/// arbitrary (e.g. random) data. Accounts for a 2 byte header, 4 byte digest,
/// 5 byte eof indicator, and a 5 byte flate block header for each 16k of data
/// in a 128k frame: 2+4+5+(5*8) = 51 bytes.
pub const SAFE_COMPRESSION_OVERHEAD: u64 = 51;

/// The number of final bytes closing a zlib stream writes.
pub const CLOSE_OVERHEAD_ZLIB: u64 = 9;

/// Shadow Compressor
///
/// Keeps two zlib streams over the same input. The shadow is flushed whenever
/// the cheap upper bound crosses the target, giving an exact size to check
/// against, while the real stream is never flushed and so always ends up
/// smaller than the shadow.
///
/// The first write is admitted even when it alone exceeds the target. Such a
/// block is split across multiple frames.
#[derive(Debug)]
pub struct ShadowCompressor {
    target_output_size: u64,
    compressor: ZlibCompressor,
    shadow: ZlibCompressor,
    /// Sticky once the target is reached.
    is_full: bool,
    /// An upper bound on the size of the compressed data.
    bound: u64,
}

impl ShadowCompressor {
    /// Creates a [ShadowCompressor] with the given target.
    pub fn new(target_output_size: u64) -> Self {
        Self {
            target_output_size,
            compressor: ZlibCompressor::new(),
            shadow: ZlibCompressor::new(),
            is_full: false,
            bound: SAFE_COMPRESSION_OVERHEAD,
        }
    }

    /// The current upper bound on the compressed size.
    pub fn bound(&self) -> u64 {
        self.bound
    }
}

impl CompressorWriter for ShadowCompressor {
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize> {
        if self.is_full {
            return Err(CompressorError::Full)
        }
        self.shadow.write(data)?;

        let mut new_bound = self.bound + data.len() as u64;
        if new_bound > self.target_output_size {
            self.shadow.flush()?;
            new_bound = self.shadow.len() as u64 + CLOSE_OVERHEAD_ZLIB;
            if new_bound > self.target_output_size {
                trace!(
                    target: "spanout::compression",
                    "shadow bound {} passed target {}",
                    new_bound,
                    self.target_output_size
                );
                self.is_full = true;
                if self.compressor.total_in() > 0 {
                    return Err(CompressorError::Full)
                }
            }
        }

        self.bound = new_bound;
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
        self.shadow.reset();
        self.is_full = false;
        self.bound = SAFE_COMPRESSION_OVERHEAD;
    }

    fn len(&self) -> usize {
        self.compressor.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize> {
        self.compressor.read(buf)
    }
}

impl Compressor for ShadowCompressor {
    fn full_err(&self) -> CompressorResult<()> {
        if self.is_full {
            return Err(CompressorError::Full)
        }
        Ok(())
    }

    fn target_output_size(&self) -> u64 {
        self.target_output_size
    }
}
