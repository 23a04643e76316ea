//! The ratio compressor.

use crate::{
    compression::{Compressor, CompressorResult, CompressorWriter, ZlibCompressor},
    errors::CompressorError,
};

/// Ratio Compressor
///
/// Estimates the compressed size from the input size and an assumed
/// compression ratio. May overshoot the target if the ratio is optimistic.
#[derive(Debug)]
pub struct RatioCompressor {
    target_output_size: u64,
    approx_compr_ratio: f64,
    input_bytes: u64,
    compressor: ZlibCompressor,
}

impl RatioCompressor {
    /// Creates a [RatioCompressor].
    pub fn new(target_output_size: u64, approx_compr_ratio: f64) -> Self {
        Self {
            target_output_size,
            approx_compr_ratio,
            input_bytes: 0,
            compressor: ZlibCompressor::new(),
        }
    }

    /// The input size at which the compressor considers itself full.
    pub fn input_threshold(&self) -> u64 {
        (self.target_output_size as f64 / self.approx_compr_ratio) as u64
    }

    /// The number of input bytes accepted since the last reset.
    pub fn input_bytes(&self) -> u64 {
        self.input_bytes
    }
}

impl CompressorWriter for RatioCompressor {
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize> {
        self.full_err()?;
        let n = self.compressor.write(data)?;
        self.input_bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> CompressorResult<()> {
        self.compressor.flush()
    }

    fn close(&mut self) -> CompressorResult<()> {
        self.compressor.close()
    }

    fn reset(&mut self) {
        self.compressor.reset();
        self.input_bytes = 0;
    }

    fn len(&self) -> usize {
        self.compressor.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize> {
        self.compressor.read(buf)
    }
}

impl Compressor for RatioCompressor {
    fn full_err(&self) -> CompressorResult<()> {
        if self.input_bytes >= self.input_threshold() {
            return Err(CompressorError::Full)
        }
        Ok(())
    }

    fn target_output_size(&self) -> u64 {
        self.target_output_size
    }
}
