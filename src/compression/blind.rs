//! The blind compressor.

use tracing::trace;

use crate::{
    compression::{Compressor, CompressorResult, CompressorWriter, ZlibCompressor},
    errors::CompressorError,
};

/// Blind Compressor
///
/// Holds input back in a side buffer and only compresses once the buffered
/// input plus the compressed output could reach the target. The size is only
/// known after a flush, so [CompressorWriter::flush] must be called before
/// trusting [Compressor::full_err].
#[derive(Debug)]
pub struct BlindCompressor {
    target_output_size: u64,
    compressor: ZlibCompressor,
    pending: Vec<u8>,
}

impl BlindCompressor {
    /// Creates a [BlindCompressor] with the given target.
    pub fn new(target_output_size: u64) -> Self {
        Self { target_output_size, compressor: ZlibCompressor::new(), pending: Vec::new() }
    }

    /// The number of input bytes not yet handed to the zlib stream.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn write_pending(&mut self) -> CompressorResult<()> {
        if !self.pending.is_empty() {
            self.compressor.write(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }
}

impl CompressorWriter for BlindCompressor {
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize> {
        self.compressor.flush()?;
        if ((self.pending.len() + data.len() + self.compressor.len()) as u64) <
            self.target_output_size
        {
            self.pending.extend_from_slice(data);
            return Ok(data.len())
        }
        self.full_err()?;
        trace!(
            target: "spanout::compression",
            "compressing {} pending bytes",
            self.pending.len() + data.len()
        );
        self.pending.extend_from_slice(data);
        self.write_pending()?;
        self.compressor.flush()?;
        Ok(data.len())
    }

    fn flush(&mut self) -> CompressorResult<()> {
        self.write_pending()?;
        self.compressor.flush()
    }

    fn close(&mut self) -> CompressorResult<()> {
        self.write_pending()?;
        self.compressor.close()
    }

    fn reset(&mut self) {
        self.compressor.reset();
        self.pending.clear();
    }

    fn len(&self) -> usize {
        self.compressor.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize> {
        self.compressor.read(buf)
    }
}

impl Compressor for BlindCompressor {
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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};
    use std::io::Read;

    #[test]
    fn test_buffers_below_target() {
        let mut c = BlindCompressor::new(1_000);
        c.write(&[3u8; 100]).unwrap();
        assert_eq!(c.pending(), 100);
        assert_eq!(c.len(), 0);
        c.flush().unwrap();
        assert_eq!(c.pending(), 0);
        assert!(c.len() > 0);
    }

    #[test]
    fn test_no_input_lost() {
        let mut c = BlindCompressor::new(50);
        let mut input = Vec::new();
        for i in 0..10u8 {
            let chunk = vec![i; 20];
            if c.write(&chunk).is_err() {
                break
            }
            input.extend(chunk);
        }
        c.close().unwrap();
        let mut compressed = vec![0u8; c.len()];
        c.read(&mut compressed).unwrap();

        let mut decoded = Vec::new();
        libflate::zlib::Decoder::new(&compressed[..]).unwrap().read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_full_after_flush() {
        let mut c = BlindCompressor::new(100);
        let mut data = vec![0u8; 200];
        StdRng::seed_from_u64(3).fill_bytes(&mut data);
        c.write(&data).unwrap();
        c.flush().unwrap();
        assert!(matches!(c.full_err(), Err(CompressorError::Full)));
        assert!(matches!(c.write(&data), Err(CompressorError::Full)));
        c.reset();
        assert!(c.full_err().is_ok());
        assert_eq!(c.pending(), 0);
    }
}
