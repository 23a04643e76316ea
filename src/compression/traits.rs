//! The compressor traits.

use crate::errors::CompressorError;

/// A result type for compressor operations.
pub type CompressorResult<T> = Result<T, CompressorError>;

/// Compressor Writer
///
/// A raw compression stream. Extends the standard `Write` shape with
/// the close, reset, and read-back operations a channel needs.
#[allow(clippy::len_without_is_empty)]
pub trait CompressorWriter {
    /// Writes the given data to the compressor.
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize>;

    /// Flushes buffered input through to the output.
    fn flush(&mut self) -> CompressorResult<()>;

    /// Finalizes the stream.
    fn close(&mut self) -> CompressorResult<()>;

    /// Discards all state, returning the compressor to an empty stream.
    fn reset(&mut self);

    /// Returns the number of compressed bytes available to read.
    fn len(&self) -> usize;

    /// Reads compressed data into the given buffer, draining it from the stream.
    /// Returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize>;
}

/// Compressor
///
/// A [CompressorWriter] that decides when it is full.
pub trait Compressor: CompressorWriter {
    /// Returns [CompressorError::Full] if the compressor will not accept more input.
    fn full_err(&self) -> CompressorResult<()>;

    /// The compressed size the compressor aims for.
    fn target_output_size(&self) -> u64;
}
