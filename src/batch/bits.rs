//! Span batch bitlist.

use bytes::{Buf, BufMut};

use crate::errors::{SpanBatchError, SpanDecodingError};

/// The maximum number of bytes a bitlist may occupy.
pub const MAX_SPAN_BATCH_BITS_BYTES: usize = 10_000_000 / 8 + 1;

/// A big-endian bitlist.
///
/// Bit `0` is the least significant bit of the last byte, so the encoded form
/// reads like a big-endian integer of `ceil(n / 8)` bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpanBatchBits(Vec<u8>);

impl SpanBatchBits {
    /// Creates a zeroed bitlist able to hold `bit_length` bits.
    pub fn with_len(bit_length: usize) -> Self {
        Self(vec![0; bytes_for(bit_length)])
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the bit at `index`, or `None` if it is out of range.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        let byte_index = index / 8;
        if byte_index >= self.0.len() {
            return None;
        }
        let byte = self.0[self.0.len() - 1 - byte_index];
        Some(byte & (1 << (index % 8)) != 0)
    }

    /// Sets the bit at `index`, growing the list at the front if needed.
    pub fn set_bit(&mut self, index: usize, value: bool) {
        let byte_index = index / 8;
        if byte_index >= self.0.len() {
            let grow = byte_index + 1 - self.0.len();
            self.0.splice(0..0, std::iter::repeat(0).take(grow));
        }
        let len = self.0.len();
        let byte = &mut self.0[len - 1 - byte_index];
        if value {
            *byte |= 1 << (index % 8);
        } else {
            *byte &= !(1 << (index % 8));
        }
    }

    /// Encodes `bit_length` bits into the writer, left-padding with zero bytes.
    pub fn encode(&self, w: &mut dyn BufMut, bit_length: usize) -> Result<(), SpanBatchError> {
        let size = bytes_for(bit_length);
        if self.0.len() > size {
            return Err(SpanBatchError::BitfieldTooLong);
        }
        w.put_bytes(0, size - self.0.len());
        w.put_slice(&self.0);
        Ok(())
    }

    /// Decodes a bitlist of `bit_length` bits from the reader.
    pub fn decode(r: &mut &[u8], bit_length: usize) -> Result<Self, SpanBatchError> {
        let size = bytes_for(bit_length);
        if size > MAX_SPAN_BATCH_BITS_BYTES {
            return Err(SpanBatchError::TooBigSpanBatchSize);
        }
        if r.len() < size {
            return Err(SpanDecodingError::OriginBits.into());
        }
        let bits = r[..size].to_vec();
        r.advance(size);
        // Bits above `bit_length` must be unset.
        let list = Self(bits);
        if bit_length % 8 != 0 {
            if let Some(first) = list.0.first() {
                if first >> (bit_length % 8) != 0 {
                    return Err(SpanBatchError::BitfieldTooLong);
                }
            }
        }
        Ok(list)
    }
}

fn bytes_for(bit_length: usize) -> usize {
    (bit_length + 7) / 8
}
