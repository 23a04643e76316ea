//! The [RawSpanBatch] wire form.
//!
//! ```text
//! prefix  = rel_timestamp ++ l1_origin_num ++ parent_check ++ l1_origin_check
//! payload = block_count ++ origin_bits ++ block_timestamp_deltas ++ block_tx_counts ++ txs
//! txs     = (tx_len ++ tx_bytes)*
//! ```
//!
//! Integers are unsigned varints. The checks are 20-byte hash prefixes.

use bytes::{Buf, BufMut};
use ethers_core::types::Bytes;

use crate::{
    batch::{SpanBatchBits, SpanBatchElement, MAX_SPAN_BATCH_ELEMENTS},
    errors::{SpanBatchError, SpanDecodingError},
};

/// Span batch prefix.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpanBatchPrefix {
    /// First block timestamp minus the genesis timestamp.
    pub rel_timestamp: u64,
    /// The L1 origin number of the last block.
    pub l1_origin_num: u64,
    /// First 20 bytes of the first block's parent hash.
    pub parent_check: [u8; 20],
    /// First 20 bytes of the last block's L1 origin hash.
    pub l1_origin_check: [u8; 20],
}

impl SpanBatchPrefix {
    /// Encodes the prefix into the writer.
    pub fn encode_prefix(&self, w: &mut dyn BufMut) {
        write_uvarint(w, self.rel_timestamp);
        write_uvarint(w, self.l1_origin_num);
        w.put_slice(&self.parent_check);
        w.put_slice(&self.l1_origin_check);
    }

    /// Decodes a prefix from the reader.
    pub fn decode_prefix(r: &mut &[u8]) -> Result<Self, SpanBatchError> {
        let rel_timestamp = read_uvarint(r, SpanDecodingError::RelativeTimestamp)?;
        let l1_origin_num = read_uvarint(r, SpanDecodingError::L1OriginNumber)?;
        let parent_check = read_check(r, SpanDecodingError::ParentCheck)?;
        let l1_origin_check = read_check(r, SpanDecodingError::L1OriginCheck)?;
        Ok(Self { rel_timestamp, l1_origin_num, parent_check, l1_origin_check })
    }
}

/// Span batch payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpanBatchPayload {
    /// Number of blocks in the span.
    pub block_count: u64,
    /// Bit `i` marks block `i` as the first block of a new epoch.
    pub origin_bits: SpanBatchBits,
    /// Timestamp differences between consecutive blocks.
    pub block_timestamp_deltas: Vec<u64>,
    /// Transaction count of each block.
    pub block_tx_counts: Vec<u64>,
    /// All transactions of the span, in block order.
    pub txs: Vec<Bytes>,
}

impl SpanBatchPayload {
    /// Encodes the payload into the writer.
    pub fn encode_payload(&self, w: &mut dyn BufMut) -> Result<(), SpanBatchError> {
        write_uvarint(w, self.block_count);
        self.origin_bits.encode(w, self.block_count as usize)?;
        for delta in &self.block_timestamp_deltas {
            write_uvarint(w, *delta);
        }
        for count in &self.block_tx_counts {
            write_uvarint(w, *count);
        }
        for tx in &self.txs {
            write_uvarint(w, tx.len() as u64);
            w.put_slice(tx);
        }
        Ok(())
    }

    /// Decodes a payload from the reader.
    pub fn decode_payload(r: &mut &[u8]) -> Result<Self, SpanBatchError> {
        let block_count = read_uvarint(r, SpanDecodingError::BlockCount)?;
        if block_count > MAX_SPAN_BATCH_ELEMENTS {
            return Err(SpanBatchError::TooBigSpanBatchSize)
        }
        if block_count == 0 {
            return Err(SpanBatchError::EmptySpanBatch)
        }
        let origin_bits = SpanBatchBits::decode(r, block_count as usize)?;

        let mut block_timestamp_deltas = Vec::with_capacity(block_count as usize - 1);
        for _ in 1..block_count {
            block_timestamp_deltas.push(read_uvarint(r, SpanDecodingError::BlockTimestamps)?);
        }

        let mut block_tx_counts = Vec::with_capacity(block_count as usize);
        let mut total_txs = 0u64;
        for _ in 0..block_count {
            let count = read_uvarint(r, SpanDecodingError::BlockTxCounts)?;
            total_txs = total_txs.saturating_add(count);
            if total_txs > MAX_SPAN_BATCH_ELEMENTS {
                return Err(SpanBatchError::TooBigSpanBatchSize)
            }
            block_tx_counts.push(count);
        }

        let mut txs = Vec::with_capacity(total_txs.min(r.len() as u64) as usize);
        for _ in 0..total_txs {
            let len = read_uvarint(r, SpanDecodingError::TxData)? as usize;
            if len > r.len() {
                return Err(SpanDecodingError::TxData.into())
            }
            txs.push(Bytes::from(r[..len].to_vec()));
            r.advance(len);
        }

        Ok(Self { block_count, origin_bits, block_timestamp_deltas, block_tx_counts, txs })
    }
}

/// The compact wire form of a [crate::batch::SpanBatch].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawSpanBatch {
    /// The span batch prefix
    pub prefix: SpanBatchPrefix,
    /// The span batch payload
    pub payload: SpanBatchPayload,
}

impl RawSpanBatch {
    /// Encodes the [RawSpanBatch] into a writer.
    pub fn encode(&self, w: &mut dyn BufMut) -> Result<(), SpanBatchError> {
        self.prefix.encode_prefix(w);
        self.payload.encode_payload(w)
    }

    /// Decodes a [RawSpanBatch] from a reader.
    pub fn decode(r: &mut &[u8]) -> Result<Self, SpanBatchError> {
        let prefix = SpanBatchPrefix::decode_prefix(r)?;
        let payload = SpanBatchPayload::decode_payload(r)?;
        Ok(Self { prefix, payload })
    }

    /// Expands the raw form back into ordered [SpanBatchElement]s.
    pub fn derive(&self, genesis_timestamp: u64) -> Result<Vec<SpanBatchElement>, SpanBatchError> {
        let count = self.payload.block_count as usize;
        if count == 0 {
            return Err(SpanBatchError::EmptySpanBatch)
        }
        if self.payload.block_timestamp_deltas.len() != count - 1 ||
            self.payload.block_tx_counts.len() != count
        {
            return Err(SpanDecodingError::BlockCount.into())
        }
        let total_txs: u64 = self.payload.block_tx_counts.iter().sum();
        if total_txs != self.payload.txs.len() as u64 {
            return Err(SpanDecodingError::TxData.into())
        }

        // Walk backwards from the last origin, stepping down at each set bit.
        let mut epochs = vec![0u64; count];
        let mut epoch = self.prefix.l1_origin_num;
        for i in (0..count).rev() {
            epochs[i] = epoch;
            let bit = self
                .payload
                .origin_bits
                .get_bit(i)
                .ok_or(SpanBatchError::Decoding(SpanDecodingError::OriginBits))?;
            if bit && i > 0 {
                epoch = epoch.checked_sub(1).ok_or(SpanDecodingError::OriginUnderflow)?;
            }
        }

        let mut timestamp = genesis_timestamp
            .checked_add(self.prefix.rel_timestamp)
            .ok_or(SpanDecodingError::RelativeTimestamp)?;
        let mut txs = self.payload.txs.iter();
        let mut elements = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                timestamp = timestamp
                    .checked_add(self.payload.block_timestamp_deltas[i - 1])
                    .ok_or(SpanDecodingError::BlockTimestamps)?;
            }
            let transactions =
                txs.by_ref().take(self.payload.block_tx_counts[i] as usize).cloned().collect();
            elements.push(SpanBatchElement { epoch_num: epochs[i], timestamp, transactions });
        }
        Ok(elements)
    }
}

fn write_uvarint(w: &mut dyn BufMut, value: u64) {
    let mut buf = unsigned_varint::encode::u64_buffer();
    w.put_slice(unsigned_varint::encode::u64(value, &mut buf));
}

fn read_uvarint(r: &mut &[u8], err: SpanDecodingError) -> Result<u64, SpanBatchError> {
    let (value, remaining) = unsigned_varint::decode::u64(r).map_err(|_| err)?;
    *r = remaining;
    Ok(value)
}

fn read_check(r: &mut &[u8], err: SpanDecodingError) -> Result<[u8; 20], SpanBatchError> {
    if r.len() < 20 {
        return Err(err.into())
    }
    let mut check = [0u8; 20];
    check.copy_from_slice(&r[..20]);
    r.advance(20);
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{SingularBatch, SpanBatch};
    use ethers_core::types::H256;

    fn span() -> SpanBatch {
        let mut span = SpanBatch::new(1_000, 901);
        let specs = [(10u64, 1_002u64, 2usize), (10, 1_004, 0), (11, 1_004, 3), (12, 1_010, 1)];
        for (i, (epoch_num, timestamp, txs)) in specs.into_iter().enumerate() {
            let batch = SingularBatch {
                parent_hash: H256::repeat_byte(0x11),
                epoch_num,
                epoch_hash: H256::repeat_byte(epoch_num as u8),
                timestamp,
                transactions: (0..txs).map(|t| Bytes::from(vec![i as u8; t + 1])).collect(),
            };
            span.append_singular_batch(batch, if i == 0 { 4 } else { 0 }).unwrap();
        }
        span
    }

    #[test]
    fn test_encode_decode_derive() {
        let span = span();
        let raw = span.to_raw_span_batch().unwrap();
        let mut buf = Vec::new();
        raw.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        let decoded = RawSpanBatch::decode(&mut slice).unwrap();
        assert!(slice.is_empty());
        assert_eq!(decoded, raw);
        assert_eq!(decoded.derive(span.genesis_timestamp()).unwrap(), span.elements());
    }

    #[test]
    fn test_first_origin_bit_follows_sequence_number() {
        let raw = span().to_raw_span_batch().unwrap();
        assert_eq!(raw.payload.origin_bits.get_bit(0), Some(false));
    }

    #[test]
    fn test_decode_truncated_tx() {
        let raw = span().to_raw_span_batch().unwrap();
        let mut buf = Vec::new();
        raw.encode(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);
        let err = RawSpanBatch::decode(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err, SpanBatchError::Decoding(SpanDecodingError::TxData));
    }

    #[test]
    fn test_decode_empty_block_count() {
        let mut buf = Vec::new();
        SpanBatchPrefix::default().encode_prefix(&mut buf);
        buf.push(0);
        let err = RawSpanBatch::decode(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err, SpanBatchError::EmptySpanBatch);
    }

    #[test]
    fn test_derive_origin_underflow() {
        let mut raw = span().to_raw_span_batch().unwrap();
        raw.prefix.l1_origin_num = 0;
        let err = raw.derive(1_000).unwrap_err();
        assert_eq!(err, SpanBatchError::Decoding(SpanDecodingError::OriginUnderflow));
    }
}
