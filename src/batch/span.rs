//! The span batch type.

use ethers_core::types::Bytes;

use crate::{
    batch::{RawSpanBatch, SingularBatch, SpanBatchBits, SpanBatchPayload, SpanBatchPrefix},
    errors::SpanBatchError,
};

/// The maximum number of blocks, transactions in total, or transactions per
/// block allowed in a span batch.
pub const MAX_SPAN_BATCH_ELEMENTS: u64 = 10_000_000;

/// A span batch element, a [SingularBatch] without the hashes that a span only
/// carries for its endpoints.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpanBatchElement {
    /// The epoch number of the L1 block
    pub epoch_num: u64,
    /// The timestamp of the L2 block
    pub timestamp: u64,
    /// The transactions in the L2 block
    pub transactions: Vec<Bytes>,
}

impl From<&SingularBatch> for SpanBatchElement {
    fn from(batch: &SingularBatch) -> Self {
        Self {
            epoch_num: batch.epoch_num,
            timestamp: batch.timestamp,
            transactions: batch.transactions.clone(),
        }
    }
}

/// An ordered run of [SingularBatch]es sharing a genesis timestamp and chain id.
///
/// The genesis timestamp and chain id are fixed at construction. The wire form
/// is not append-friendly, so [SpanBatch::to_raw_span_batch] re-derives it in
/// full from the held batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanBatch {
    genesis_timestamp: u64,
    chain_id: u64,
    /// Sequence number of the first batch, which decides its origin bit.
    first_seq_num: u64,
    batches: Vec<SingularBatch>,
}

impl SpanBatch {
    /// Creates an empty [SpanBatch].
    pub fn new(genesis_timestamp: u64, chain_id: u64) -> Self {
        Self { genesis_timestamp, chain_id, first_seq_num: 0, batches: Vec::new() }
    }

    /// Returns the genesis timestamp.
    pub fn genesis_timestamp(&self) -> u64 {
        self.genesis_timestamp
    }

    /// Returns the chain id.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Returns the held batches in order.
    pub fn batches(&self) -> &[SingularBatch] {
        &self.batches
    }

    /// Returns the number of held batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns true if no batches are held.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Returns the held batches as [SpanBatchElement]s.
    pub fn elements(&self) -> Vec<SpanBatchElement> {
        self.batches.iter().map(SpanBatchElement::from).collect()
    }

    /// Appends a [SingularBatch].
    ///
    /// Fails without modifying the span if the batch goes back in time, precedes
    /// genesis, or moves its epoch by anything other than zero or one.
    pub fn append_singular_batch(
        &mut self,
        batch: SingularBatch,
        seq_num: u64,
    ) -> Result<(), SpanBatchError> {
        if batch.timestamp < self.genesis_timestamp {
            return Err(SpanBatchError::TimestampBeforeGenesis {
                genesis: self.genesis_timestamp,
                timestamp: batch.timestamp,
            })
        }
        if let Some(last) = self.batches.last() {
            if batch.timestamp < last.timestamp {
                return Err(SpanBatchError::NonMonotonicTimestamp {
                    previous: last.timestamp,
                    timestamp: batch.timestamp,
                })
            }
            if batch.epoch_num != last.epoch_num && batch.epoch_num != last.epoch_num + 1 {
                return Err(SpanBatchError::InvalidEpoch {
                    previous: last.epoch_num,
                    epoch: batch.epoch_num,
                })
            }
        }
        let total_txs: usize = self.batches.iter().map(|b| b.transactions.len()).sum();
        if self.batches.len() as u64 + 1 > MAX_SPAN_BATCH_ELEMENTS ||
            (total_txs + batch.transactions.len()) as u64 > MAX_SPAN_BATCH_ELEMENTS
        {
            return Err(SpanBatchError::TooBigSpanBatchSize)
        }

        if self.batches.is_empty() {
            self.first_seq_num = seq_num;
        }
        self.batches.push(batch);
        Ok(())
    }

    /// Removes and returns the most recently appended batch.
    pub fn pop(&mut self) -> Option<SingularBatch> {
        self.batches.pop()
    }

    /// Derives the [RawSpanBatch] wire form.
    pub fn to_raw_span_batch(&self) -> Result<RawSpanBatch, SpanBatchError> {
        let first = self.batches.first().ok_or(SpanBatchError::EmptySpanBatch)?;
        let last = self.batches.last().ok_or(SpanBatchError::EmptySpanBatch)?;

        let mut parent_check = [0u8; 20];
        parent_check.copy_from_slice(&first.parent_hash.as_bytes()[..20]);
        let mut l1_origin_check = [0u8; 20];
        l1_origin_check.copy_from_slice(&last.epoch_hash.as_bytes()[..20]);

        let mut origin_bits = SpanBatchBits::with_len(self.batches.len());
        origin_bits.set_bit(0, self.first_seq_num == 0);
        for (i, pair) in self.batches.windows(2).enumerate() {
            origin_bits.set_bit(i + 1, pair[1].epoch_num > pair[0].epoch_num);
        }

        let block_timestamp_deltas =
            self.batches.windows(2).map(|pair| pair[1].timestamp - pair[0].timestamp).collect();
        let block_tx_counts = self.batches.iter().map(|b| b.transactions.len() as u64).collect();
        let txs = self.batches.iter().flat_map(|b| b.transactions.iter().cloned()).collect();

        Ok(RawSpanBatch {
            prefix: SpanBatchPrefix {
                rel_timestamp: first.timestamp - self.genesis_timestamp,
                l1_origin_num: last.epoch_num,
                parent_check,
                l1_origin_check,
            },
            payload: SpanBatchPayload {
                block_count: self.batches.len() as u64,
                origin_bits,
                block_timestamp_deltas,
                block_tx_counts,
                txs,
            },
        })
    }
}
