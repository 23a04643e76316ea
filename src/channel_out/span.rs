use ethers_core::types::{Block, Transaction};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::{
    batch::{BatchData, SingularBatch, SpanBatch},
    block::block_to_singular_batch,
    channel_out::{
        AddOutcome, ChannelId, ChannelOut, FrameCursor, FrameStatus, MAX_RLP_BYTES_PER_CHANNEL,
    },
    compression::{CompressorWriter, ZlibCompressor},
    config::RollupConfig,
    errors::ChannelOutError,
};

/// A channel holding a single span batch.
///
/// The span batch encoding is not append-friendly, so every added batch
/// re-encodes the whole span into the inactive half of a double buffer and
/// flips to it. The previous encoding stays intact in the other half, which
/// is how the last batch is taken back out when it pushes the compressed
/// size over the target.
///
/// Compression is skipped while the compressed size plus the uncompressed
/// growth since the last compression stays under the target. No frames can
/// be emitted until the channel is closed.
#[derive(Debug)]
pub struct SpanChannelOut<C = ZlibCompressor, R = StdRng> {
    id: ChannelId,
    cursor: FrameCursor,
    /// Double buffer of span batch envelopes, indexed by `active`.
    rlp: [Vec<u8>; 2],
    active: usize,
    /// Uncompressed length of the buffer last written to the compressor.
    last_compressed_rlp_size: usize,
    compressor: C,
    target: u64,
    max_rlp_bytes: usize,
    closed: bool,
    span_batch: SpanBatch,
    rng: R,
}

impl<C: CompressorWriter> SpanChannelOut<C, StdRng> {
    /// Creates a channel with an entropy-seeded id.
    pub fn new(
        genesis_timestamp: u64,
        chain_id: u64,
        target_output_size: u64,
        compressor: C,
    ) -> Result<Self, ChannelOutError> {
        Self::with_rng(
            genesis_timestamp,
            chain_id,
            target_output_size,
            compressor,
            StdRng::from_entropy(),
        )
    }
}

impl<C: CompressorWriter, R: RngCore> SpanChannelOut<C, R> {
    /// Creates a channel drawing ids from the given rng.
    pub fn with_rng(
        genesis_timestamp: u64,
        chain_id: u64,
        target_output_size: u64,
        mut compressor: C,
        mut rng: R,
    ) -> Result<Self, ChannelOutError> {
        let mut id = ChannelId::default();
        rng.try_fill_bytes(&mut id)?;
        compressor.reset();
        Ok(Self {
            id,
            cursor: FrameCursor::default(),
            rlp: [Vec::new(), Vec::new()],
            active: 0,
            last_compressed_rlp_size: 0,
            compressor,
            target: target_output_size,
            max_rlp_bytes: MAX_RLP_BYTES_PER_CHANNEL,
            closed: false,
            span_batch: SpanBatch::new(genesis_timestamp, chain_id),
            rng,
        })
    }

    /// Overrides the hard cap on the uncompressed channel size.
    pub fn with_max_rlp_bytes_per_channel(mut self, max_rlp_bytes: usize) -> Self {
        self.max_rlp_bytes = max_rlp_bytes;
        self
    }

    /// The span batch built so far.
    pub fn span_batch(&self) -> &SpanBatch {
        &self.span_batch
    }

    /// The target compressed size.
    pub fn target(&self) -> u64 {
        self.target
    }

    fn active_rlp(&self) -> &[u8] {
        &self.rlp[self.active]
    }

    fn switch_rlp(&mut self) {
        self.active = (self.active + 1) % 2;
    }

    /// Undoes an append that was not accepted.
    fn revert_append(&mut self) {
        self.switch_rlp();
        self.span_batch.pop();
    }

    /// Recompresses the active buffer from scratch.
    fn fresh_compress(&mut self) -> Result<(), ChannelOutError> {
        self.compressor.reset();
        self.compressor.write(&self.rlp[self.active])?;
        self.compressor.flush()?;
        self.last_compressed_rlp_size = self.rlp[self.active].len();
        Ok(())
    }

    /// Adds a batch to the span.
    ///
    /// Returns [AddOutcome::Oversized] if this is the first batch and it alone
    /// compresses past the target; the channel is closed in that case. Fails
    /// with [ChannelOutError::CompressorFull] if a later batch pushes the
    /// compressed size past the target; the batch is dropped and the channel
    /// is closed holding the previous batches.
    pub fn add_singular_batch(
        &mut self,
        batch: SingularBatch,
        seq_num: u64,
    ) -> Result<AddOutcome, ChannelOutError> {
        if self.closed {
            return Err(ChannelOutError::ChannelClosed)
        }

        self.span_batch.append_singular_batch(batch, seq_num)?;
        let raw = match self.span_batch.to_raw_span_batch() {
            Ok(raw) => raw,
            Err(e) => {
                self.span_batch.pop();
                return Err(e.into())
            }
        };

        self.switch_rlp();
        self.rlp[self.active].clear();
        if let Err(e) = BatchData::Span(raw).encode(&mut self.rlp[self.active]) {
            self.revert_append();
            return Err(e.into())
        }

        let size = self.active_rlp().len();
        if size > self.max_rlp_bytes {
            self.revert_append();
            return Err(ChannelOutError::TooManyRlpBytes { size, max: self.max_rlp_bytes })
        }

        let growth = size.saturating_sub(self.last_compressed_rlp_size);
        let estimate = (self.compressor.len() + growth) as u64;
        if estimate < self.target {
            trace!(
                target: "spanout::channel",
                "batch {} accepted without compressing, estimate {} bytes",
                self.span_batch.len(),
                estimate
            );
            return Ok(AddOutcome::Accepted(estimate))
        }

        self.fresh_compress()?;
        let compressed = self.compressor.len() as u64;
        debug!(
            target: "spanout::channel",
            "compressed {} rlp bytes into {} bytes",
            size,
            compressed
        );

        if compressed <= self.target {
            return Ok(AddOutcome::Accepted(compressed))
        }

        if self.span_batch.len() == 1 {
            self.close()?;
            let len = self.compressor.len() as u64;
            debug!(
                target: "spanout::channel",
                "single batch of {} bytes exceeds target {}, closing",
                len,
                self.target
            );
            return Ok(AddOutcome::Oversized(len))
        }

        self.revert_append();
        self.fresh_compress()?;
        self.close()?;
        debug!(
            target: "spanout::channel",
            "rolled back last batch, closing with {} batches in {} bytes",
            self.span_batch.len(),
            self.compressor.len()
        );
        Err(ChannelOutError::CompressorFull)
    }

    /// Converts a block and adds it with its L1 info sequence number.
    pub fn add_block(
        &mut self,
        config: &RollupConfig,
        block: &Block<Transaction>,
    ) -> Result<AddOutcome, ChannelOutError> {
        if self.closed {
            return Err(ChannelOutError::ChannelClosed)
        }
        let (batch, l1_info) = block_to_singular_batch(config, block)?;
        self.add_singular_batch(batch, l1_info.sequence_number)
    }

    /// Empties the channel and draws a new id.
    pub fn reset(&mut self) -> Result<(), ChannelOutError> {
        self.closed = false;
        self.cursor.reset();
        self.rlp[0].clear();
        self.rlp[1].clear();
        self.active = 0;
        self.last_compressed_rlp_size = 0;
        self.compressor.reset();
        self.span_batch =
            SpanBatch::new(self.span_batch.genesis_timestamp(), self.span_batch.chain_id());
        self.rng.try_fill_bytes(&mut self.id)?;
        Ok(())
    }

    /// The uncompressed size of the last compressed span encoding.
    pub fn input_bytes(&self) -> usize {
        self.last_compressed_rlp_size
    }

    /// The compressed bytes left to frame. Zero until the channel is closed.
    pub fn ready_bytes(&self) -> usize {
        if self.closed {
            self.compressor.len()
        } else {
            0
        }
    }

    /// Recompresses if batches were accepted without compressing.
    pub fn flush(&mut self) -> Result<(), ChannelOutError> {
        if self.last_compressed_rlp_size != self.active_rlp().len() {
            self.fresh_compress()?;
        }
        Ok(())
    }

    /// Fails with [ChannelOutError::CompressorFull] once the compressed size reaches the target.
    pub fn full_err(&self) -> Result<(), ChannelOutError> {
        if self.compressor.len() as u64 >= self.target {
            return Err(ChannelOutError::CompressorFull)
        }
        Ok(())
    }

    /// Closes the channel, finalizing the compressed stream.
    pub fn close(&mut self) -> Result<(), ChannelOutError> {
        if self.closed {
            return Err(ChannelOutError::ChannelClosed)
        }
        self.flush()?;
        self.closed = true;
        self.compressor.close()?;
        Ok(())
    }

    /// Writes the next frame. See [ChannelOut::output_frame].
    pub fn output_frame(
        &mut self,
        w: &mut Vec<u8>,
        max_size: u64,
    ) -> Result<FrameStatus, ChannelOutError> {
        let ready_bytes = self.ready_bytes();
        self.cursor.emit(&mut self.compressor, self.id, ready_bytes, self.closed, w, max_size)
    }
}

impl<C, R> ChannelOut for SpanChannelOut<C, R>
where
    C: CompressorWriter + std::fmt::Debug,
    R: RngCore + std::fmt::Debug,
{
    fn id(&self) -> ChannelId {
        self.id
    }

    fn reset(&mut self) -> Result<(), ChannelOutError> {
        SpanChannelOut::reset(self)
    }

    fn add_block(
        &mut self,
        config: &RollupConfig,
        block: &Block<Transaction>,
    ) -> Result<AddOutcome, ChannelOutError> {
        SpanChannelOut::add_block(self, config, block)
    }

    fn add_singular_batch(
        &mut self,
        batch: SingularBatch,
        seq_num: u64,
    ) -> Result<AddOutcome, ChannelOutError> {
        SpanChannelOut::add_singular_batch(self, batch, seq_num)
    }

    fn batch_count(&self) -> usize {
        self.span_batch.len()
    }

    fn input_bytes(&self) -> usize {
        SpanChannelOut::input_bytes(self)
    }

    fn ready_bytes(&self) -> usize {
        SpanChannelOut::ready_bytes(self)
    }

    fn flush(&mut self) -> Result<(), ChannelOutError> {
        SpanChannelOut::flush(self)
    }

    fn full_err(&self) -> Result<(), ChannelOutError> {
        SpanChannelOut::full_err(self)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> Result<(), ChannelOutError> {
        SpanChannelOut::close(self)
    }

    fn output_frame(
        &mut self,
        w: &mut Vec<u8>,
        max_size: u64,
    ) -> Result<FrameStatus, ChannelOutError> {
        SpanChannelOut::output_frame(self, w, max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{random_singular_batch, random_singular_batches, seq_num};
    use tracing_test::traced_test;

    fn channel(target: u64) -> SpanChannelOut {
        SpanChannelOut::with_rng(0, 10, target, ZlibCompressor::new(), StdRng::seed_from_u64(1))
            .unwrap()
    }

    #[test]
    fn test_closed_channel_rejects_batches() {
        let mut co = channel(100_000);
        co.close().unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let err = co.add_singular_batch(random_singular_batch(&mut rng, 2, 10), 0).unwrap_err();
        assert!(matches!(err, ChannelOutError::ChannelClosed));
        assert!(matches!(co.close(), Err(ChannelOutError::ChannelClosed)));
    }

    #[test]
    fn test_ready_bytes_zero_until_closed() {
        let mut co = channel(100_000);
        let mut rng = StdRng::seed_from_u64(3);
        co.add_singular_batch(random_singular_batch(&mut rng, 4, 1), 0).unwrap();
        assert_eq!(co.ready_bytes(), 0);
        assert_eq!(co.input_bytes(), 0);
        co.close().unwrap();
        assert!(co.ready_bytes() > 0);
        assert_eq!(co.input_bytes(), co.active_rlp().len());
    }

    #[test]
    fn test_flush_only_when_stale() {
        let mut co = channel(100_000);
        let mut rng = StdRng::seed_from_u64(4);
        co.add_singular_batch(random_singular_batch(&mut rng, 4, 1), 0).unwrap();
        co.flush().unwrap();
        let flushed = co.compressor.len();
        assert!(flushed > 0);
        co.flush().unwrap();
        assert_eq!(co.compressor.len(), flushed);
    }

    #[test]
    fn test_reset_draws_new_id() {
        let mut co = channel(100_000);
        let id = co.id;
        let mut rng = StdRng::seed_from_u64(5);
        co.add_singular_batch(random_singular_batch(&mut rng, 4, 1), 0).unwrap();
        co.close().unwrap();
        co.reset().unwrap();
        assert_ne!(co.id, id);
        assert!(co.span_batch().is_empty());
        assert_eq!(co.ready_bytes(), 0);
        assert_eq!(co.input_bytes(), 0);
        assert_eq!(co.span_batch().genesis_timestamp(), 0);
        assert_eq!(co.span_batch().chain_id(), 10);
    }

    #[test]
    fn test_full_err_after_target() {
        let mut co = channel(50);
        let mut rng = StdRng::seed_from_u64(6);
        let outcome = co.add_singular_batch(random_singular_batch(&mut rng, 8, 1), 0).unwrap();
        assert!(matches!(outcome, AddOutcome::Oversized(_)));
        assert!(matches!(co.full_err(), Err(ChannelOutError::CompressorFull)));
    }

    #[test]
    #[traced_test]
    fn test_rollback_is_logged() {
        let mut co = channel(1_000);
        let mut rng = StdRng::seed_from_u64(7);
        let mut result = Ok(AddOutcome::Accepted(0));
        for batch in random_singular_batches(&mut rng, 20, 1, 100) {
            let seq = seq_num(&batch);
            result = co.add_singular_batch(batch, seq);
            if result.is_err() {
                break
            }
        }
        assert!(matches!(result, Err(ChannelOutError::CompressorFull)));
        assert!(logs_contain("rolled back last batch"));
        assert!(co.is_closed());
    }
}
