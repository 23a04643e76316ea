use ethers_core::types::{Block, Transaction};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::trace;

use crate::{
    batch::{BatchData, SingularBatch},
    block::block_to_singular_batch,
    channel_out::{
        AddOutcome, ChannelId, ChannelOut, FrameCursor, FrameStatus, MAX_RLP_BYTES_PER_CHANNEL,
    },
    compression::{Compressor, VariantCompressor},
    config::RollupConfig,
    errors::ChannelOutError,
};

/// A channel holding one singular batch envelope per block.
///
/// Envelopes are streamed straight into the compressor, which decides on its
/// own when the channel is full. Frames can be emitted before the channel is
/// closed.
#[derive(Debug)]
pub struct SingularChannelOut<C = VariantCompressor, R = StdRng> {
    id: ChannelId,
    cursor: FrameCursor,
    /// Uncompressed bytes written so far.
    rlp_length: usize,
    max_rlp_bytes: usize,
    batch_count: usize,
    compressor: C,
    closed: bool,
    rng: R,
}

impl<C: Compressor> SingularChannelOut<C, StdRng> {
    /// Creates a channel with an entropy-seeded id.
    pub fn new(compressor: C) -> Result<Self, ChannelOutError> {
        Self::with_rng(compressor, StdRng::from_entropy())
    }
}

impl<C: Compressor, R: RngCore> SingularChannelOut<C, R> {
    /// Creates a channel drawing ids from the given rng.
    pub fn with_rng(mut compressor: C, mut rng: R) -> Result<Self, ChannelOutError> {
        let mut id = ChannelId::default();
        rng.try_fill_bytes(&mut id)?;
        compressor.reset();
        Ok(Self {
            id,
            cursor: FrameCursor::default(),
            rlp_length: 0,
            max_rlp_bytes: MAX_RLP_BYTES_PER_CHANNEL,
            batch_count: 0,
            compressor,
            closed: false,
            rng,
        })
    }

    /// Overrides the hard cap on the uncompressed channel size.
    pub fn with_max_rlp_bytes_per_channel(mut self, max_rlp_bytes: usize) -> Self {
        self.max_rlp_bytes = max_rlp_bytes;
        self
    }

    /// Adds a batch as its own envelope. The sequence number is unused.
    pub fn add_singular_batch(
        &mut self,
        batch: SingularBatch,
        _seq_num: u64,
    ) -> Result<AddOutcome, ChannelOutError> {
        if self.closed {
            return Err(ChannelOutError::ChannelClosed)
        }

        let mut buf = Vec::new();
        BatchData::Singular(batch).encode(&mut buf)?;
        let size = self.rlp_length + buf.len();
        if size > self.max_rlp_bytes {
            return Err(ChannelOutError::TooManyRlpBytes { size, max: self.max_rlp_bytes })
        }

        let written = self.compressor.write(&buf)?;
        self.rlp_length += written;
        self.batch_count += 1;
        trace!(target: "spanout::channel", "wrote {} byte singular batch", written);
        Ok(AddOutcome::Accepted(written as u64))
    }

    /// Converts a block and adds it.
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
        self.rlp_length = 0;
        self.batch_count = 0;
        self.compressor.reset();
        self.rng.try_fill_bytes(&mut self.id)?;
        Ok(())
    }
}

impl<C, R> ChannelOut for SingularChannelOut<C, R>
where
    C: Compressor + std::fmt::Debug,
    R: RngCore + std::fmt::Debug,
{
    fn id(&self) -> ChannelId {
        self.id
    }

    fn reset(&mut self) -> Result<(), ChannelOutError> {
        SingularChannelOut::reset(self)
    }

    fn add_block(
        &mut self,
        config: &RollupConfig,
        block: &Block<Transaction>,
    ) -> Result<AddOutcome, ChannelOutError> {
        SingularChannelOut::add_block(self, config, block)
    }

    fn add_singular_batch(
        &mut self,
        batch: SingularBatch,
        seq_num: u64,
    ) -> Result<AddOutcome, ChannelOutError> {
        SingularChannelOut::add_singular_batch(self, batch, seq_num)
    }

    fn batch_count(&self) -> usize {
        self.batch_count
    }

    fn input_bytes(&self) -> usize {
        self.rlp_length
    }

    fn ready_bytes(&self) -> usize {
        self.compressor.len()
    }

    fn flush(&mut self) -> Result<(), ChannelOutError> {
        Ok(self.compressor.flush()?)
    }

    fn full_err(&self) -> Result<(), ChannelOutError> {
        Ok(self.compressor.full_err()?)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> Result<(), ChannelOutError> {
        if self.closed {
            return Err(ChannelOutError::ChannelClosed)
        }
        self.closed = true;
        Ok(self.compressor.close()?)
    }

    fn output_frame(
        &mut self,
        w: &mut Vec<u8>,
        max_size: u64,
    ) -> Result<FrameStatus, ChannelOutError> {
        let ready_bytes = self.compressor.len();
        self.cursor.emit(&mut self.compressor, self.id, ready_bytes, self.closed, w, max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compression::{CompressorConfig, CompressorKind, NonCompressor, ShadowCompressor},
        frame::Frame,
        reader::{decode_batches, decompress, reassemble},
        test_utils::random_singular_batches,
    };

    #[test]
    fn test_frames_decode_to_batches() {
        let compressor = ShadowCompressor::new(100_000);
        let mut co = SingularChannelOut::with_rng(compressor, StdRng::seed_from_u64(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let batches = random_singular_batches(&mut rng, 5, 3, 100);
        for batch in batches.iter().cloned() {
            co.add_singular_batch(batch, 0).unwrap();
        }
        assert_eq!(co.batch_count(), 5);
        co.close().unwrap();

        let mut frames = Vec::new();
        loop {
            let mut buf = Vec::new();
            let status = co.output_frame(&mut buf, 200).unwrap();
            frames.push(Frame::decode(&buf).unwrap().1);
            if status.is_last() {
                break
            }
        }
        let data = decompress(&reassemble(frames).unwrap()).unwrap();
        let decoded = decode_batches(&data).unwrap();
        let expected: Vec<_> = batches.into_iter().map(BatchData::Singular).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_full_compressor_rejects_batch() {
        let mut co = SingularChannelOut::new(NonCompressor::new(200)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut result = Ok(AddOutcome::Accepted(0));
        for batch in random_singular_batches(&mut rng, 10, 2, 100) {
            result = co.add_singular_batch(batch, 0);
            if result.is_err() {
                break
            }
        }
        assert!(matches!(result, Err(ChannelOutError::CompressorFull)));
        assert!(matches!(co.full_err(), Err(ChannelOutError::CompressorFull)));
    }

    #[test]
    fn test_cap_leaves_channel_unchanged() {
        let config = CompressorConfig { kind: CompressorKind::Ratio, ..Default::default() };
        let mut co = SingularChannelOut::new(VariantCompressor::from(&config))
            .unwrap()
            .with_max_rlp_bytes_per_channel(10);
        let mut rng = StdRng::seed_from_u64(4);
        let batch = random_singular_batches(&mut rng, 1, 1, 100).remove(0);
        let err = co.add_singular_batch(batch, 0).unwrap_err();
        assert!(matches!(err, ChannelOutError::TooManyRlpBytes { max: 10, .. }));
        assert_eq!(co.input_bytes(), 0);
        assert_eq!(co.batch_count(), 0);
    }
}
