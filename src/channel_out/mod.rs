//! Channel builders.
//!
//! A channel out accepts batches, compresses them, and emits the compressed
//! stream as size-bounded [crate::frame::Frame]s.

use ethers_core::types::{Block, Transaction};

use crate::{
    batch::{BatchType, SingularBatch},
    compression::{CompressorWriter, VariantCompressor},
    config::{Config, RollupConfig},
    errors::ChannelOutError,
    frame::{Frame, FRAME_V0_OVERHEAD_SIZE},
};

mod span;
pub use span::SpanChannelOut;

mod singular;
pub use singular::SingularChannelOut;

/// ChannelId is a 16-byte identifier for a channel.
pub type ChannelId = [u8; 16];

/// The hard cap on the uncompressed size of a channel.
pub const MAX_RLP_BYTES_PER_CHANNEL: usize = 10_000_000;

/// The result of adding a batch to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The batch was added. Carries the current compressed size estimate.
    Accepted(u64),
    /// The batch was the only one in the channel and its compressed size
    /// exceeds the target. It was kept and the channel is now closed.
    Oversized(u64),
}

impl AddOutcome {
    /// The compressed size reported with the outcome.
    pub fn size(&self) -> u64 {
        match self {
            Self::Accepted(size) | Self::Oversized(size) => *size,
        }
    }
}

/// The result of emitting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// More frames follow.
    More(u16),
    /// The final frame of the channel.
    Last(u16),
}

impl FrameStatus {
    /// The number of the emitted frame.
    pub fn frame_number(&self) -> u16 {
        match self {
            Self::More(n) | Self::Last(n) => *n,
        }
    }

    /// Whether the emitted frame closes the channel.
    pub fn is_last(&self) -> bool {
        matches!(self, Self::Last(_))
    }
}

/// A channel builder.
pub trait ChannelOut: std::fmt::Debug {
    /// The channel identifier.
    fn id(&self) -> ChannelId;

    /// Returns the channel to an empty, open state under a fresh id.
    fn reset(&mut self) -> Result<(), ChannelOutError>;

    /// Converts an L2 block into a batch and adds it.
    fn add_block(
        &mut self,
        config: &RollupConfig,
        block: &Block<Transaction>,
    ) -> Result<AddOutcome, ChannelOutError>;

    /// Adds a batch with its sequence number within its epoch.
    fn add_singular_batch(
        &mut self,
        batch: SingularBatch,
        seq_num: u64,
    ) -> Result<AddOutcome, ChannelOutError>;

    /// The number of batches held.
    fn batch_count(&self) -> usize;

    /// The uncompressed input size accounted for so far.
    fn input_bytes(&self) -> usize;

    /// The compressed bytes available to frame.
    fn ready_bytes(&self) -> usize;

    /// Brings the compressed output up to date with the accepted input.
    fn flush(&mut self) -> Result<(), ChannelOutError>;

    /// Returns [ChannelOutError::CompressorFull] if the channel is at its target.
    fn full_err(&self) -> Result<(), ChannelOutError>;

    /// Whether the channel has been closed.
    fn is_closed(&self) -> bool;

    /// Finalizes the compressed stream. No batches can be added afterwards.
    fn close(&mut self) -> Result<(), ChannelOutError>;

    /// Writes the next frame of at most `max_size` bytes to `w`.
    fn output_frame(
        &mut self,
        w: &mut Vec<u8>,
        max_size: u64,
    ) -> Result<FrameStatus, ChannelOutError>;
}

/// Builds the [ChannelOut] the config asks for.
pub fn new_channel_out(config: &Config) -> Result<Box<dyn ChannelOut>, ChannelOutError> {
    let rollup = &config.rollup;
    let compressor = &config.channel.compressor;
    Ok(match config.channel.batch_type {
        BatchType::Span => Box::new(
            SpanChannelOut::new(
                rollup.genesis_l2_time,
                rollup.l2_chain_id,
                compressor.target_output_size,
                VariantCompressor::from(compressor),
            )?
            .with_max_rlp_bytes_per_channel(rollup.max_rlp_bytes_per_channel),
        ),
        BatchType::Singular => Box::new(
            SingularChannelOut::new(VariantCompressor::from(compressor))?
                .with_max_rlp_bytes_per_channel(rollup.max_rlp_bytes_per_channel),
        ),
    })
}

/// The frame counter and emission shared by every [ChannelOut].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameCursor {
    /// The number of the next frame to emit.
    next: u32,
}

impl FrameCursor {
    pub(crate) fn reset(&mut self) {
        self.next = 0;
    }

    /// Reads up to one frame of data from the compressor and writes the frame.
    ///
    /// The frame is last only if the channel is closed and all ready bytes fit.
    pub(crate) fn emit<C: CompressorWriter + ?Sized>(
        &mut self,
        compressor: &mut C,
        id: ChannelId,
        ready_bytes: usize,
        closed: bool,
        w: &mut Vec<u8>,
        max_size: u64,
    ) -> Result<FrameStatus, ChannelOutError> {
        if max_size < FRAME_V0_OVERHEAD_SIZE {
            return Err(ChannelOutError::MaxFrameSizeTooSmall(max_size))
        }
        let number = u16::try_from(self.next).map_err(|_| ChannelOutError::TooManyFrames)?;

        let max_data_size = max_size - FRAME_V0_OVERHEAD_SIZE;
        let (data_len, is_last) = if max_data_size >= ready_bytes as u64 {
            (ready_bytes, closed)
        } else {
            (max_data_size as usize, false)
        };

        let mut data = vec![0u8; data_len];
        let mut read = 0;
        while read < data_len {
            let n = compressor.read(&mut data[read..])?;
            if n == 0 {
                break
            }
            read += n;
        }
        if read != data_len {
            return Err(ChannelOutError::ShortRead { expected: data_len, read })
        }

        Frame { id, number, data, is_last }.encode_into(w);
        self.next += 1;
        Ok(if is_last { FrameStatus::Last(number) } else { FrameStatus::More(number) })
    }
}
