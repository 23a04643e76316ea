use thiserror::Error;

use crate::frame::FRAME_V0_OVERHEAD_SIZE;

/// Compressor Error
#[derive(Debug, Error)]
pub enum CompressorError {
    /// The target output size has been reached.
    #[error("compressor is full")]
    Full,
    /// The compression stream was already finalized.
    #[error("compressor is closed")]
    Closed,
    /// The underlying compression stream failed.
    #[error("compression stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// ChannelOut Error
#[derive(Debug, Error)]
pub enum ChannelOutError {
    /// Mutating call on a closed channel.
    #[error("channel out already closed")]
    ChannelClosed,
    /// The uncompressed channel payload would pass the hard cap.
    #[error("too many rlp bytes: {size} bytes exceeds the channel maximum of {max}")]
    TooManyRlpBytes {
        /// The size the channel payload would have grown to.
        size: usize,
        /// The hard cap.
        max: usize,
    },
    /// The target output size was reached and the last batch was not accepted.
    #[error("compressor full")]
    CompressorFull,
    /// The requested frame cannot hold the frame overhead.
    #[error(
        "max frame size {0} is smaller than the frame overhead of {} bytes",
        FRAME_V0_OVERHEAD_SIZE
    )]
    MaxFrameSizeTooSmall(u64),
    /// The compressed stream could not supply the frame data.
    #[error("short read from compressed stream: expected {expected} bytes, read {read}")]
    ShortRead {
        /// Bytes requested for the frame.
        expected: usize,
        /// Bytes actually read.
        read: usize,
    },
    /// The frame number no longer fits in the wire format.
    #[error("channel emitted more than {} frames", u16::MAX as u32 + 1)]
    TooManyFrames,
    /// The batch could not be appended to the span batch.
    #[error("failed to append batch to span batch: {0}")]
    SpanBatch(#[from] SpanBatchError),
    /// A compression stream failure.
    #[error(transparent)]
    Compressor(CompressorError),
    /// The block could not be converted into a batch.
    #[error("failed to convert block into singular batch: {0}")]
    BlockConversion(#[from] BlockConversionError),
    /// Channel id generation failed.
    #[error("failed to generate channel id: {0}")]
    IdGeneration(#[from] rand::Error),
}

impl From<CompressorError> for ChannelOutError {
    fn from(err: CompressorError) -> Self {
        match err {
            CompressorError::Full => Self::CompressorFull,
            e => Self::Compressor(e),
        }
    }
}

/// Span Batch Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpanBatchError {
    /// No batches in the span.
    #[error("empty span batch")]
    EmptySpanBatch,
    /// The span batch holds more elements than allowed.
    #[error("span batch is too big")]
    TooBigSpanBatchSize,
    /// Timestamps must not go backwards.
    #[error("batch timestamp {timestamp} is before the previous batch timestamp {previous}")]
    NonMonotonicTimestamp {
        /// The previous batch timestamp.
        previous: u64,
        /// The rejected batch timestamp.
        timestamp: u64,
    },
    /// Timestamps must not precede genesis.
    #[error("batch timestamp {timestamp} is before genesis timestamp {genesis}")]
    TimestampBeforeGenesis {
        /// The genesis timestamp.
        genesis: u64,
        /// The rejected batch timestamp.
        timestamp: u64,
    },
    /// Epochs may only stay or advance by one.
    #[error("batch epoch {epoch} does not follow previous epoch {previous}")]
    InvalidEpoch {
        /// The previous epoch number.
        previous: u64,
        /// The rejected epoch number.
        epoch: u64,
    },
    /// The bitfield does not fit the element count.
    #[error("bitfield is too long")]
    BitfieldTooLong,
    /// Decoding failure.
    #[error("span batch decoding error: {0}")]
    Decoding(#[from] SpanDecodingError),
}

/// Span Batch Decoding Error
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SpanDecodingError {
    /// Failed to decode the relative timestamp.
    #[error("failed to decode relative timestamp")]
    RelativeTimestamp,
    /// Failed to decode the L1 origin number.
    #[error("failed to decode L1 origin number")]
    L1OriginNumber,
    /// Failed to decode the parent check.
    #[error("failed to decode parent check")]
    ParentCheck,
    /// Failed to decode the L1 origin check.
    #[error("failed to decode L1 origin check")]
    L1OriginCheck,
    /// Failed to decode the block count.
    #[error("failed to decode block count")]
    BlockCount,
    /// Failed to decode the origin bits.
    #[error("failed to decode origin bits")]
    OriginBits,
    /// Failed to decode the block timestamp deltas.
    #[error("failed to decode block timestamp deltas")]
    BlockTimestamps,
    /// Failed to decode the block tx counts.
    #[error("failed to decode block tx counts")]
    BlockTxCounts,
    /// Failed to decode the transaction payloads.
    #[error("failed to decode transaction data")]
    TxData,
    /// The origin bits imply an epoch below zero.
    #[error("origin bits underflow the L1 origin number")]
    OriginUnderflow,
}

/// Batch Decoding Error
#[derive(Debug, Error)]
pub enum BatchDecodingError {
    /// Nothing to decode.
    #[error("empty batch data")]
    EmptyBuffer,
    /// The leading batch type byte is unknown.
    #[error("unknown batch type {0:#04x}")]
    UnknownBatchType(u8),
    /// The rlp envelope or singular batch list was malformed.
    #[error("rlp decoding error: {0}")]
    Rlp(#[from] ethers_core::utils::rlp::DecoderError),
    /// A span batch body was malformed.
    #[error("span batch error: {0}")]
    SpanBatch(#[from] SpanBatchError),
}

/// Frame Decoding Error
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameDecodingError {
    /// The frame data is too large.
    #[error("frame data too large: {0} bytes")]
    DataTooLarge(usize),
    /// The frame data is too short.
    #[error("frame data too short: {0} bytes")]
    DataTooShort(usize),
    /// The is_last byte was not a boolean.
    #[error("invalid is_last byte {0:#04x}")]
    InvalidIsLast(u8),
}

/// Frame Parse Error
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameParseError {
    /// A frame failed to decode.
    #[error("frame decoding error: {0}")]
    FrameDecoding(#[from] FrameDecodingError),
    /// No data to parse.
    #[error("no frames to parse")]
    NoFrames,
    /// Unsupported derivation version.
    #[error("unsupported derivation version {0}")]
    UnsupportedVersion(u8),
}

/// Block Conversion Error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockConversionError {
    /// The block has no transactions, so no L1 info deposit.
    #[error("block has no transactions")]
    EmptyBlock,
    /// The first transaction is not a deposit.
    #[error("first transaction is not a deposit transaction")]
    NotDepositTx,
    /// The L1 info calldata has the wrong length.
    #[error("invalid l1 info length: expected {expected}, got {actual}")]
    InvalidL1InfoLength {
        /// Expected calldata length.
        expected: usize,
        /// Actual calldata length.
        actual: usize,
    },
    /// The L1 info calldata has the wrong selector.
    #[error("invalid l1 info selector 0x{0}")]
    InvalidL1InfoSelector(String),
    /// A 32-byte word did not hold a u64.
    #[error("l1 info field {0} overflows u64")]
    FieldOverflow(&'static str),
}

/// Channel Reader Error
#[derive(Debug, Error)]
pub enum ReaderError {
    /// No frames were supplied.
    #[error("no frames to reassemble")]
    NoFrames,
    /// Frames from more than one channel were supplied.
    #[error("frames belong to more than one channel")]
    MixedChannels,
    /// A frame number was repeated.
    #[error("duplicate frame number {0}")]
    DuplicateFrame(u16),
    /// A frame number is missing.
    #[error("missing frame number {0}")]
    MissingFrame(u16),
    /// The channel is not terminated by a last frame.
    #[error("channel has no closing frame")]
    Unclosed,
    /// A frame follows the frame marked as last.
    #[error("frame {0} follows the last frame")]
    FrameAfterLast(u16),
    /// More frames than a channel can number.
    #[error("{0} frames exceed the channel frame limit")]
    TooManyFrames(usize),
    /// An L1 payload did not parse into frames.
    #[error("frame parse error: {0}")]
    Frames(#[from] FrameParseError),
    /// Decompression failed.
    #[error("decompression error: {0}")]
    Decompression(#[from] std::io::Error),
    /// A batch envelope failed to decode.
    #[error("batch decoding error: {0}")]
    Batch(#[from] BatchDecodingError),
}

/// Configuration Error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Target output size must be positive.
    #[error("target output size must be greater than zero")]
    ZeroTargetOutputSize,
    /// The approximate compression ratio must be positive.
    #[error("approximate compression ratio must be positive, got {0}")]
    InvalidComprRatio(f64),
    /// Frames must fit their overhead.
    #[error("max frame size {0} is smaller than the frame overhead")]
    MaxFrameSizeTooSmall(u64),
    /// Frames must stay decodable.
    #[error("max frame size {0} exceeds the largest decodable frame")]
    MaxFrameSizeTooLarge(u64),
    /// The hard cap must be positive.
    #[error("max rlp bytes per channel must be greater than zero")]
    ZeroMaxRlpBytes,
    /// An unknown compressor kind.
    #[error("unknown compressor kind: {0}")]
    UnknownCompressorKind(String),
    /// An unknown batch type.
    #[error("unknown batch type: {0}")]
    UnknownBatchType(String),
    /// Loading the layered configuration failed.
    #[error("failed to extract config: {0}")]
    Extract(String),
}
