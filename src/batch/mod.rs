//! Batch types.
//!
//! A channel's uncompressed payload is a concatenation of batch data envelopes.
//! Each envelope is an rlp byte string holding a one byte batch type followed by
//! the batch body:
//! - `0x00` for a [SingularBatch], whose body is its rlp list
//! - `0x01` for a span batch, whose body is the [RawSpanBatch] encoding

use std::{fmt, str::FromStr};

use ethers_core::utils::rlp::{self, DecoderError, Rlp};
use serde::{Deserialize, Serialize};

use crate::errors::{BatchDecodingError, ConfigError, SpanBatchError};

mod bits;
pub use bits::SpanBatchBits;

mod single;
pub use single::SingularBatch;

mod span;
pub use span::{SpanBatch, SpanBatchElement, MAX_SPAN_BATCH_ELEMENTS};

mod raw;
pub use raw::{RawSpanBatch, SpanBatchPayload, SpanBatchPrefix};

/// The singular batch type identifier.
pub const SINGULAR_BATCH_TYPE: u8 = 0x00;

/// The span batch type identifier.
pub const SPAN_BATCH_TYPE: u8 = 0x01;

/// The kind of batch a channel is built from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchType {
    /// One envelope per block.
    Singular,
    /// One span envelope for the whole channel.
    #[default]
    Span,
}

impl BatchType {
    /// Returns the wire identifier.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Singular => SINGULAR_BATCH_TYPE,
            Self::Span => SPAN_BATCH_TYPE,
        }
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singular => write!(f, "singular"),
            Self::Span => write!(f, "span"),
        }
    }
}

impl FromStr for BatchType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singular" => Ok(Self::Singular),
            "span" => Ok(Self::Span),
            other => Err(ConfigError::UnknownBatchType(other.to_string())),
        }
    }
}

/// A decoded batch data envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchData {
    /// A singular batch.
    Singular(SingularBatch),
    /// A span batch in wire form.
    Span(RawSpanBatch),
}

impl BatchData {
    /// Returns the [BatchType] of the envelope.
    pub fn batch_type(&self) -> BatchType {
        match self {
            Self::Singular(_) => BatchType::Singular,
            Self::Span(_) => BatchType::Span,
        }
    }

    /// Appends the rlp-wrapped envelope to the buffer.
    pub fn encode(&self, w: &mut Vec<u8>) -> Result<(), SpanBatchError> {
        let mut body = vec![self.batch_type().as_byte()];
        match self {
            Self::Singular(batch) => body.extend_from_slice(&rlp::encode(batch)),
            Self::Span(raw) => raw.encode(&mut body)?,
        }
        w.extend_from_slice(&rlp::encode(&body));
        Ok(())
    }

    /// Decodes one envelope from the front of the reader, advancing it.
    pub fn decode(r: &mut &[u8]) -> Result<Self, BatchDecodingError> {
        let data: &[u8] = *r;
        let item = Rlp::new(data);
        let info = item.payload_info()?;
        if info.total() > data.len() {
            return Err(DecoderError::RlpIsTooShort.into())
        }
        let body: Vec<u8> = item.as_val()?;
        *r = &data[info.total()..];

        let (batch_type, mut body) = body.split_first().ok_or(BatchDecodingError::EmptyBuffer)?;
        match *batch_type {
            SINGULAR_BATCH_TYPE => Ok(Self::Singular(rlp::decode(body)?)),
            SPAN_BATCH_TYPE => Ok(Self::Span(RawSpanBatch::decode(&mut body)?)),
            other => Err(BatchDecodingError::UnknownBatchType(other)),
        }
    }
}
