//! Frame Types

use bytes::BufMut;

use crate::{
    channel_out::ChannelId,
    errors::{FrameDecodingError, FrameParseError},
};

/// The version of the derivation pipeline.
pub const DERIVATION_VERSION_0: u8 = 0;

/// The fixed per-frame overhead: id, frame number, data length, and is_last.
pub const FRAME_V0_OVERHEAD_SIZE: u64 = 16 + 2 + 4 + 1;

/// Frames cannot be larger than 1MB.
///
/// Data transactions that carry frames are generally not larger than 128 KB due to L1 network
/// conditions, but we leave space to grow larger anyway (gas limit allows for more data).
pub const MAX_FRAME_LEN: usize = 1_000_000;

/// A channel frame is a segment of a channel's data.
///
/// *Encoding*
/// frame = `channel_id ++ frame_number ++ frame_data_length ++ frame_data ++ is_last`
/// * channel_id        = bytes16
/// * frame_number      = uint16
/// * frame_data_length = uint32
/// * frame_data        = bytes
/// * is_last           = bool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// The channel the frame belongs to.
    pub id: ChannelId,
    /// The number of the frame within its channel.
    pub number: u16,
    /// The data within the frame.
    pub data: Vec<u8>,
    /// Whether or not the frame is the last in the channel.
    pub is_last: bool,
}

impl Frame {
    /// Writes the encoded frame into the writer.
    pub fn encode_into(&self, w: &mut dyn BufMut) {
        w.put_slice(&self.id);
        w.put_u16(self.number);
        w.put_u32(self.data.len() as u32);
        w.put_slice(&self.data);
        w.put_u8(self.is_last as u8);
    }

    /// Encode the frame into a byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(self.size());
        self.encode_into(&mut encoded);
        encoded
    }

    /// Decode a frame from the front of a byte slice, returning the number of bytes consumed.
    pub fn decode(encoded: &[u8]) -> Result<(usize, Self), FrameDecodingError> {
        const BASE_FRAME_LEN: usize = FRAME_V0_OVERHEAD_SIZE as usize;

        if encoded.len() < BASE_FRAME_LEN {
            return Err(FrameDecodingError::DataTooShort(encoded.len()))
        }

        let mut id = ChannelId::default();
        id.copy_from_slice(&encoded[..16]);
        let number = u16::from_be_bytes([encoded[16], encoded[17]]);
        let data_len =
            u32::from_be_bytes([encoded[18], encoded[19], encoded[20], encoded[21]]) as usize;

        if data_len > MAX_FRAME_LEN || data_len > encoded.len() - BASE_FRAME_LEN {
            return Err(FrameDecodingError::DataTooLarge(data_len))
        }

        let data = encoded[22..22 + data_len].to_vec();
        let is_last = match encoded[22 + data_len] {
            0 => false,
            1 => true,
            other => return Err(FrameDecodingError::InvalidIsLast(other)),
        };
        Ok((BASE_FRAME_LEN + data_len, Self { id, number, data, is_last }))
    }

    /// Parse the on chain serialization of frame(s) in an L1 transaction.
    ///
    /// Only version 0 of the serialization format is supported:
    /// `data = DERIVATION_VERSION_0 ++ Frame(s)`, with at least one frame and no
    /// trailing data.
    pub fn parse_frames(encoded: &[u8]) -> Result<Vec<Self>, FrameParseError> {
        let (version, mut data) = encoded.split_first().ok_or(FrameParseError::NoFrames)?;
        if *version != DERIVATION_VERSION_0 {
            return Err(FrameParseError::UnsupportedVersion(*version))
        }
        if data.is_empty() {
            return Err(FrameParseError::NoFrames)
        }

        let mut frames = Vec::new();
        while !data.is_empty() {
            let (consumed, frame) = Self::decode(data)?;
            frames.push(frame);
            data = &data[consumed..];
        }
        Ok(frames)
    }

    /// The encoded size of the frame.
    pub fn size(&self) -> usize {
        self.data.len() + FRAME_V0_OVERHEAD_SIZE as usize
    }
}
