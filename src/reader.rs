//! Reading channels back out of frames.

use std::io::Read;

use crate::{batch::BatchData, errors::ReaderError, frame::Frame};

/// The most frames a channel can hold, one per frame number.
pub const MAX_CHANNEL_FRAMES: usize = u16::MAX as usize + 1;

/// Reassembles the compressed channel data from the frames of one channel.
///
/// Frames may arrive in any order but must form the contiguous run
/// `0..=last` with only the final frame marked as last.
pub fn reassemble(mut frames: Vec<Frame>) -> Result<Vec<u8>, ReaderError> {
    let id = frames.first().ok_or(ReaderError::NoFrames)?.id;
    if frames.len() > MAX_CHANNEL_FRAMES {
        return Err(ReaderError::TooManyFrames(frames.len()))
    }
    if frames.iter().any(|f| f.id != id) {
        return Err(ReaderError::MixedChannels)
    }
    frames.sort_by_key(|f| f.number);

    let last_index = frames.len() - 1;
    let mut data = Vec::new();
    for (expected, frame) in (0..=u16::MAX).zip(frames.iter()) {
        if frame.number < expected {
            return Err(ReaderError::DuplicateFrame(frame.number))
        }
        if frame.number > expected {
            return Err(ReaderError::MissingFrame(expected))
        }
        data.extend_from_slice(&frame.data);
        if frame.is_last && frame.number as usize != last_index {
            return Err(ReaderError::FrameAfterLast(frame.number.saturating_add(1)))
        }
    }
    match frames.last() {
        Some(last) if last.is_last => Ok(data),
        _ => Err(ReaderError::Unclosed),
    }
}

/// Inflates zlib-compressed channel data.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, ReaderError> {
    let mut decoder = libflate::zlib::Decoder::new(data)?;
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Decodes every batch envelope in the decompressed channel data.
pub fn decode_batches(mut data: &[u8]) -> Result<Vec<BatchData>, ReaderError> {
    let mut batches = Vec::new();
    while !data.is_empty() {
        batches.push(BatchData::decode(&mut data)?);
    }
    Ok(batches)
}

/// Parses, reassembles, decompresses, and decodes a channel's L1 payloads.
pub fn read_channel<'a>(
    payloads: impl IntoIterator<Item = &'a [u8]>,
) -> Result<Vec<BatchData>, ReaderError> {
    let mut frames = Vec::new();
    for payload in payloads {
        frames.extend(Frame::parse_frames(payload)?);
    }
    decode_batches(&decompress(&reassemble(frames)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(number: u16, data: &[u8], is_last: bool) -> Frame {
        Frame { id: [7; 16], number, data: data.to_vec(), is_last }
    }

    #[test]
    fn test_reassemble_out_of_order() {
        let frames = vec![frame(2, b"c", true), frame(0, b"a", false), frame(1, b"b", false)];
        assert_eq!(reassemble(frames).unwrap(), b"abc");
    }

    #[test]
    fn test_reassemble_errors() {
        assert!(matches!(reassemble(vec![]), Err(ReaderError::NoFrames)));
        assert!(matches!(
            reassemble(vec![frame(0, b"a", false), frame(2, b"c", true)]),
            Err(ReaderError::MissingFrame(1))
        ));
        assert!(matches!(
            reassemble(vec![frame(0, b"a", false), frame(0, b"a", true)]),
            Err(ReaderError::DuplicateFrame(0))
        ));
        assert!(matches!(
            reassemble(vec![frame(0, b"a", false), frame(1, b"b", false)]),
            Err(ReaderError::Unclosed)
        ));
        assert!(matches!(
            reassemble(vec![frame(0, b"a", true), frame(1, b"b", true)]),
            Err(ReaderError::FrameAfterLast(1))
        ));
        let mut other = frame(1, b"b", true);
        other.id = [8; 16];
        assert!(matches!(
            reassemble(vec![frame(0, b"a", false), other]),
            Err(ReaderError::MixedChannels)
        ));
    }

    #[test]
    fn test_reassemble_full_frame_range() {
        let mut frames: Vec<_> = (0..=u16::MAX).map(|n| frame(n, b"", n == u16::MAX)).collect();
        frames[0].data = b"a".to_vec();
        assert_eq!(reassemble(frames.clone()).unwrap(), b"a");

        frames.push(frame(u16::MAX, b"", true));
        assert!(matches!(
            reassemble(frames),
            Err(ReaderError::TooManyFrames(n)) if n == MAX_CHANNEL_FRAMES + 1
        ));
    }

    #[test]
    fn test_reassemble_last_frame_before_the_end() {
        let frames: Vec<_> = (0..=u16::MAX).map(|n| frame(n, b"", n >= u16::MAX - 1)).collect();
        assert!(matches!(
            reassemble(frames),
            Err(ReaderError::FrameAfterLast(n)) if n == u16::MAX
        ));
    }

    #[test]
    fn test_decompress_garbage() {
        let err = decompress(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, ReaderError::Decompression(_)));
    }
}
