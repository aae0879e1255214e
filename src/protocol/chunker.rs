//! Frame chunking.
//!
//! Transports impose a maximum payload size per send (200 bytes for the
//! camera's BLE notify characteristic). The chunker splits an encoded
//! frame into ordered, non-overlapping slices that respect that bound.

use bytes::Bytes;

use crate::protocol::codec::EncodedFrame;

/// Default maximum chunk size, matching the camera firmware's BLE limit.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Split an encoded frame into chunks of at most `max_size` bytes.
///
/// The returned iterator is lazy and finite: chunks come out in wire
/// order, none is empty, and their concatenation is exactly the encoded
/// frame. Chunking the same encoding again yields the same sequence.
///
/// # Panics
///
/// Panics if `max_size` is zero.
pub fn chunks(encoded: &EncodedFrame, max_size: usize) -> FrameChunks {
    assert!(max_size > 0, "chunk size must be nonzero");
    FrameChunks {
        remaining: encoded.bytes(),
        max_size,
    }
}

/// Iterator over the chunks of an encoded frame.
///
/// Created by [`chunks`]. Yields cheap shared slices of the encoding.
#[derive(Debug, Clone)]
pub struct FrameChunks {
    remaining: Bytes,
    max_size: usize,
}

impl Iterator for FrameChunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining.is_empty() {
            return None;
        }
        let take = self.max_size.min(self.remaining.len());
        Some(self.remaining.split_to(take))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.remaining.len() + self.max_size - 1) / self.max_size;
        (n, Some(n))
    }
}

impl ExactSizeIterator for FrameChunks {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ThermalFrame;
    use crate::protocol::codec::encode_frame;
    use proptest::prelude::*;

    fn sample_encoding() -> EncodedFrame {
        encode_frame(&ThermalFrame::filled(23.5))
    }

    #[test]
    fn test_chunks_cover_encoding_in_order() {
        let encoded = sample_encoding();
        let rejoined: Vec<u8> = chunks(&encoded, DEFAULT_CHUNK_SIZE)
            .flat_map(|c| c.to_vec())
            .collect();

        assert_eq!(rejoined, encoded.as_bytes());
    }

    #[test]
    fn test_chunks_respect_bound() {
        let encoded = sample_encoding();
        for chunk in chunks(&encoded, 7) {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= 7);
        }
    }

    #[test]
    fn test_single_chunk_when_bound_exceeds_length() {
        let encoded = sample_encoding();
        let all: Vec<_> = chunks(&encoded, encoded.len() + 100).collect();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0], encoded.as_bytes());
    }

    #[test]
    fn test_chunk_size_one() {
        let encoded = sample_encoding();
        let all: Vec<_> = chunks(&encoded, 1).collect();

        assert_eq!(all.len(), encoded.len());
        assert!(all.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_rechunking_is_deterministic() {
        let encoded = sample_encoding();
        let first: Vec<_> = chunks(&encoded, 33).collect();
        let second: Vec<_> = chunks(&encoded, 33).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_exact_size_hint() {
        let encoded = sample_encoding();
        let iter = chunks(&encoded, DEFAULT_CHUNK_SIZE);
        let expected = (encoded.len() + DEFAULT_CHUNK_SIZE - 1) / DEFAULT_CHUNK_SIZE;

        assert_eq!(iter.len(), expected);
        assert_eq!(iter.count(), expected);
    }

    #[test]
    #[should_panic(expected = "chunk size must be nonzero")]
    fn test_zero_chunk_size_panics() {
        let encoded = sample_encoding();
        let _ = chunks(&encoded, 0);
    }

    proptest! {
        #[test]
        fn prop_concatenation_is_identity(max_size in 1usize..600) {
            let encoded = sample_encoding();
            let rejoined: Vec<u8> = chunks(&encoded, max_size)
                .flat_map(|c| c.to_vec())
                .collect();

            prop_assert_eq!(rejoined, encoded.as_bytes());
        }
    }
}
