//! Textual frame codec.
//!
//! Wire format: the 768 temperatures rendered with fixed two-decimal
//! precision, joined with `,`, terminated by a single `\n`. ASCII/UTF-8
//! throughout; no header, no length prefix, no checksum.

use bytes::Bytes;
use thiserror::Error;

use crate::frame::{ThermalFrame, FRAME_PIXELS};

/// Why a buffer failed to decode as a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer is not valid UTF-8 text.
    #[error("buffer is not valid UTF-8 text")]
    Encoding,

    /// A token could not be parsed as a number.
    #[error("malformed token: {token:?}")]
    MalformedToken {
        /// The offending token.
        token: String,
    },

    /// The buffer did not contain exactly 768 values.
    #[error("expected 768 values, got {count}")]
    WrongArity {
        /// The number of tokens found.
        count: usize,
    },
}

/// A frame rendered into its wire representation.
///
/// Logically immutable once produced; chunking it (see
/// [`chunks`](crate::protocol::chunker::chunks)) only hands out cheap
/// slices of the shared buffer, so re-chunking the same encoding is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: Bytes,
}

impl EncodedFrame {
    pub(crate) fn from_bytes(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// The encoded bytes, including the trailing newline.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the encoded bytes.
    pub(crate) fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Length of the encoding in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the encoding is empty. Never true for an encoded frame.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for EncodedFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encode a frame into its wire representation.
///
/// Deterministic: equal frames always produce identical bytes. The
/// output contains exactly 767 interior commas and one trailing newline.
pub fn encode_frame(frame: &ThermalFrame) -> EncodedFrame {
    use std::fmt::Write;

    // "-xx.xx," per value is the common case; reserve accordingly.
    let mut out = String::with_capacity(FRAME_PIXELS * 7);
    for (i, value) in frame.values().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Two decimal places, matching the camera firmware's precision.
        let _ = write!(out, "{value:.2}");
    }
    out.push('\n');
    EncodedFrame::from_bytes(Bytes::from(out))
}

/// Decode a wire buffer back into a frame.
///
/// Tolerates a trailing `\n` or `\r\n` and surrounding whitespace, as
/// produced by line-oriented serial links.
///
/// # Errors
///
/// - [`DecodeError::Encoding`] if the buffer is not valid UTF-8.
/// - [`DecodeError::MalformedToken`] if any token fails to parse.
/// - [`DecodeError::WrongArity`] unless exactly 768 values are present.
pub fn decode_frame(bytes: &[u8]) -> Result<ThermalFrame, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Encoding)?;
    let text = text.trim();

    let mut values = Vec::with_capacity(FRAME_PIXELS);
    for token in text.split(',') {
        let token = token.trim();
        let value: f32 = token.parse().map_err(|_| DecodeError::MalformedToken {
            token: token.to_string(),
        })?;
        values.push(value);
    }

    if values.len() != FRAME_PIXELS {
        return Err(DecodeError::WrongArity {
            count: values.len(),
        });
    }

    // Arity was just checked; construction cannot fail.
    ThermalFrame::new(values).map_err(|_| DecodeError::WrongArity { count: FRAME_PIXELS })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ramp_frame() -> ThermalFrame {
        ThermalFrame::new((0..FRAME_PIXELS).map(|i| i as f32 * 0.05).collect()).unwrap()
    }

    #[test]
    fn test_encode_shape() {
        let encoded = encode_frame(&ThermalFrame::filled(0.0));
        let bytes = encoded.as_bytes();

        assert_eq!(bytes.iter().filter(|&&b| b == b',').count(), 767);
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert!(bytes.starts_with(b"0.00,0.00,"));
    }

    #[test]
    fn test_encode_fixed_precision() {
        let mut values = vec![0.0; FRAME_PIXELS];
        values[0] = 31.456;
        values[1] = -2.5;
        let encoded = encode_frame(&ThermalFrame::new(values).unwrap());
        let text = std::str::from_utf8(encoded.as_bytes()).unwrap();

        assert!(text.starts_with("31.46,-2.50,0.00,"));
    }

    #[test]
    fn test_roundtrip() {
        let frame = ramp_frame();
        let decoded = decode_frame(encode_frame(&frame).as_bytes()).unwrap();

        for (original, decoded) in frame.values().iter().zip(decoded.values()) {
            assert!((original - decoded).abs() < 0.005 + 1e-4);
        }
    }

    #[test]
    fn test_decode_tolerates_crlf() {
        let frame = ThermalFrame::filled(25.0);
        let mut line = encode_frame(&frame).as_bytes().to_vec();
        line.pop();
        line.extend_from_slice(b"\r\n");

        assert_eq!(decode_frame(&line).unwrap(), frame);
    }

    #[test]
    fn test_decode_wrong_arity() {
        assert_eq!(
            decode_frame(b"1.00,2.00,3.00\n"),
            Err(DecodeError::WrongArity { count: 3 })
        );

        let too_many: String = vec!["1.00"; FRAME_PIXELS + 1].join(",");
        assert_eq!(
            decode_frame(too_many.as_bytes()),
            Err(DecodeError::WrongArity {
                count: FRAME_PIXELS + 1
            })
        );
    }

    #[test]
    fn test_decode_malformed_token() {
        let mut line: String = vec!["1.00"; FRAME_PIXELS - 1].join(",");
        line.push_str(",garbage\n");

        assert_eq!(
            decode_frame(line.as_bytes()),
            Err(DecodeError::MalformedToken {
                token: "garbage".to_string()
            })
        );
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut bytes = encode_frame(&ThermalFrame::filled(1.0)).as_bytes().to_vec();
        bytes[10] = 0xFF;
        bytes[11] = 0xFE;

        assert_eq!(decode_frame(&bytes), Err(DecodeError::Encoding));
    }

    #[test]
    fn test_decode_empty() {
        // An empty buffer splits into one empty token.
        assert!(matches!(
            decode_frame(b""),
            Err(DecodeError::MalformedToken { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_two_decimals(values in proptest::collection::vec(-40.0f32..300.0, FRAME_PIXELS)) {
            let frame = ThermalFrame::new(values).unwrap();
            let decoded = decode_frame(encode_frame(&frame).as_bytes()).unwrap();

            for (original, decoded) in frame.values().iter().zip(decoded.values()) {
                // Fixed two-decimal rendering loses at most half a hundredth.
                prop_assert!((original - decoded).abs() <= 0.005 + 1e-3);
            }
        }
    }
}
