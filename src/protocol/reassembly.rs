//! Receiver-side frame reassembly.
//!
//! Transports deliver an encoded frame as arbitrarily sized byte chunks
//! (BLE notifications do not preserve the sender's chunk boundaries as
//! message boundaries everywhere). The reassembler accumulates chunks and
//! infers frame completion from the running `,` count: a full frame
//! always carries exactly 767 interior delimiters.
//!
//! That heuristic is the whole framing scheme. A producer that changes
//! the value format, or a corrupted delimiter, desynchronizes framing;
//! the recovery is to skip the bad frame and clear, nothing stronger.

use bytes::BytesMut;

use crate::frame::{ThermalFrame, FRAME_DELIMITERS};
use crate::protocol::codec::{decode_frame, DecodeError};

/// Result of feeding one chunk to the reassembler.
#[derive(Debug, Clone, PartialEq)]
pub enum ReassemblyOutcome {
    /// More bytes are needed before a completion attempt.
    Incomplete,
    /// A full frame was decoded.
    Frame(ThermalFrame),
    /// A completion attempt failed; the frame was dropped and the buffer
    /// cleared. The viewer keeps its previous frame on screen.
    Skipped(DecodeError),
}

/// Accumulates transport chunks and emits complete frames.
///
/// One instance serves exactly one connection; it is a synchronous fold
/// over incoming bytes with no interior I/O. After every completion
/// attempt, successful or not, the buffer is empty and the delimiter
/// count is zero.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buffer: BytesMut,
    delimiter_count: usize,
}

impl FrameReassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one received chunk into the buffer.
    ///
    /// Performs a completion check after appending: once the running
    /// delimiter count reaches 767 the whole buffer is decoded, and the
    /// accumulator resets regardless of the outcome.
    pub fn on_bytes(&mut self, chunk: &[u8]) -> ReassemblyOutcome {
        self.buffer.extend_from_slice(chunk);
        self.delimiter_count += chunk.iter().filter(|&&b| b == b',').count();

        if self.delimiter_count < FRAME_DELIMITERS {
            return ReassemblyOutcome::Incomplete;
        }

        let outcome = match decode_frame(&self.buffer) {
            Ok(frame) => ReassemblyOutcome::Frame(frame),
            Err(err) => ReassemblyOutcome::Skipped(err),
        };

        self.buffer.clear();
        self.delimiter_count = 0;

        outcome
    }

    /// Number of bytes currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the accumulator is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
