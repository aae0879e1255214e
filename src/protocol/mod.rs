//! Wire protocol for thermal frames.
//!
//! This module contains the implementations for:
//! - encoding frames to and from the textual wire format
//! - splitting an encoded frame into transport-sized chunks
//! - reassembling frames from an incoming chunk stream

pub mod chunker;
pub mod codec;
pub mod reassembly;

pub use chunker::{chunks, FrameChunks, DEFAULT_CHUNK_SIZE};
pub use codec::{decode_frame, encode_frame, DecodeError, EncodedFrame};
pub use reassembly::{FrameReassembler, ReassemblyOutcome};
