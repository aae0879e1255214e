//! Producer-side transport abstraction.
//!
//! The streamer is generic over the physical channel: a serial line, an
//! in-memory loopback, or (on the camera itself) a BLE notify
//! characteristic. All the streamer asks of a link is "wait for a peer,
//! push ordered chunks, tell me when the peer is gone".

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub mod channel;
pub mod serial;

pub use channel::ChannelLink;
pub use serial::{SerialConfig, SerialLink, SerialReceiver, DEFAULT_BAUD_RATE};

/// One side of a reliable, ordered byte channel carrying frame chunks.
///
/// Chunks sent while a peer is attached arrive in order and intact; the
/// link does not promise that send boundaries survive as message
/// boundaries on the far side (the reassembler never assumes they do).
#[async_trait]
pub trait FrameLink: Send {
    /// Block until a peer is attached and the link is ready to carry
    /// chunks. For a serial line this opens the port; for BLE this is
    /// the advertise/accept cycle.
    async fn wait_for_peer(&mut self) -> Result<()>;

    /// Send one chunk to the peer.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionLost`](crate::Error::ConnectionLost) when the
    /// peer has gone away; the streamer treats that as an expected
    /// lifecycle event and re-advertises.
    async fn send(&mut self, chunk: Bytes) -> Result<()>;

    /// Whether a peer is currently attached.
    async fn peer_connected(&self) -> bool;
}
