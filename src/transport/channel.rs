//! In-memory loopback link.
//!
//! Carries chunks over a `tokio::sync::mpsc` channel. Used by the test
//! suite and the loopback demo to exercise the full producer pipeline
//! without hardware; dropping the receiving half is how a peer
//! "disconnects".

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::FrameLink;

/// Producer half of an in-memory frame link.
pub struct ChannelLink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelLink {
    /// Create a connected link pair: the producer half and the stream of
    /// chunks the consumer will see.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FrameLink for ChannelLink {
    async fn wait_for_peer(&mut self) -> Result<()> {
        if self.tx.is_closed() {
            return Err(Error::ConnectionLost);
        }
        Ok(())
    }

    async fn send(&mut self, chunk: Bytes) -> Result<()> {
        self.tx
            .send(chunk)
            .await
            .map_err(|_| Error::ConnectionLost)
    }

    async fn peer_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let (mut link, mut rx) = ChannelLink::pair(8);

        link.wait_for_peer().await.unwrap();
        link.send(Bytes::from_static(b"first")).await.unwrap();
        link.send(Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_connection_lost() {
        let (mut link, rx) = ChannelLink::pair(8);
        drop(rx);

        assert!(!link.peer_connected().await);
        assert!(matches!(
            link.send(Bytes::from_static(b"x")).await,
            Err(Error::ConnectionLost)
        ));
        assert!(matches!(
            link.wait_for_peer().await,
            Err(Error::ConnectionLost)
        ));
    }
}
