//! Serial transport.
//!
//! The serial variant of the link: same textual frame format as BLE,
//! one frame per line, at a fixed baud rate. Both sides live here — the
//! producer's [`SerialLink`] and the consumer's [`SerialReceiver`] with
//! its reconnect-forever policy. Port I/O is blocking under the hood
//! and is pushed onto the blocking thread pool.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::ThermalFrame;
use crate::protocol::reassembly::{FrameReassembler, ReassemblyOutcome};
use crate::transport::FrameLink;

/// Default baud rate for the camera's serial link.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial link settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Blocking read timeout; reads that expire are treated as "no data
    /// yet", not as link loss.
    pub read_timeout: Duration,
    /// Fixed delay before reopening a lost port.
    pub reconnect_delay: Duration,
}

impl SerialConfig {
    /// Settings for a port at the default baud rate.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(500),
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

async fn open_port(config: SerialConfig) -> Result<SharedPort> {
    let port = task::spawn_blocking(move || {
        serialport::new(config.path.as_str(), config.baud_rate)
            .timeout(config.read_timeout)
            .open()
    })
    .await
    .map_err(|e| Error::Internal(e.to_string()))??;

    Ok(Arc::new(Mutex::new(port)))
}

/// Producer half of the serial link.
///
/// "Advertising" on a serial line is simply holding the port open; the
/// peer is whatever is listening on the other end.
pub struct SerialLink {
    config: SerialConfig,
    port: Option<SharedPort>,
}

impl SerialLink {
    /// Create a link for the given port settings. The port is opened by
    /// [`wait_for_peer`](FrameLink::wait_for_peer).
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }
}

#[async_trait]
impl FrameLink for SerialLink {
    async fn wait_for_peer(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let port = open_port(self.config.clone()).await?;
        info!(
            "Opened serial port {} at {} baud",
            self.config.path, self.config.baud_rate
        );
        self.port = Some(port);
        Ok(())
    }

    async fn send(&mut self, chunk: Bytes) -> Result<()> {
        let port = self.port.as_ref().ok_or(Error::NotConnected)?.clone();

        let written = task::spawn_blocking(move || -> std::io::Result<()> {
            let mut port = port.lock();
            port.write_all(&chunk)?;
            port.flush()
        })
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Serial write failed ({e}), dropping port");
                self.port = None;
                Err(Error::ConnectionLost)
            }
        }
    }

    async fn peer_connected(&self) -> bool {
        self.port.is_some()
    }
}

/// Consumer of the serial frame stream.
///
/// Reads raw bytes off the line into a [`FrameReassembler`] and
/// broadcasts decoded frames. A lost port is reopened after a fixed
/// delay, indefinitely — the camera is expected to come back.
pub struct SerialReceiver {
    config: SerialConfig,
    frame_tx: broadcast::Sender<ThermalFrame>,
    frames_received: AtomicU64,
    frames_skipped: AtomicU64,
}

impl SerialReceiver {
    /// Create a receiver for the given port settings.
    pub fn new(config: SerialConfig) -> Self {
        let (frame_tx, _) = broadcast::channel(16);
        Self {
            config,
            frame_tx,
            frames_received: AtomicU64::new(0),
            frames_skipped: AtomicU64::new(0),
        }
    }

    /// Subscribe to decoded frames.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<ThermalFrame> {
        self.frame_tx.subscribe()
    }

    /// Frames decoded so far.
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Malformed frames dropped so far.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped.load(Ordering::Relaxed)
    }

    /// Drive the receive loop. Runs until the future is dropped.
    pub async fn run(&self) -> Result<()> {
        loop {
            let port = match open_port(self.config.clone()).await {
                Ok(port) => port,
                Err(e) => {
                    warn!(
                        "Failed to open {} ({e}), retrying in {:?}",
                        self.config.path, self.config.reconnect_delay
                    );
                    tokio::time::sleep(self.config.reconnect_delay).await;
                    continue;
                }
            };

            info!("Serial link up on {}", self.config.path);
            // Fresh reassembler per connection; stale partial frames from
            // a previous session must not leak into this one.
            let mut reassembler = FrameReassembler::new();

            loop {
                match Self::read_some(port.clone()).await {
                    Ok(bytes) if bytes.is_empty() => {}
                    Ok(bytes) => self.ingest(&mut reassembler, &bytes),
                    Err(e) => {
                        warn!(
                            "Serial link lost ({e}), reconnecting in {:?}",
                            self.config.reconnect_delay
                        );
                        break;
                    }
                }
            }

            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    fn ingest(&self, reassembler: &mut FrameReassembler, bytes: &[u8]) {
        match reassembler.on_bytes(bytes) {
            ReassemblyOutcome::Frame(frame) => {
                self.frames_received.fetch_add(1, Ordering::Relaxed);
                debug!("Decoded serial frame");
                let _ = self.frame_tx.send(frame);
            }
            ReassemblyOutcome::Skipped(err) => {
                self.frames_skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Skipping malformed frame: {err}");
            }
            ReassemblyOutcome::Incomplete => {}
        }
    }

    /// One blocking read, mapped so a timeout is just "no data yet".
    async fn read_some(port: SharedPort) -> Result<Vec<u8>> {
        task::spawn_blocking(move || {
            let mut buf = [0u8; 256];
            let mut port = port.lock();
            match port.read(&mut buf) {
                Ok(n) => Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
                Err(e) => Err(Error::Io(e)),
            }
        })
        .await
        .map_err(|e| Error::Internal(e.to_string()))?
    }
}
