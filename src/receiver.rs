//! Consumer-side connection supervisor.
//!
//! Owns the scan → connect → subscribe → monitor loop on the viewer
//! side of the BLE link. Every failure here is transient by design:
//! scan misses, connect errors, and dropped links all funnel back to
//! scanning after a fixed delay, forever — the camera is expected to
//! reappear.

use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ble::connection::CameraConnection;
use crate::ble::scanner::CameraScanner;
use crate::ble::uuids::FRAME_CHARACTERISTIC_UUID;
use crate::error::Result;
use crate::frame::ThermalFrame;
use crate::protocol::reassembly::{FrameReassembler, ReassemblyOutcome};

/// Receiver policy knobs.
///
/// Defaults mirror the reference viewer: 10 s scan window, fixed 2 s
/// retry with no backoff growth, 1 s connection liveness poll.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// How long one scan attempt may take before it is declared a miss.
    pub scan_timeout: Duration,
    /// Fixed delay between retry rounds. Retries are unbounded.
    pub retry_delay: Duration,
    /// Coarse interval for polling connection liveness.
    pub liveness_interval: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
            liveness_interval: Duration::from_secs(1),
        }
    }
}

/// Lifecycle state of the receiver supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReceiverState {
    /// Not running.
    #[default]
    Idle,
    /// Searching for the camera's service advertisement.
    Scanning,
    /// Establishing the BLE connection.
    Connecting,
    /// Connected and subscribed to frame notifications.
    Subscribed,
    /// Receiving and reassembling frames.
    Monitoring,
}

impl ReceiverState {
    /// Check if a connection is up.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Subscribed | Self::Monitoring)
    }
}

impl std::fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Subscribed => write!(f, "Subscribed"),
            Self::Monitoring => write!(f, "Monitoring"),
        }
    }
}

/// Event emitted by the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// Subscribed to the camera's frame notifications.
    Connected,
    /// A scan window elapsed without finding the camera.
    ScanMissed,
    /// A malformed frame was dropped; the display stays on its previous
    /// frame.
    FrameSkipped,
    /// The camera went away; scanning restarts.
    Disconnected,
}

/// Consumer supervisor: receives the frame stream over BLE.
///
/// Decoded frames are fanned out on a broadcast channel; a slow
/// subscriber misses frames rather than stalling reception.
pub struct FrameReceiver {
    scanner: Arc<CameraScanner>,
    config: ReceiverConfig,
    state: Arc<RwLock<ReceiverState>>,
    frame_tx: broadcast::Sender<ThermalFrame>,
    event_tx: broadcast::Sender<ReceiverEvent>,
    frames_received: Arc<AtomicU64>,
    frames_skipped: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
    supervisor_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl FrameReceiver {
    /// Create a receiver on the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Ok(Self::with_scanner(CameraScanner::new().await?))
    }

    /// Create a receiver around an existing scanner.
    pub fn with_scanner(scanner: CameraScanner) -> Self {
        let (frame_tx, _) = broadcast::channel(16);
        let (event_tx, _) = broadcast::channel(32);

        Self {
            scanner: Arc::new(scanner),
            config: ReceiverConfig::default(),
            state: Arc::new(RwLock::new(ReceiverState::Idle)),
            frame_tx,
            event_tx,
            frames_received: Arc::new(AtomicU64::new(0)),
            frames_skipped: Arc::new(AtomicU64::new(0)),
            is_running: Arc::new(AtomicBool::new(false)),
            supervisor_handle: RwLock::new(None),
        }
    }

    /// Replace the receiver policy.
    pub fn with_config(mut self, config: ReceiverConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the supervisor loop in a background task.
    pub fn start(&self) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            debug!("Receiver already running");
            return;
        }

        info!("Starting thermal frame receiver");

        let scanner = self.scanner.clone();
        let config = self.config.clone();
        let state = self.state.clone();
        let frame_tx = self.frame_tx.clone();
        let event_tx = self.event_tx.clone();
        let frames_received = self.frames_received.clone();
        let frames_skipped = self.frames_skipped.clone();
        let is_running = self.is_running.clone();

        let handle = tokio::spawn(async move {
            Self::supervise(
                scanner,
                config,
                state.clone(),
                frame_tx,
                event_tx,
                frames_received,
                frames_skipped,
                is_running,
            )
            .await;

            *state.write() = ReceiverState::Idle;
            debug!("Receiver supervisor ended");
        });

        *self.supervisor_handle.write() = Some(handle);
    }

    /// Stop the supervisor and drop any connection in progress.
    pub async fn stop(&self) {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("Stopping thermal frame receiver");

        if let Some(handle) = self.supervisor_handle.write().take() {
            handle.abort();
            let _ = handle.await;
        }

        *self.state.write() = ReceiverState::Idle;
    }

    /// Subscribe to decoded frames.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<ThermalFrame> {
        self.frame_tx.subscribe()
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.event_tx.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReceiverState {
        *self.state.read()
    }

    /// Frames decoded so far.
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Malformed frames dropped so far.
    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped.load(Ordering::Relaxed)
    }

    /// Check if the supervisor is running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    #[allow(clippy::too_many_arguments)]
    async fn supervise(
        scanner: Arc<CameraScanner>,
        config: ReceiverConfig,
        state: Arc<RwLock<ReceiverState>>,
        frame_tx: broadcast::Sender<ThermalFrame>,
        event_tx: broadcast::Sender<ReceiverEvent>,
        frames_received: Arc<AtomicU64>,
        frames_skipped: Arc<AtomicU64>,
        is_running: Arc<AtomicBool>,
    ) {
        while is_running.load(Ordering::SeqCst) {
            *state.write() = ReceiverState::Scanning;

            let peripheral = match scanner.find_camera(config.scan_timeout).await {
                Ok(Some(peripheral)) => peripheral,
                Ok(None) => {
                    info!(
                        "Thermal camera not found, retrying in {:?}",
                        config.retry_delay
                    );
                    let _ = event_tx.send(ReceiverEvent::ScanMissed);
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
                Err(e) => {
                    warn!("Scan failed ({e}), retrying in {:?}", config.retry_delay);
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
            };

            *state.write() = ReceiverState::Connecting;

            let connection = match CameraConnection::establish(peripheral).await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("Connect failed ({e}), rescanning in {:?}", config.retry_delay);
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
            };

            let notifications = match connection.subscribe_frames().await {
                Ok(notifications) => notifications,
                Err(e) => {
                    warn!(
                        "Subscribe failed ({e}), rescanning in {:?}",
                        config.retry_delay
                    );
                    let _ = connection.disconnect().await;
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
            };

            *state.write() = ReceiverState::Subscribed;
            info!("Subscribed to frame notifications");
            let _ = event_tx.send(ReceiverEvent::Connected);

            Self::monitor(
                &config,
                &state,
                &frame_tx,
                &event_tx,
                &frames_received,
                &frames_skipped,
                &is_running,
                &connection,
                notifications,
            )
            .await;

            let _ = event_tx.send(ReceiverEvent::Disconnected);
            let _ = connection.disconnect().await;

            if is_running.load(Ordering::SeqCst) {
                info!("Camera disconnected, restarting scan");
                *state.write() = ReceiverState::Idle;
            }
        }
    }

    /// Pump notifications into a fresh reassembler until the link dies.
    #[allow(clippy::too_many_arguments)]
    async fn monitor(
        config: &ReceiverConfig,
        state: &Arc<RwLock<ReceiverState>>,
        frame_tx: &broadcast::Sender<ThermalFrame>,
        event_tx: &broadcast::Sender<ReceiverEvent>,
        frames_received: &Arc<AtomicU64>,
        frames_skipped: &Arc<AtomicU64>,
        is_running: &Arc<AtomicBool>,
        connection: &CameraConnection,
        mut notifications: crate::ble::connection::NotificationStream,
    ) {
        *state.write() = ReceiverState::Monitoring;

        // One reassembler per connection; it is dropped (buffer and all)
        // when the link goes away.
        let mut reassembler = FrameReassembler::new();
        let mut liveness = tokio::time::interval(config.liveness_interval);

        loop {
            tokio::select! {
                notification = notifications.next() => {
                    match notification {
                        Some(n) if n.uuid == FRAME_CHARACTERISTIC_UUID => {
                            match reassembler.on_bytes(&n.value) {
                                ReassemblyOutcome::Frame(frame) => {
                                    frames_received.fetch_add(1, Ordering::Relaxed);
                                    debug!("Decoded thermal frame");
                                    let _ = frame_tx.send(frame);
                                }
                                ReassemblyOutcome::Skipped(err) => {
                                    frames_skipped.fetch_add(1, Ordering::Relaxed);
                                    warn!("Skipping malformed frame: {err}");
                                    let _ = event_tx.send(ReceiverEvent::FrameSkipped);
                                }
                                ReassemblyOutcome::Incomplete => {}
                            }
                        }
                        Some(_) => {}
                        None => {
                            debug!("Notification stream ended");
                            return;
                        }
                    }
                }
                _ = liveness.tick() => {
                    if !is_running.load(Ordering::SeqCst) {
                        return;
                    }
                    if !connection.is_alive().await {
                        debug!("Liveness poll found connection gone");
                        return;
                    }
                }
            }
        }
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.supervisor_handle.write().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_match_viewer() {
        let config = ReceiverConfig::default();
        assert_eq!(config.scan_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.liveness_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_receiver_state_predicates() {
        assert!(ReceiverState::Monitoring.is_connected());
        assert!(ReceiverState::Subscribed.is_connected());
        assert!(!ReceiverState::Scanning.is_connected());
        assert_eq!(format!("{}", ReceiverState::Scanning), "Scanning");
    }
}
