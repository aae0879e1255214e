//! Producer-side connection supervisor.
//!
//! Owns the advertise → connect → stream → disconnect loop on the
//! camera side of the link, and the memory-pressure recovery policy.
//! Peer loss is an expected lifecycle event answered by re-advertising;
//! an allocation failure is answered by a fault indicator sequence and
//! a full device restart, never by in-process recovery.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::platform::{DeviceReset, NullIndicator, NullReset, StatusIndicator};
use crate::protocol::chunker::{chunks, DEFAULT_CHUNK_SIZE};
use crate::protocol::codec::encode_frame;
use crate::sensor::ThermalSensor;
use crate::transport::FrameLink;

/// Streaming policy knobs.
///
/// The defaults mirror the reference firmware: 4 Hz capture, 200-byte
/// chunks with a 50 ms pacing gap, and a 5-blink fault pattern before
/// restart.
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Maximum bytes per transport send.
    pub chunk_size: usize,
    /// Pause between chunk sends. The notify pipe has no flow control of
    /// its own; pacing sends is what keeps the peer's stack from
    /// drowning.
    pub inter_chunk_pause: Duration,
    /// Target time between frames. Zero streams as fast as captures
    /// allow, which is how the serial variant runs.
    pub frame_interval: Duration,
    /// Delay before re-trying a failed advertise/accept cycle.
    pub advertise_retry_delay: Duration,
    /// Number of indicator blinks in the memory-fault sequence.
    pub fault_blink_count: u32,
    /// On and off duration of each fault blink.
    pub fault_blink_interval: Duration,
    /// Settle time between the fault sequence and the restart request.
    pub fault_reset_delay: Duration,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            inter_chunk_pause: Duration::from_millis(50),
            frame_interval: Duration::from_millis(250),
            advertise_retry_delay: Duration::from_secs(1),
            fault_blink_count: 5,
            fault_blink_interval: Duration::from_millis(100),
            fault_reset_delay: Duration::from_secs(1),
        }
    }
}

/// Lifecycle state of the producer supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamerState {
    /// Not doing anything yet.
    #[default]
    Idle,
    /// Waiting for a peer to attach.
    Advertising,
    /// Peer attached, stream not started.
    Connected,
    /// Actively capturing and sending frames.
    Streaming,
}

impl StreamerState {
    /// Check if frames are being streamed.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

impl std::fmt::Display for StreamerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Advertising => write!(f, "Advertising"),
            Self::Connected => write!(f, "Connected"),
            Self::Streaming => write!(f, "Streaming"),
        }
    }
}

/// Allocation-pressure state of the producer.
///
/// `Degraded` is terminal for the current boot: the supervisor blinks
/// the fault pattern and requests a restart; it never returns to
/// `Normal` in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryPressure {
    /// Allocations are succeeding.
    #[default]
    Normal,
    /// An allocation failure was signaled; restart pending.
    Degraded,
}

/// Event emitted by the streamer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamerEvent {
    /// A peer attached to the link.
    PeerConnected,
    /// One complete frame was chunked and sent.
    FrameSent {
        /// Size of the encoded frame in bytes.
        bytes: usize,
    },
    /// A capture failed transiently; the cycle was skipped.
    CaptureSkipped,
    /// The peer went away; advertising restarts.
    PeerLost,
    /// Allocation failure; restart imminent.
    MemoryFault,
}

/// Shared view into a running streamer.
///
/// Obtained from [`FrameStreamer::monitor`] before handing the streamer
/// to a task; remains valid for the streamer's lifetime.
#[derive(Clone)]
pub struct StreamerMonitor {
    state: Arc<RwLock<StreamerState>>,
    memory: Arc<RwLock<MemoryPressure>>,
    frames_sent: Arc<AtomicU64>,
    event_tx: broadcast::Sender<StreamerEvent>,
}

impl StreamerMonitor {
    /// Current lifecycle state.
    pub fn state(&self) -> StreamerState {
        *self.state.read()
    }

    /// Current memory-pressure state.
    pub fn memory_pressure(&self) -> MemoryPressure {
        *self.memory.read()
    }

    /// Frames sent since the streamer was created.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Subscribe to streamer events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<StreamerEvent> {
        self.event_tx.subscribe()
    }
}

/// Producer supervisor: captures frames and streams them to one peer.
///
/// Generic over the sensor and the link so the same state machine runs
/// against real hardware, a serial line, or the in-memory loopback.
/// Dropping the [`run`](Self::run) future is the cancellation signal;
/// every await point is safe to unwind through.
pub struct FrameStreamer<S, L> {
    sensor: S,
    link: L,
    indicator: Box<dyn StatusIndicator>,
    reset: Box<dyn DeviceReset>,
    config: StreamerConfig,
    state: Arc<RwLock<StreamerState>>,
    memory: Arc<RwLock<MemoryPressure>>,
    frames_sent: Arc<AtomicU64>,
    event_tx: broadcast::Sender<StreamerEvent>,
}

impl<S: ThermalSensor, L: FrameLink> FrameStreamer<S, L> {
    /// Create a streamer with default config and null platform hooks.
    pub fn new(sensor: S, link: L) -> Self {
        let (event_tx, _) = broadcast::channel(32);

        Self {
            sensor,
            link,
            indicator: Box::new(NullIndicator),
            reset: Box::new(NullReset),
            config: StreamerConfig::default(),
            state: Arc::new(RwLock::new(StreamerState::Idle)),
            memory: Arc::new(RwLock::new(MemoryPressure::Normal)),
            frames_sent: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    /// Replace the streaming policy.
    pub fn with_config(mut self, config: StreamerConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a status indicator (capture heartbeat + fault pattern).
    pub fn with_indicator(mut self, indicator: impl StatusIndicator + 'static) -> Self {
        self.indicator = Box::new(indicator);
        self
    }

    /// Install a device restart hook.
    pub fn with_reset(mut self, reset: impl DeviceReset + 'static) -> Self {
        self.reset = Box::new(reset);
        self
    }

    /// The active streaming policy.
    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Shared view for observing state and events while running.
    pub fn monitor(&self) -> StreamerMonitor {
        StreamerMonitor {
            state: self.state.clone(),
            memory: self.memory.clone(),
            frames_sent: self.frames_sent.clone(),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Drive the supervisor loop.
    ///
    /// Loops forever through advertise → stream → disconnect cycles.
    /// Returns only after a memory fault has been escalated (on real
    /// hardware the restart preempts the return) or when the future is
    /// dropped by its caller.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.set_state(StreamerState::Idle);
            self.set_state(StreamerState::Advertising);
            info!("Waiting for a peer to attach");

            match self.link.wait_for_peer().await {
                Ok(()) => {}
                Err(Error::OutOfMemory) => return self.escalate_memory_fault().await,
                Err(e) => {
                    warn!("Transport error while waiting for peer: {e}");
                    tokio::time::sleep(self.config.advertise_retry_delay).await;
                    continue;
                }
            }

            self.set_state(StreamerState::Connected);
            info!("Peer attached, streaming frames");
            let _ = self.event_tx.send(StreamerEvent::PeerConnected);

            match self.stream_frames().await {
                Error::ConnectionLost => {
                    info!("Peer disconnected, restarting advertising");
                    let _ = self.event_tx.send(StreamerEvent::PeerLost);
                }
                Error::OutOfMemory => return self.escalate_memory_fault().await,
                e => {
                    warn!("Transport error while streaming: {e}");
                    let _ = self.event_tx.send(StreamerEvent::PeerLost);
                }
            }
        }
    }

    /// Capture-encode-chunk-send cycles until something breaks the
    /// stream. Transient capture failures are absorbed here and do not
    /// propagate.
    async fn stream_frames(&mut self) -> Error {
        self.set_state(StreamerState::Streaming);

        loop {
            if !self.link.peer_connected().await {
                return Error::ConnectionLost;
            }

            // Heartbeat: indicator on for the duration of the capture.
            self.indicator.set_active(true);
            let captured = self.sensor.capture().await;
            self.indicator.set_active(false);

            let frame = match captured {
                Ok(frame) => frame,
                Err(Error::OutOfMemory) => return Error::OutOfMemory,
                Err(e) => {
                    warn!("Capture failed ({e}), retrying next cycle");
                    let _ = self.event_tx.send(StreamerEvent::CaptureSkipped);
                    tokio::time::sleep(self.config.frame_interval).await;
                    continue;
                }
            };

            let encoded = encode_frame(&frame);
            for chunk in chunks(&encoded, self.config.chunk_size) {
                if let Err(e) = self.link.send(chunk).await {
                    return e;
                }
                tokio::time::sleep(self.config.inter_chunk_pause).await;
            }

            self.frames_sent.fetch_add(1, Ordering::Relaxed);
            debug!("Sent thermal frame ({} bytes)", encoded.len());
            let _ = self.event_tx.send(StreamerEvent::FrameSent {
                bytes: encoded.len(),
            });

            tokio::time::sleep(self.config.frame_interval).await;
        }
    }

    /// Terminal path: blink the fault pattern, settle, request restart.
    async fn escalate_memory_fault(&mut self) -> Result<()> {
        error!("Allocation failure; running fault indicator sequence and restarting device");
        *self.memory.write() = MemoryPressure::Degraded;
        let _ = self.event_tx.send(StreamerEvent::MemoryFault);

        for _ in 0..self.config.fault_blink_count {
            self.indicator.set_active(true);
            tokio::time::sleep(self.config.fault_blink_interval).await;
            self.indicator.set_active(false);
            tokio::time::sleep(self.config.fault_blink_interval).await;
        }

        tokio::time::sleep(self.config.fault_reset_delay).await;
        self.reset.restart();
        Ok(())
    }

    /// Update the lifecycle state, logging transitions.
    fn set_state(&self, new_state: StreamerState) {
        let old_state = {
            let mut state = self.state.write();
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            debug!("Streamer state changed: {old_state} -> {new_state}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ThermalFrame;
    use crate::protocol::reassembly::{FrameReassembler, ReassemblyOutcome};
    use crate::transport::ChannelLink;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// What one scripted capture attempt should produce.
    #[derive(Clone, Copy)]
    enum Step {
        Frame(f32),
        Fail,
        Oom,
    }

    struct ScriptedSensor {
        script: Mutex<VecDeque<Step>>,
        fallback: Step,
        attempts: Arc<AtomicU64>,
    }

    impl ScriptedSensor {
        fn new(script: Vec<Step>, fallback: Step) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                attempts: Arc::new(AtomicU64::new(0)),
            }
        }
    }

    #[async_trait]
    impl ThermalSensor for ScriptedSensor {
        async fn capture(&mut self) -> Result<ThermalFrame> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().pop_front().unwrap_or(self.fallback);
            match step {
                Step::Frame(fill) => Ok(ThermalFrame::filled(fill)),
                Step::Fail => Err(Error::Capture {
                    reason: "sensor I/O glitch".to_string(),
                }),
                Step::Oom => Err(Error::OutOfMemory),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingIndicator {
        transitions: Arc<Mutex<Vec<bool>>>,
    }

    impl StatusIndicator for RecordingIndicator {
        fn set_active(&self, on: bool) {
            self.transitions.lock().push(on);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingReset {
        restarts: Arc<AtomicU64>,
    }

    impl DeviceReset for RecordingReset {
        fn restart(&self) {
            self.restarts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> StreamerConfig {
        StreamerConfig {
            chunk_size: 8,
            inter_chunk_pause: Duration::ZERO,
            frame_interval: Duration::from_millis(1),
            advertise_retry_delay: Duration::from_millis(1),
            fault_blink_count: 5,
            fault_blink_interval: Duration::from_millis(1),
            fault_reset_delay: Duration::from_millis(1),
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<StreamerEvent>) -> StreamerEvent {
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Ok(event)) => return event,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                other => panic!("no event: {other:?}"),
            }
        }
    }

    #[test]
    fn test_config_defaults_match_firmware() {
        let config = StreamerConfig::default();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.inter_chunk_pause, Duration::from_millis(50));
        assert_eq!(config.frame_interval, Duration::from_millis(250));
        assert_eq!(config.fault_blink_count, 5);
        assert_eq!(config.fault_blink_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_streamer_state_display() {
        assert_eq!(format!("{}", StreamerState::Advertising), "Advertising");
        assert!(StreamerState::Streaming.is_streaming());
        assert!(!StreamerState::Idle.is_streaming());
    }

    #[tokio::test]
    async fn test_streams_decodable_frames_over_loopback() {
        let sensor = ScriptedSensor::new(Vec::new(), Step::Frame(25.0));
        let (link, mut rx) = ChannelLink::pair(1024);

        let mut streamer =
            FrameStreamer::new(sensor, link).with_config(fast_config());
        let monitor = streamer.monitor();
        let handle = tokio::spawn(async move { streamer.run().await });

        let mut reassembler = FrameReassembler::new();
        let mut decoded = None;
        while decoded.is_none() {
            let chunk = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("streamer stalled")
                .expect("link closed");
            assert!(chunk.len() <= 8);
            if let ReassemblyOutcome::Frame(frame) = reassembler.on_bytes(&chunk) {
                decoded = Some(frame);
            }
        }

        assert_eq!(decoded.unwrap(), ThermalFrame::filled(25.0));
        assert!(monitor.frames_sent() >= 1);
        assert!(monitor.state().is_streaming());
        handle.abort();
    }

    #[tokio::test]
    async fn test_peer_loss_returns_to_advertising() {
        let sensor = ScriptedSensor::new(Vec::new(), Step::Frame(20.0));
        let (link, mut rx) = ChannelLink::pair(1024);

        let mut streamer =
            FrameStreamer::new(sensor, link).with_config(fast_config());
        let monitor = streamer.monitor();
        let mut events = monitor.subscribe_events();
        let handle = tokio::spawn(async move { streamer.run().await });

        // Act as a peer for a few chunks, then vanish.
        for _ in 0..3 {
            rx.recv().await.expect("no chunk");
        }
        drop(rx);

        loop {
            if next_event(&mut events).await == StreamerEvent::PeerLost {
                break;
            }
        }

        // With no peer ever coming back the streamer keeps advertising.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(
            monitor.state(),
            StreamerState::Idle | StreamerState::Advertising
        ));
        assert_eq!(monitor.memory_pressure(), MemoryPressure::Normal);
        handle.abort();
    }

    #[tokio::test]
    async fn test_transient_capture_failures_keep_streaming() {
        let sensor = ScriptedSensor::new(vec![Step::Fail; 10], Step::Frame(22.0));
        let attempts = sensor.attempts.clone();
        let (link, mut rx) = ChannelLink::pair(4096);

        let mut streamer =
            FrameStreamer::new(sensor, link).with_config(fast_config());
        let monitor = streamer.monitor();
        let mut events = monitor.subscribe_events();
        let handle = tokio::spawn(async move { streamer.run().await });

        // Keep the link drained so sends never block.
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let mut skips = 0;
        loop {
            match next_event(&mut events).await {
                StreamerEvent::CaptureSkipped => {
                    skips += 1;
                    assert!(
                        monitor.state().is_streaming(),
                        "failed captures must not leave Streaming"
                    );
                }
                StreamerEvent::FrameSent { .. } => break,
                StreamerEvent::PeerConnected => {}
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(skips, 10);
        assert_eq!(attempts.load(Ordering::SeqCst), 11);
        handle.abort();
        drain.abort();
    }

    #[tokio::test]
    async fn test_memory_fault_blinks_and_restarts_once() {
        let sensor = ScriptedSensor::new(vec![Step::Oom], Step::Frame(20.0));
        let attempts = sensor.attempts.clone();
        let (link, _rx) = ChannelLink::pair(1024);

        let indicator = RecordingIndicator::default();
        let transitions = indicator.transitions.clone();
        let reset = RecordingReset::default();
        let restarts = reset.restarts.clone();

        let mut streamer = FrameStreamer::new(sensor, link)
            .with_config(fast_config())
            .with_indicator(indicator)
            .with_reset(reset);
        let monitor = streamer.monitor();

        streamer.run().await.unwrap();

        assert_eq!(restarts.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.memory_pressure(), MemoryPressure::Degraded);
        assert_eq!(
            attempts.load(Ordering::SeqCst),
            1,
            "no capture retry after a memory fault"
        );

        // One heartbeat pair around the failed capture, then exactly
        // five fault blinks.
        let recorded = transitions.lock().clone();
        assert_eq!(recorded.len(), 2 + 10);
        let expected: Vec<bool> = std::iter::repeat([true, false]).take(6).flatten().collect();
        assert_eq!(recorded, expected);
    }

    #[tokio::test]
    async fn test_memory_fault_during_send_escalates() {
        let sensor = ScriptedSensor::new(Vec::new(), Step::Frame(20.0));

        struct OomLink;
        #[async_trait]
        impl FrameLink for OomLink {
            async fn wait_for_peer(&mut self) -> Result<()> {
                Ok(())
            }
            async fn send(&mut self, _chunk: bytes::Bytes) -> Result<()> {
                Err(Error::OutOfMemory)
            }
            async fn peer_connected(&self) -> bool {
                true
            }
        }

        let reset = RecordingReset::default();
        let restarts = reset.restarts.clone();

        let mut streamer = FrameStreamer::new(sensor, OomLink)
            .with_config(fast_config())
            .with_reset(reset);

        streamer.run().await.unwrap();

        assert_eq!(restarts.load(Ordering::SeqCst), 1);
    }
}
