//! End-to-end pipeline demo without hardware
//!
//! Streams synthetic frames through the full producer path (capture →
//! encode → chunk → send) over the in-memory link, reassembles them on
//! the consumer side, and prints per-frame stats.
//!
//! Run with: cargo run --example stream_loopback

use mlx90640_stream::{
    ChannelLink, FrameReassembler, FrameStreamer, ReassemblyOutcome, Result, StreamerConfig,
    SyntheticSensor,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Loopback Pipeline Demo");
    println!("======================\n");

    let (link, mut rx) = ChannelLink::pair(256);

    let mut streamer = FrameStreamer::new(SyntheticSensor::new(), link).with_config(
        StreamerConfig {
            frame_interval: Duration::from_millis(250),
            inter_chunk_pause: Duration::from_millis(5),
            ..StreamerConfig::default()
        },
    );
    let monitor = streamer.monitor();

    let producer = tokio::spawn(async move { streamer.run().await });

    let mut reassembler = FrameReassembler::new();
    let mut count = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            chunk = rx.recv() => {
                let Some(chunk) = chunk else { break };
                match reassembler.on_bytes(&chunk) {
                    ReassemblyOutcome::Frame(frame) => {
                        count += 1;
                        println!(
                            "frame {count:4}  min {:5.2}°C  mean {:5.2}°C  max {:5.2}°C  (sent: {})",
                            frame.coldest(),
                            frame.mean(),
                            frame.hottest(),
                            monitor.frames_sent(),
                        );
                    }
                    ReassemblyOutcome::Skipped(err) => println!("skipped frame: {err}"),
                    ReassemblyOutcome::Incomplete => {}
                }
            }
        }
    }

    producer.abort();
    Ok(())
}
