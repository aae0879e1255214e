//! Live BLE thermal viewer
//!
//! Connects to the camera over BLE and renders each received frame as
//! an ASCII heatmap. The receiver keeps scanning until the camera shows
//! up and reconnects whenever it goes away.
//!
//! Run with: cargo run --example view_ble

use mlx90640_stream::{FrameReceiver, Result, ThermalFrame};

/// Display range in °C, matching the reference viewer's color scale.
const SCALE_MIN: f32 = 25.0;
const SCALE_MAX: f32 = 32.0;

const SHADES: &[u8] = b" .:-=+*#%@";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("Live MLX90640 BLE Viewer");
    println!("========================\n");
    println!("Scanning for the thermal camera...\n");

    let receiver = FrameReceiver::new().await?;
    let mut frames = receiver.subscribe_frames();
    receiver.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            frame = frames.recv() => {
                if let Ok(frame) = frame {
                    render(&frame, receiver.frames_received(), receiver.frames_skipped());
                }
            }
        }
    }

    receiver.stop().await;
    Ok(())
}

fn render(frame: &ThermalFrame, received: u64, skipped: u64) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    println!("Live MLX90640 frame  ({received} received, {skipped} skipped)");
    println!("min {:5.2}°C  mean {:5.2}°C  max {:5.2}°C\n",
        frame.coldest(),
        frame.mean(),
        frame.hottest()
    );

    for row in frame.rows() {
        let line: String = row
            .iter()
            .map(|&celsius| {
                let t = (celsius - SCALE_MIN) / (SCALE_MAX - SCALE_MIN);
                let index = (t.clamp(0.0, 1.0) * (SHADES.len() - 1) as f32) as usize;
                SHADES[index] as char
            })
            .collect();
        println!("{line}");
    }

    println!("\nPress Ctrl+C to exit");
}
