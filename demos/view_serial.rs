//! Serial thermal frame monitor
//!
//! Reads the camera's frame stream off a serial port and prints stats
//! per frame. The receiver reopens the port whenever the link drops.
//!
//! Run with: cargo run --example view_serial -- /dev/ttyUSB0

use mlx90640_stream::{Result, SerialConfig, SerialReceiver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("info").init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());

    println!("Serial Frame Monitor ({path})");
    println!("=============================\n");

    let receiver = SerialReceiver::new(SerialConfig::new(path));
    let mut frames = receiver.subscribe_frames();

    tokio::select! {
        result = receiver.run() => result,
        _ = async {
            let mut count = 0u64;
            while let Ok(frame) = frames.recv().await {
                count += 1;
                println!(
                    "frame {count:4}  min {:5.2}°C  mean {:5.2}°C  max {:5.2}°C",
                    frame.coldest(),
                    frame.mean(),
                    frame.hottest(),
                );
            }
        } => Ok(()),
        _ = tokio::signal::ctrl_c() => {
            println!("\nExiting...");
            Ok(())
        }
    }
}
