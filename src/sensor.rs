//! Thermal sensor seam.
//!
//! The physical MLX90640 driver is an external collaborator; the
//! streamer only needs "capture one frame, which may fail transiently".
//! [`SyntheticSensor`] stands in for the hardware on hosts without a
//! camera attached.

use async_trait::async_trait;

use crate::error::Result;
use crate::frame::{ThermalFrame, FRAME_HEIGHT, FRAME_PIXELS, FRAME_WIDTH};

/// Source of thermal frames.
///
/// Implementations may fail with [`Error::Capture`](crate::Error::Capture)
/// on transient I/O problems; the streaming loop tolerates any number of
/// consecutive failures without tearing down the connection. An
/// implementation on a constrained target may also surface
/// [`Error::OutOfMemory`](crate::Error::OutOfMemory), which the streamer
/// escalates to a device restart.
#[async_trait]
pub trait ThermalSensor: Send {
    /// Capture the current frame.
    async fn capture(&mut self) -> Result<ThermalFrame>;
}

/// Deterministic frame generator with a hot spot orbiting a warm room.
///
/// Produces plausible indoor readings (ambient around 22 °C, hot spot
/// peaking near 34 °C) so demo viewers have something to render.
#[derive(Debug, Default)]
pub struct SyntheticSensor {
    tick: u64,
}

impl SyntheticSensor {
    /// Create a generator starting at tick zero.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThermalSensor for SyntheticSensor {
    async fn capture(&mut self) -> Result<ThermalFrame> {
        let angle = self.tick as f32 * 0.2;
        self.tick += 1;

        let center_row = FRAME_HEIGHT as f32 / 2.0 + angle.sin() * 7.0;
        let center_col = FRAME_WIDTH as f32 / 2.0 + angle.cos() * 10.0;

        let mut values = Vec::with_capacity(FRAME_PIXELS);
        for row in 0..FRAME_HEIGHT {
            for col in 0..FRAME_WIDTH {
                let dr = row as f32 - center_row;
                let dc = col as f32 - center_col;
                let distance_sq = dr * dr + dc * dc;
                values.push(22.0 + 12.0 * (-distance_sq / 18.0).exp());
            }
        }

        ThermalFrame::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_frames_are_valid() {
        let mut sensor = SyntheticSensor::new();
        let frame = sensor.capture().await.unwrap();

        assert_eq!(frame.values().len(), FRAME_PIXELS);
        assert!(frame.coldest() >= 21.9);
        assert!(frame.hottest() <= 34.1);
    }

    #[tokio::test]
    async fn test_synthetic_hot_spot_moves() {
        let mut sensor = SyntheticSensor::new();
        let first = sensor.capture().await.unwrap();
        let second = sensor.capture().await.unwrap();

        assert_ne!(first, second);
    }
}
