//! Error types for the mlx90640-stream crate.

use thiserror::Error;

use crate::protocol::codec::DecodeError;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// Serial port error from the underlying serial library.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error on a transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation requires a connection but no peer is connected.
    #[error("No peer connected")]
    NotConnected,

    /// Failed to establish a connection to the camera.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// The connection to the peer was lost.
    ///
    /// This is an expected lifecycle event for both supervisors, not a
    /// fault: the producer returns to advertising and the receiver
    /// returns to scanning.
    #[error("Connection lost")]
    ConnectionLost,

    /// A frame capture failed transiently.
    ///
    /// The streaming loop logs the failure and retries on the next cycle.
    #[error("Frame capture failed: {reason}")]
    Capture {
        /// Description of the capture failure.
        reason: String,
    },

    /// The producer signaled an allocation failure.
    ///
    /// Fatal to the current boot: the streamer runs its fault indicator
    /// sequence and requests a device restart instead of retrying.
    #[error("Allocation failure")]
    OutOfMemory,

    /// An encoded frame failed to decode.
    #[error("Frame decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// A frame was constructed with the wrong number of values.
    #[error("Invalid frame: expected {expected} values, got {len}")]
    InvalidFrame {
        /// The required number of values.
        expected: usize,
        /// The number of values that were provided.
        len: usize,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
