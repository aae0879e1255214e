//! BLE communication module.
//!
//! Low-level Bluetooth Low Energy functionality for discovering and
//! receiving from the thermal camera. The camera firmware plays the
//! peripheral role; this crate is always the central.

pub mod connection;
pub mod scanner;
pub mod uuids;

pub use connection::CameraConnection;
pub use scanner::CameraScanner;
pub use uuids::*;
