//! BLE connection plumbing for the receiver.
//!
//! Wraps connect, service discovery, and the frame-characteristic
//! subscription into one established-connection handle. Retry policy
//! deliberately lives in the receiver supervisor, not here: every
//! failure on this side is transient and answered by rescanning.

use btleplug::api::{Characteristic, Peripheral as _, ValueNotification};
use btleplug::platform::Peripheral;
use futures::stream::Stream;
use std::pin::Pin;
use tracing::{debug, info, warn};

use crate::ble::uuids::FRAME_CHARACTERISTIC_UUID;
use crate::error::{Error, Result};

/// Stream of raw notification payloads from the peripheral.
pub type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// An established connection to the thermal camera.
pub struct CameraConnection {
    peripheral: Peripheral,
    frame_characteristic: Characteristic,
}

impl CameraConnection {
    /// Connect to the camera and discover its frame characteristic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the BLE connection cannot
    /// be established, or [`Error::CharacteristicNotFound`] if the
    /// peripheral lacks the frame characteristic.
    pub async fn establish(peripheral: Peripheral) -> Result<Self> {
        if !peripheral.is_connected().await.unwrap_or(false) {
            peripheral
                .connect()
                .await
                .map_err(|e| Error::ConnectionFailed {
                    reason: e.to_string(),
                })?;
        }

        info!("Connected to thermal camera");

        peripheral
            .discover_services()
            .await
            .map_err(Error::Bluetooth)?;

        let frame_characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == FRAME_CHARACTERISTIC_UUID)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: FRAME_CHARACTERISTIC_UUID.to_string(),
            })?;

        Ok(Self {
            peripheral,
            frame_characteristic,
        })
    }

    /// Subscribe to frame notifications and return the payload stream.
    pub async fn subscribe_frames(&self) -> Result<NotificationStream> {
        self.peripheral
            .subscribe(&self.frame_characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        debug!(
            "Subscribed to frame notifications on {}",
            self.frame_characteristic.uuid
        );

        self.peripheral.notifications().await.map_err(Error::Bluetooth)
    }

    /// Poll whether the link is still up.
    ///
    /// Used by the receiver's coarse liveness check; a BLE stack error
    /// here is read as "gone".
    pub async fn is_alive(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Disconnect from the camera.
    pub async fn disconnect(&self) -> Result<()> {
        match self.peripheral.disconnect().await {
            Ok(()) => {
                info!("Disconnected from thermal camera");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to disconnect cleanly: {}", e);
                Err(Error::Bluetooth(e))
            }
        }
    }

    /// The underlying peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }
}
