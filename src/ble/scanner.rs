//! BLE scanning functionality.
//!
//! Finds the thermal camera by its advertised service UUID. Unlike a
//! general-purpose discovery scanner this is a one-shot search with a
//! bounded timeout: the receiver supervisor calls it once per scan
//! cycle and retries on a miss.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::ble::uuids::{ADVERTISED_NAME, THERMAL_SERVICE_UUID};
use crate::error::{Error, Result};

/// One-shot scanner for the thermal camera.
pub struct CameraScanner {
    adapter: Adapter,
}

impl CameraScanner {
    /// Create a new scanner on the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Create a scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Scan for the camera, giving up after `timeout`.
    ///
    /// Filters candidates by the fixed service UUID (falling back to the
    /// advertised name for stacks that withhold service lists until
    /// connection). Returns `Ok(None)` on timeout — a miss is an
    /// expected outcome the caller retries, not an error.
    pub async fn find_camera(&self, timeout: Duration) -> Result<Option<Peripheral>> {
        debug!("Scanning for thermal camera service {THERMAL_SERVICE_UUID}");

        self.adapter
            .start_scan(ScanFilter {
                services: vec![THERMAL_SERVICE_UUID],
            })
            .await
            .map_err(Error::Bluetooth)?;

        let found = tokio::time::timeout(timeout, self.watch_for_camera()).await;

        // Stop scanning regardless of how the watch ended.
        let _ = self.adapter.stop_scan().await;

        match found {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Consume adapter events until a matching peripheral shows up.
    async fn watch_for_camera(&self) -> Result<Peripheral> {
        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        while let Some(event) = events.next().await {
            match event {
                CentralEvent::ServicesAdvertisement { id, services } => {
                    if services.contains(&THERMAL_SERVICE_UUID) {
                        trace!("Camera service advertisement from {:?}", id);
                        if let Ok(peripheral) = self.adapter.peripheral(&id).await {
                            return Ok(peripheral);
                        }
                    }
                }
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                    if let Some(peripheral) = self.check_peripheral(&id).await {
                        return Ok(peripheral);
                    }
                }
                _ => {}
            }
        }

        // The event stream only ends if the adapter went away.
        Err(Error::BluetoothUnavailable)
    }

    /// Decide whether a discovered peripheral is the camera.
    async fn check_peripheral(&self, id: &PeripheralId) -> Option<Peripheral> {
        let peripheral = match self.adapter.peripheral(id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return None,
        };

        let advertises_service = properties
            .services
            .iter()
            .any(|uuid| *uuid == THERMAL_SERVICE_UUID);
        let name_matches = properties.local_name.as_deref() == Some(ADVERTISED_NAME);

        if advertises_service || name_matches {
            debug!(
                "Found thermal camera: {:?} (rssi: {:?})",
                properties.local_name, properties.rssi
            );
            Some(peripheral)
        } else {
            None
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}
