//! BLE Service and Characteristic UUIDs.
//!
//! UUID constants matching the thermal camera firmware's GATT layout:
//! one service with one characteristic supporting read + notify.

use uuid::Uuid;

/// Thermal camera service UUID, as advertised by the firmware.
pub const THERMAL_SERVICE_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef0);

/// Frame streaming characteristic UUID (Read, Notify).
pub const FRAME_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x12345678_1234_5678_1234_56789abcdef1);

/// Local name the camera advertises under.
pub const ADVERTISED_NAME: &str = "ESP32-BLE";

/// Check if a service UUID belongs to the thermal camera.
pub fn is_thermal_service(uuid: &Uuid) -> bool {
    *uuid == THERMAL_SERVICE_UUID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            THERMAL_SERVICE_UUID.to_string(),
            "12345678-1234-5678-1234-56789abcdef0"
        );
        assert_eq!(
            FRAME_CHARACTERISTIC_UUID.to_string(),
            "12345678-1234-5678-1234-56789abcdef1"
        );
    }

    #[test]
    fn test_is_thermal_service() {
        assert!(is_thermal_service(&THERMAL_SERVICE_UUID));
        assert!(!is_thermal_service(&FRAME_CHARACTERISTIC_UUID));
    }
}
