//! GATT profile of the fall-detection peripheral.
//!
//! The peripheral exposes a single custom service carrying one notifying
//! characteristic. Notifications are switched on by writing
//! [`ENABLE_NOTIFICATION_VALUE`] to the characteristic's client
//! configuration descriptor.

use serde::{Deserialize, Serialize};

/// Advertised name of the stock fall sensor.
pub const DEFAULT_TARGET_NAME: &str = "Seeed_BLE";

/// Custom fall service.
pub const FALL_SERVICE_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0x19B1_0000_E8F2_537E_4F6C_D104_768A_1214);

/// Notifying characteristic carrying the wire messages.
pub const FALL_CHARACTERISTIC_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0x19B1_0001_E8F2_537E_4F6C_D104_768A_1214);

/// Standard Client Characteristic Configuration Descriptor (`0x2902`).
pub const CLIENT_CONFIG_DESCRIPTOR_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0x0000_2902_0000_1000_8000_0080_5F9B_34FB);

/// Descriptor value that enables notifications (little-endian `0x0001`).
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];

/// Service/characteristic pair the pipeline subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GattProfile {
    /// Service that must be present on the peripheral.
    pub service: uuid::Uuid,
    /// Characteristic inside `service` to subscribe to.
    pub characteristic: uuid::Uuid,
}

impl Default for GattProfile {
    fn default() -> Self {
        Self {
            service: FALL_SERVICE_UUID,
            characteristic: FALL_CHARACTERISTIC_UUID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_published_uuid_strings() {
        assert_eq!(
            FALL_SERVICE_UUID.to_string(),
            "19b10000-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(
            FALL_CHARACTERISTIC_UUID.to_string(),
            "19b10001-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(
            CLIENT_CONFIG_DESCRIPTOR_UUID.to_string(),
            "00002902-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn should_default_to_fall_service() {
        let profile = GattProfile::default();
        assert_eq!(profile.service, FALL_SERVICE_UUID);
        assert_eq!(profile.characteristic, FALL_CHARACTERISTIC_UUID);
    }
}
