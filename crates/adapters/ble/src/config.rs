//! BLE adapter configuration.

use serde::Deserialize;

use falldetect_domain::profile::{DEFAULT_TARGET_NAME, GattProfile};

/// Configuration for the btleplug transport and the peripheral it looks for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Advertised name of the fall sensor (compared ignoring case).
    pub target_name: String,
    /// Service and characteristic carrying fall notifications.
    pub profile: GattProfile,
    /// Upper bound on a single connect attempt, in seconds.
    ///
    /// Some BLE stacks block indefinitely on connect when the peripheral
    /// goes away mid-handshake.
    pub connect_timeout_secs: u64,
    /// Upper bound on service discovery, in seconds.
    pub discovery_timeout_secs: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            profile: GattProfile::default(),
            connect_timeout_secs: 10,
            discovery_timeout_secs: 15,
        }
    }
}
