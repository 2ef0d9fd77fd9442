//! Virtual peripheral configuration.

use std::time::Duration;

use serde::Deserialize;

use falldetect_domain::profile::{DEFAULT_TARGET_NAME, GattProfile};

/// Behaviour of the simulated fall sensor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    /// Name the simulated sensor advertises.
    pub device_name: String,
    /// Address the simulated sensor advertises from.
    pub address: String,
    /// GATT layout the sensor exposes.
    pub profile: GattProfile,
    /// Raw messages pushed once subscribed, in order.
    pub messages: Vec<String>,
    /// Delay before each message, in milliseconds.
    pub message_interval_ms: u64,
    /// Delay between advertisement bursts while scanning, in milliseconds.
    pub advertise_interval_ms: u64,
}

impl VirtualConfig {
    pub(crate) fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms)
    }

    pub(crate) fn advertise_interval(&self) -> Duration {
        Duration::from_millis(self.advertise_interval_ms)
    }
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_TARGET_NAME.to_string(),
            address: "02:00:00:00:FA:11".to_string(),
            profile: GattProfile::default(),
            messages: vec![
                "FALL:hard:2.3g".to_string(),
                "FALL:soft:0.8".to_string(),
            ],
            message_interval_ms: 6_000,
            advertise_interval_ms: 1_000,
        }
    }
}
