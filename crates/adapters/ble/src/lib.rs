//! # falldetect-adapter-ble
//!
//! btleplug-backed BLE transport for the fall-detection pipeline.
//!
//! ## How it works
//!
//! The fall sensor is an active peripheral: the pipeline scans for its
//! advertised name, connects, discovers services, and subscribes to a single
//! notifying characteristic. [`BtleplugTransport`] implements the
//! [`BleTransport`](falldetect_app::ports::BleTransport) port on top of the
//! host's first BLE adapter and reports every asynchronous outcome back
//! through the pipeline's handle.
//!
//! | Step | btleplug call | Reported as |
//! |------|---------------|-------------|
//! | scan | `Central::start_scan` | `Advertisement` / `ScanFailed` |
//! | connect | `Peripheral::connect` (with timeout) | `LinkEstablished` / `ConnectFailed` |
//! | discover | `Peripheral::discover_services` | `ServicesDiscovered` |
//! | subscribe | `Peripheral::subscribe` + `notifications` | `Notification` / `SubscribeFailed` |
//! | link drop | `CentralEvent::DeviceDisconnected` | `LinkLost` |
//!
//! `Peripheral::subscribe` writes the client configuration descriptor
//! itself, so the enable value never has to be written by hand.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `falldetect-app` and `falldetect-domain`.

mod config;
mod error;
mod gatt;
mod transport;

pub use config::BleConfig;
pub use error::BleError;
pub use transport::BtleplugTransport;
