//! # falldetect-adapter-virtual
//!
//! Virtual BLE transport that simulates the fall sensor for testing and
//! demonstration, so the whole pipeline can run without radio hardware.
//!
//! ## Simulated behaviour
//!
//! | Step | Behaviour |
//! |------|-----------|
//! | scan | Advertises `Headphones` then the sensor, every `advertise_interval_ms` |
//! | connect | Succeeds for the sensor's address, fails for any other |
//! | discover | Reports the configured service and characteristic |
//! | subscribe | Pushes each configured message after `message_interval_ms` |
//! | [`drop_link`](VirtualTransport::drop_link) | Reports the link as lost |
//!
//! ## Dependency rule
//!
//! Depends on `falldetect-app` (port traits) and `falldetect-domain` only.

mod config;
mod transport;

pub use config::VirtualConfig;
pub use transport::VirtualTransport;
