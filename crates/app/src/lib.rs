//! # falldetect-app
//!
//! Application layer — the fall-detection pipeline and **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `BleTransport` — scan, connect, discover, subscribe, disconnect
//!   - `PermissionGate` — whether the host allows BLE access
//!   - `EventSink` — where accepted fall events go
//!   - `FallEventRepository` / `LinkRepository` — fall log persistence
//!   - `AlertNotifier` — alert delivery to the caregiver
//! - Run the **pipeline**: scanner → connection state machine → wire codec
//!   → duplicate-suppressing dispatcher, serialized on one owner task
//! - Relay accepted events to the sink off the owner task
//! - Provide the **fall log** use-cases (record, fan out, alert, history)
//!
//! ## Dependency rule
//! Depends on `falldetect-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod notifier;
pub mod pipeline;
pub mod ports;
pub mod relay;
pub mod services;
