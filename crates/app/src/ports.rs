//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the pipeline and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod event_sink;
pub mod notifier;
pub mod permission;
pub mod storage;
pub mod transport;

pub use event_sink::EventSink;
pub use notifier::{AlertNotifier, FallAlert};
pub use permission::{AlwaysGranted, PermissionGate};
pub use storage::{FallEventRepository, LinkRepository};
pub use transport::{BleTransport, TransportError, TransportEvent};
