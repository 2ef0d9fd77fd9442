//! BLE transport port — the platform radio stack as seen by the pipeline.
//!
//! Commands are fire-and-forget: implementations start the work (usually on
//! their own task) and report the outcome later as a [`TransportEvent`]
//! through the [`PipelineHandle`](crate::pipeline::PipelineHandle) they were
//! built with. No command may block the caller.

use std::sync::Arc;

use falldetect_domain::device::{Advertisement, DeviceAddress, GattCatalog, SessionId};
use falldetect_domain::profile::GattProfile;

/// A transport command could not even be started.
#[derive(Debug, thiserror::Error)]
#[error("BLE {operation} failed")]
pub struct TransportError {
    /// Command that failed (e.g. `"start_scan"`).
    pub operation: &'static str,
    /// Underlying platform error.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    /// Wrap a platform error for the given command.
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Asynchronous outcome reported by the transport.
///
/// Every variant that concerns a connection carries the [`SessionId`]
/// passed to [`BleTransport::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An advertisement was received while scanning.
    Advertisement(Advertisement),
    /// The platform reported a scan failure.
    ScanFailed {
        /// Platform reason.
        reason: String,
    },
    /// The link to the peripheral is up.
    LinkEstablished {
        /// Session the link belongs to.
        session: SessionId,
    },
    /// The connection attempt failed before the link came up.
    ConnectFailed {
        /// Session that failed.
        session: SessionId,
        /// Platform reason.
        reason: String,
    },
    /// Service discovery finished.
    ServicesDiscovered {
        /// Session the catalog belongs to.
        session: SessionId,
        /// Discovered services and characteristics.
        catalog: GattCatalog,
    },
    /// Enabling notifications failed.
    SubscribeFailed {
        /// Session that failed.
        session: SessionId,
        /// Platform reason.
        reason: String,
    },
    /// The peripheral pushed a characteristic value.
    Notification {
        /// Session the notification arrived on.
        session: SessionId,
        /// Characteristic that changed.
        characteristic: uuid::Uuid,
        /// Raw value.
        value: Vec<u8>,
    },
    /// The link dropped.
    LinkLost {
        /// Session that dropped.
        session: SessionId,
    },
}

/// Commands the pipeline issues to the radio stack.
pub trait BleTransport {
    /// Begin passive advertisement scanning.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the scan cannot be started.
    fn start_scan(&self) -> Result<(), TransportError>;

    /// Cancel the running scan.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the platform rejects the request.
    fn stop_scan(&self) -> Result<(), TransportError>;

    /// Open a link to `address` under `session`.
    ///
    /// Reports [`TransportEvent::LinkEstablished`] or
    /// [`TransportEvent::ConnectFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the attempt cannot be started.
    fn connect(&self, session: SessionId, address: &DeviceAddress) -> Result<(), TransportError>;

    /// Discover the services of the peripheral linked under `session`.
    ///
    /// Reports [`TransportEvent::ServicesDiscovered`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when discovery cannot be started.
    fn discover_services(&self, session: SessionId) -> Result<(), TransportError>;

    /// Write the notification-enable value to the characteristic's client
    /// configuration descriptor and start forwarding notifications.
    ///
    /// Reports [`TransportEvent::Notification`]s, or
    /// [`TransportEvent::SubscribeFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the write cannot be started.
    fn enable_notifications(
        &self,
        session: SessionId,
        profile: GattProfile,
    ) -> Result<(), TransportError>;

    /// Close the link of `session` and release its resources.
    ///
    /// Idempotent; unknown or already-closed sessions are ignored.
    fn disconnect(&self, session: SessionId);
}

impl<T: BleTransport> BleTransport for Arc<T> {
    fn start_scan(&self) -> Result<(), TransportError> {
        (**self).start_scan()
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        (**self).stop_scan()
    }

    fn connect(&self, session: SessionId, address: &DeviceAddress) -> Result<(), TransportError> {
        (**self).connect(session, address)
    }

    fn discover_services(&self, session: SessionId) -> Result<(), TransportError> {
        (**self).discover_services(session)
    }

    fn enable_notifications(
        &self,
        session: SessionId,
        profile: GattProfile,
    ) -> Result<(), TransportError> {
        (**self).enable_notifications(session, profile)
    }

    fn disconnect(&self, session: SessionId) {
        (**self).disconnect(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_operation_in_transport_error() {
        let err = TransportError::new("start_scan", "adapter powered off");
        assert_eq!(err.to_string(), "BLE start_scan failed");
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "adapter powered off"
        );
    }
}
