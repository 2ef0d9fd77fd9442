//! Connection state machine for the single fall-sensor peripheral.
//!
//! ```text
//! Disconnected --connect--> Connecting --link up--> ServiceDiscovery
//!      ^                                                  |
//!      |                                   services found | missing: abandon
//!      +------------------ link lost ------- Subscribed <-+
//! ```
//!
//! At most one [`ConnectionSession`] is open at a time. Every transport
//! callback carries the [`SessionId`] it belongs to; callbacks for any other
//! session are stale and ignored. Methods that close the session report
//! whether the caller must resume scanning through [`Recovery`].

use falldetect_domain::device::{DeviceAddress, GattCatalog, SessionId};
use falldetect_domain::fall_event::FallEvent;
use falldetect_domain::profile::GattProfile;
use falldetect_domain::time::Timestamp;
use falldetect_domain::wire;

use crate::pipeline::PipelineError;
use crate::ports::{BleTransport, PermissionGate};

/// Lifecycle of the peripheral connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session is open.
    Disconnected,
    /// Waiting for the link to come up.
    Connecting,
    /// Link is up; waiting for the service catalog.
    ServiceDiscovery,
    /// Notifications are enabled on the fall characteristic.
    Subscribed,
}

/// What the caller must do after a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Recovery {
    /// Nothing; either the session is still open, the callback was stale,
    /// or the session was abandoned on purpose.
    None,
    /// Resume scanning for the peripheral.
    Rescan,
}

/// The open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSession {
    /// Identifier of this connection attempt.
    pub id: SessionId,
    /// Peripheral the session is connected to.
    pub address: DeviceAddress,
}

/// Owns the active session and drives it through discovery and subscription.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    profile: GattProfile,
    state: ConnectionState,
    session: Option<ConnectionSession>,
    next_session: SessionId,
}

impl ConnectionStateMachine {
    /// Create a disconnected machine subscribing to `profile`.
    #[must_use]
    pub fn new(profile: GattProfile) -> Self {
        Self {
            profile,
            state: ConnectionState::Disconnected,
            session: None,
            next_session: SessionId::from_raw(1),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The open session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&ConnectionSession> {
        self.session.as_ref()
    }

    /// Open a session to `address`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::PermissionDenied`] when the gate is closed
    /// - [`PipelineError::SessionActive`] when a session is already open
    /// - [`PipelineError::Transport`] when the connect cannot be started;
    ///   the machine stays [`ConnectionState::Disconnected`]
    pub fn connect(
        &mut self,
        address: DeviceAddress,
        transport: &impl BleTransport,
        gate: &impl PermissionGate,
    ) -> Result<SessionId, PipelineError> {
        if !gate.has_required_permissions() {
            tracing::warn!(%address, "missing BLE permissions, not connecting");
            return Err(PipelineError::PermissionDenied);
        }
        if self.state != ConnectionState::Disconnected {
            return Err(PipelineError::SessionActive);
        }

        let id = self.next_session;
        self.next_session = id.next();

        transport.connect(id, &address)?;

        tracing::info!(session = %id, %address, "connecting to peripheral");
        self.session = Some(ConnectionSession { id, address });
        self.state = ConnectionState::Connecting;
        Ok(id)
    }

    /// The link of `session` is up; start service discovery.
    pub fn on_link_established(
        &mut self,
        session: SessionId,
        transport: &impl BleTransport,
    ) -> Recovery {
        if !self.is_current(session, ConnectionState::Connecting) {
            tracing::debug!(%session, "ignoring stale link-established");
            return Recovery::None;
        }

        tracing::info!(%session, "connected, discovering services");
        self.state = ConnectionState::ServiceDiscovery;

        if let Err(err) = transport.discover_services(session) {
            tracing::warn!(%err, %session, "could not start service discovery");
            self.release(transport);
            return Recovery::Rescan;
        }
        Recovery::None
    }

    /// Service discovery finished; subscribe to the fall characteristic.
    ///
    /// A missing service or characteristic is a configuration mismatch: the
    /// session is abandoned without rescanning.
    pub fn on_services_discovered(
        &mut self,
        session: SessionId,
        catalog: &GattCatalog,
        transport: &impl BleTransport,
    ) -> Recovery {
        if !self.is_current(session, ConnectionState::ServiceDiscovery) {
            tracing::debug!(%session, "ignoring stale service catalog");
            return Recovery::None;
        }

        let Some(service) = catalog.service(self.profile.service) else {
            tracing::error!(
                %session,
                service = %self.profile.service,
                "fall service not found, abandoning connection"
            );
            self.release(transport);
            return Recovery::None;
        };
        if !service.has_characteristic(self.profile.characteristic) {
            tracing::error!(
                %session,
                characteristic = %self.profile.characteristic,
                "fall characteristic not found, abandoning connection"
            );
            self.release(transport);
            return Recovery::None;
        }

        if let Err(err) = transport.enable_notifications(session, self.profile) {
            tracing::warn!(%err, %session, "could not enable notifications");
            self.release(transport);
            return Recovery::Rescan;
        }

        tracing::info!(%session, "subscribed to fall notifications");
        self.state = ConnectionState::Subscribed;
        Recovery::None
    }

    /// Enabling notifications failed after the fact.
    pub fn on_subscribe_failed(
        &mut self,
        session: SessionId,
        reason: &str,
        transport: &impl BleTransport,
    ) -> Recovery {
        if !self.is_open(session) {
            return Recovery::None;
        }
        tracing::warn!(%session, reason, "enabling notifications failed");
        self.release(transport);
        Recovery::Rescan
    }

    /// Decode a notification received on `session`.
    ///
    /// Returns the fall event stamped with `received_at` when the payload
    /// came from the fall characteristic of the subscribed session and
    /// parses cleanly. Anything else is logged and dropped.
    pub fn on_notification(
        &self,
        session: SessionId,
        characteristic: uuid::Uuid,
        value: &[u8],
        received_at: &Timestamp,
    ) -> Option<FallEvent> {
        if !self.is_current(session, ConnectionState::Subscribed) {
            tracing::debug!(%session, "ignoring notification outside subscribed session");
            return None;
        }
        if characteristic != self.profile.characteristic {
            tracing::debug!(%characteristic, "ignoring notification from other characteristic");
            return None;
        }

        let message = String::from_utf8_lossy(value);
        tracing::debug!(%session, %message, "BLE message received");

        match wire::parse(value, received_at) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!(%err, %message, "dropping malformed fall message");
                None
            }
        }
    }

    /// The connect attempt of `session` failed.
    pub fn on_connect_failed(
        &mut self,
        session: SessionId,
        reason: &str,
        transport: &impl BleTransport,
    ) -> Recovery {
        if !self.is_open(session) {
            return Recovery::None;
        }
        tracing::warn!(%session, reason, "connection attempt failed");
        self.release(transport);
        Recovery::Rescan
    }

    /// The link of `session` dropped.
    pub fn on_link_lost(&mut self, session: SessionId, transport: &impl BleTransport) -> Recovery {
        if !self.is_open(session) {
            tracing::debug!(%session, "ignoring stale disconnect");
            return Recovery::None;
        }
        tracing::warn!(%session, "disconnected from peripheral");
        self.release(transport);
        Recovery::Rescan
    }

    /// Close any open session without recovery (teardown).
    pub fn close(&mut self, transport: &impl BleTransport) {
        if self.session.is_some() {
            tracing::info!("closing peripheral connection");
            self.release(transport);
        }
    }

    fn is_open(&self, session: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session)
    }

    fn is_current(&self, session: SessionId, state: ConnectionState) -> bool {
        self.state == state && self.is_open(session)
    }

    fn release(&mut self, transport: &impl BleTransport) {
        if let Some(session) = self.session.take() {
            transport.disconnect(session.id);
        }
        self.state = ConnectionState::Disconnected;
    }
}
