//! Fall-detection pipeline — scan, connect, subscribe, parse, dispatch.
//!
//! All transport callbacks and control commands are serialized as
//! [`PipelineMessage`]s onto a single owner task running
//! [`FallPipeline::run`]. The owner holds the scanner, the connection state
//! machine, and the dispatcher; nothing else mutates them. Accepted events
//! leave through the registered consumer, which must not block (see
//! [`SinkRelay`](crate::relay::SinkRelay)).
//!
//! Recovery is a single rule: whenever the connection closes for a reason
//! other than a configuration mismatch, scanning resumes. There is no retry
//! limit.

pub mod connection;
pub mod dispatcher;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use falldetect_domain::device::DeviceAddress;
use falldetect_domain::fall_event::FallEvent;
use falldetect_domain::profile::{DEFAULT_TARGET_NAME, GattProfile};

use crate::ports::{BleTransport, PermissionGate, TransportError, TransportEvent};

use connection::{ConnectionStateMachine, Recovery};
use dispatcher::{DEFAULT_SUPPRESSION_WINDOW, EventDispatcher};
use scanner::PeripheralScanner;

/// Errors surfaced by pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The permission gate is closed.
    #[error("required BLE permissions not granted")]
    PermissionDenied,

    /// A connection session is already open.
    #[error("a connection session is already active")]
    SessionActive,

    /// The transport refused a command.
    #[error("transport error")]
    Transport(#[from] TransportError),

    /// The pipeline task has shut down.
    #[error("pipeline is shut down")]
    Closed,
}

/// Static pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Advertised name of the peripheral to connect to.
    pub target_name: String,
    /// Service/characteristic pair to subscribe to.
    pub profile: GattProfile,
    /// Duplicate suppression window.
    pub suppression_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            profile: GattProfile::default(),
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
        }
    }
}

/// Commands from the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Start (or resume) scanning for the peripheral.
    StartScanning,
    /// Stop scanning; an open connection is kept.
    StopScanning,
    /// Stop scanning, close the connection, and ignore everything after.
    Shutdown,
}

/// Everything the owner task consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineMessage {
    /// Asynchronous outcome from the transport.
    Transport(TransportEvent),
    /// Host command.
    Control(Control),
}

impl From<TransportEvent> for PipelineMessage {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}

impl From<Control> for PipelineMessage {
    fn from(control: Control) -> Self {
        Self::Control(control)
    }
}

/// Receiving end of the pipeline's message channel.
#[derive(Debug)]
pub struct Inbox(mpsc::UnboundedReceiver<PipelineMessage>);

impl Inbox {
    /// Wait for the next message. `None` once every handle is dropped.
    pub async fn recv(&mut self) -> Option<PipelineMessage> {
        self.0.recv().await
    }
}

/// Cloneable sending end of the pipeline's message channel.
///
/// Transports report their callbacks through [`report`](Self::report); the
/// host drives the pipeline with the control methods. Once the owner task
/// has stopped, reports are silently dropped.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    sender: mpsc::UnboundedSender<PipelineMessage>,
}

impl PipelineHandle {
    /// Create a connected handle/inbox pair.
    #[must_use]
    pub fn channel() -> (Self, Inbox) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, Inbox(receiver))
    }

    /// Report a transport callback to the owner task.
    pub fn report(&self, event: TransportEvent) {
        if self.sender.send(event.into()).is_err() {
            tracing::trace!("pipeline stopped, dropping transport event");
        }
    }

    /// Ask the pipeline to start scanning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Closed`] when the owner task has stopped.
    pub fn start_scanning(&self) -> Result<(), PipelineError> {
        self.control(Control::StartScanning)
    }

    /// Ask the pipeline to stop scanning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Closed`] when the owner task has stopped.
    pub fn stop_scanning(&self) -> Result<(), PipelineError> {
        self.control(Control::StopScanning)
    }

    /// Ask the pipeline to tear down.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Closed`] when the owner task has stopped.
    pub fn shutdown(&self) -> Result<(), PipelineError> {
        self.control(Control::Shutdown)
    }

    /// Whether the owner task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn control(&self, control: Control) -> Result<(), PipelineError> {
        self.sender
            .send(control.into())
            .map_err(|_| PipelineError::Closed)
    }
}

/// The pipeline state, owned by a single task.
#[derive(Debug)]
pub struct FallPipeline<T, G> {
    transport: T,
    gate: G,
    scanner: PeripheralScanner,
    connection: ConnectionStateMachine,
    dispatcher: EventDispatcher,
    running: bool,
}

impl<T: BleTransport, G: PermissionGate> FallPipeline<T, G> {
    /// Build an idle pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig, transport: T, gate: G) -> Self {
        Self {
            transport,
            gate,
            scanner: PeripheralScanner::new(config.target_name),
            connection: ConnectionStateMachine::new(config.profile),
            dispatcher: EventDispatcher::new(config.suppression_window),
            running: true,
        }
    }

    /// Register the consumer of accepted events, replacing any previous one.
    pub fn register_consumer(&mut self, consumer: impl FnMut(FallEvent) + Send + 'static) {
        self.dispatcher.register(consumer);
    }

    /// The scanner.
    #[must_use]
    pub fn scanner(&self) -> &PeripheralScanner {
        &self.scanner
    }

    /// The connection state machine.
    #[must_use]
    pub fn connection(&self) -> &ConnectionStateMachine {
        &self.connection
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Whether the pipeline still acts on messages.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Apply one message. Returns `false` once the pipeline has shut down.
    pub fn handle(&mut self, message: PipelineMessage) -> bool {
        if !self.running {
            tracing::trace!(?message, "pipeline stopped, ignoring message");
            return false;
        }

        match message {
            PipelineMessage::Control(Control::StartScanning) => self.resume_scanning(),
            PipelineMessage::Control(Control::StopScanning) => {
                self.scanner.stop_scanning(&self.transport);
            }
            PipelineMessage::Control(Control::Shutdown) => self.teardown(),
            PipelineMessage::Transport(event) => self.on_transport(event),
        }

        self.running
    }

    fn on_transport(&mut self, event: TransportEvent) {
        let recovery = match event {
            TransportEvent::Advertisement(advertisement) => {
                if let Some(address) = self
                    .scanner
                    .on_advertisement(&advertisement, &self.transport)
                {
                    self.connect(address);
                }
                Recovery::None
            }
            TransportEvent::ScanFailed { reason } => {
                self.scanner.on_scan_failed(&reason);
                Recovery::None
            }
            TransportEvent::LinkEstablished { session } => self
                .connection
                .on_link_established(session, &self.transport),
            TransportEvent::ConnectFailed { session, reason } => {
                self.connection
                    .on_connect_failed(session, &reason, &self.transport)
            }
            TransportEvent::ServicesDiscovered { session, catalog } => {
                self.connection
                    .on_services_discovered(session, &catalog, &self.transport)
            }
            TransportEvent::SubscribeFailed { session, reason } => {
                self.connection
                    .on_subscribe_failed(session, &reason, &self.transport)
            }
            TransportEvent::Notification {
                session,
                characteristic,
                value,
            } => {
                let received_at = falldetect_domain::time::now();
                if let Some(event) =
                    self.connection
                        .on_notification(session, characteristic, &value, &received_at)
                {
                    let now = tokio::time::Instant::now().into_std();
                    self.dispatcher.on_event(event, now);
                }
                Recovery::None
            }
            TransportEvent::LinkLost { session } => {
                self.connection.on_link_lost(session, &self.transport)
            }
        };

        if recovery == Recovery::Rescan {
            self.resume_scanning();
        }
    }

    fn connect(&mut self, address: DeviceAddress) {
        match self
            .connection
            .connect(address, &self.transport, &self.gate)
        {
            Ok(_) | Err(PipelineError::PermissionDenied) => {}
            Err(PipelineError::Transport(err)) => {
                tracing::warn!(%err, "could not start connection, resuming scan");
                self.resume_scanning();
            }
            Err(err) => tracing::warn!(%err, "not connecting to peripheral"),
        }
    }

    fn resume_scanning(&mut self) {
        if let Err(err) = self.scanner.start_scanning(&self.transport, &self.gate) {
            tracing::warn!(%err, "could not start BLE scan");
        }
    }

    fn teardown(&mut self) {
        tracing::info!("shutting down fall pipeline");
        self.running = false;
        self.scanner.stop_scanning(&self.transport);
        self.connection.close(&self.transport);
    }
}

impl<T, G> FallPipeline<T, G>
where
    T: BleTransport + Send + 'static,
    G: PermissionGate + Send + 'static,
{
    /// Consume messages until [`Control::Shutdown`] arrives.
    ///
    /// A live transport keeps its own handle clone, so in practice only
    /// `Shutdown` ends the loop. Running out of handles also ends it, which
    /// only happens when nothing else holds one. The inbox is dropped on
    /// return, so transports reporting late callbacks find the channel
    /// closed.
    pub async fn run(mut self, mut inbox: Inbox) {
        while let Some(message) = inbox.recv().await {
            if !self.handle(message) {
                break;
            }
        }

        if self.running {
            self.teardown();
        }
        tracing::debug!("fall pipeline stopped");
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn spawn(self, inbox: Inbox) -> JoinHandle<()> {
        tokio::spawn(self.run(inbox))
    }
}
