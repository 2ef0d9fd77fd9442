//! Simulated fall sensor behind the [`BleTransport`] port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use falldetect_app::pipeline::PipelineHandle;
use falldetect_app::ports::{BleTransport, TransportError, TransportEvent};
use falldetect_domain::device::{
    Advertisement, DeviceAddress, DiscoveredService, GattCatalog, SessionId,
};
use falldetect_domain::profile::{
    CLIENT_CONFIG_DESCRIPTOR_UUID, ENABLE_NOTIFICATION_VALUE, GattProfile,
};

use crate::config::VirtualConfig;

/// Address of the unrelated device advertising next to the sensor.
const DECOY_ADDRESS: &str = "02:00:00:00:DE:C0";
const DECOY_NAME: &str = "Headphones";

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One open link to the simulated sensor.
#[derive(Default)]
struct VirtualLink {
    /// Value of the characteristic's client configuration descriptor.
    client_config: [u8; 2],
    /// Message pump, once notifications are enabled.
    pump: Option<JoinHandle<()>>,
}

impl VirtualLink {
    fn close(self) {
        if let Some(pump) = self.pump {
            pump.abort();
        }
    }
}

/// In-process stand-in for the BLE radio and the fall sensor.
///
/// While scanning it advertises an unrelated device followed by the sensor,
/// repeatedly. Connecting to the sensor's address always succeeds; once
/// notifications are enabled the configured messages are pushed one by one.
/// [`drop_link`](Self::drop_link) simulates the sensor walking out of range.
pub struct VirtualTransport {
    config: Arc<VirtualConfig>,
    pipeline: PipelineHandle,
    scan: Mutex<Option<JoinHandle<()>>>,
    links: Mutex<HashMap<SessionId, VirtualLink>>,
}

impl VirtualTransport {
    /// Create a transport reporting to `pipeline`.
    #[must_use]
    pub fn new(config: VirtualConfig, pipeline: PipelineHandle) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            scan: Mutex::new(None),
            links: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every open link as if the sensor went out of range.
    ///
    /// Returns whether a link was open.
    pub fn drop_link(&self) -> bool {
        let dropped: Vec<(SessionId, VirtualLink)> = locked(&self.links).drain().collect();
        let any = !dropped.is_empty();

        for (session, link) in dropped {
            link.close();
            tracing::info!(%session, "virtual sensor out of range");
            self.pipeline.report(TransportEvent::LinkLost { session });
        }
        any
    }

    /// Number of open links.
    #[must_use]
    pub fn open_links(&self) -> usize {
        locked(&self.links).len()
    }

    /// Client configuration descriptor value last written on `session`.
    #[must_use]
    pub fn client_config(&self, session: SessionId) -> Option<[u8; 2]> {
        locked(&self.links)
            .get(&session)
            .map(|link| link.client_config)
    }

    fn catalog(&self) -> GattCatalog {
        GattCatalog {
            services: vec![DiscoveredService {
                uuid: self.config.profile.service,
                characteristics: vec![self.config.profile.characteristic],
            }],
        }
    }
}

impl Drop for VirtualTransport {
    fn drop(&mut self) {
        if let Some(scan) = locked(&self.scan).take() {
            scan.abort();
        }
        for (_, link) in locked(&self.links).drain() {
            link.close();
        }
    }
}

impl BleTransport for VirtualTransport {
    fn start_scan(&self) -> Result<(), TransportError> {
        let config = Arc::clone(&self.config);
        let pipeline = self.pipeline.clone();

        let task = tokio::spawn(async move {
            let decoy = Advertisement {
                address: DeviceAddress::new(DECOY_ADDRESS),
                name: Some(DECOY_NAME.to_string()),
            };
            let sensor = Advertisement {
                address: DeviceAddress::new(config.address.clone()),
                name: Some(config.device_name.clone()),
            };
            loop {
                pipeline.report(TransportEvent::Advertisement(decoy.clone()));
                pipeline.report(TransportEvent::Advertisement(sensor.clone()));
                tokio::time::sleep(config.advertise_interval()).await;
            }
        });

        if let Some(previous) = locked(&self.scan).replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        if let Some(scan) = locked(&self.scan).take() {
            scan.abort();
        }
        Ok(())
    }

    fn connect(&self, session: SessionId, address: &DeviceAddress) -> Result<(), TransportError> {
        if address.as_str() != self.config.address {
            self.pipeline.report(TransportEvent::ConnectFailed {
                session,
                reason: format!("no virtual peripheral at {address}"),
            });
            return Ok(());
        }

        locked(&self.links).insert(session, VirtualLink::default());
        self.pipeline
            .report(TransportEvent::LinkEstablished { session });
        Ok(())
    }

    fn discover_services(&self, session: SessionId) -> Result<(), TransportError> {
        if !locked(&self.links).contains_key(&session) {
            return Err(TransportError::new(
                "discover_services",
                format!("no open link for session {session}"),
            ));
        }

        self.pipeline.report(TransportEvent::ServicesDiscovered {
            session,
            catalog: self.catalog(),
        });
        Ok(())
    }

    fn enable_notifications(
        &self,
        session: SessionId,
        profile: GattProfile,
    ) -> Result<(), TransportError> {
        let mut links = locked(&self.links);
        let Some(link) = links.get_mut(&session) else {
            return Err(TransportError::new(
                "enable_notifications",
                format!("no open link for session {session}"),
            ));
        };

        link.client_config = ENABLE_NOTIFICATION_VALUE;
        tracing::debug!(
            %session,
            descriptor = %CLIENT_CONFIG_DESCRIPTOR_UUID,
            "virtual sensor notifications enabled"
        );

        let config = Arc::clone(&self.config);
        let pipeline = self.pipeline.clone();
        let pump = tokio::spawn(async move {
            for message in &config.messages {
                tokio::time::sleep(config.message_interval()).await;
                tracing::debug!(%session, payload = %message, "virtual sensor notifying");
                pipeline.report(TransportEvent::Notification {
                    session,
                    characteristic: profile.characteristic,
                    value: message.as_bytes().to_vec(),
                });
            }
        });

        if let Some(previous) = link.pump.replace(pump) {
            previous.abort();
        }
        Ok(())
    }

    fn disconnect(&self, session: SessionId) {
        if let Some(link) = locked(&self.links).remove(&session) {
            link.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use falldetect_app::pipeline::{FallPipeline, PipelineConfig, PipelineMessage};
    use falldetect_app::ports::AlwaysGranted;
    use falldetect_domain::fall_event::FallEvent;
    use tokio::sync::mpsc;

    fn expect_transport(message: Option<PipelineMessage>) -> TransportEvent {
        match message {
            Some(PipelineMessage::Transport(event)) => event,
            other => panic!("expected transport event, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_advertise_decoy_then_sensor() {
        let (handle, mut inbox) = PipelineHandle::channel();
        let transport = VirtualTransport::new(VirtualConfig::default(), handle);

        transport.start_scan().unwrap();

        let TransportEvent::Advertisement(first) = expect_transport(inbox.recv().await) else {
            panic!("expected advertisement");
        };
        let TransportEvent::Advertisement(second) = expect_transport(inbox.recv().await) else {
            panic!("expected advertisement");
        };
        assert_eq!(first.name.as_deref(), Some(DECOY_NAME));
        assert!(second.is_named("Seeed_BLE"));
    }

    #[tokio::test]
    async fn should_fail_connect_to_unknown_address() {
        let (handle, mut inbox) = PipelineHandle::channel();
        let transport = VirtualTransport::new(VirtualConfig::default(), handle);
        let session = SessionId::from_raw(1);

        transport
            .connect(session, &DeviceAddress::new(DECOY_ADDRESS))
            .unwrap();

        assert!(matches!(
            expect_transport(inbox.recv().await),
            TransportEvent::ConnectFailed { session: s, .. } if s == session
        ));
        assert_eq!(transport.open_links(), 0);
    }

    #[tokio::test]
    async fn should_refuse_discovery_without_link() {
        let (handle, _inbox) = PipelineHandle::channel();
        let transport = VirtualTransport::new(VirtualConfig::default(), handle);
        assert!(
            transport
                .discover_services(SessionId::from_raw(7))
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_push_scripted_messages_once_subscribed() {
        let (handle, mut inbox) = PipelineHandle::channel();
        let config = VirtualConfig::default();
        let address = DeviceAddress::new(config.address.clone());
        let transport = VirtualTransport::new(config, handle);
        let session = SessionId::from_raw(1);

        transport.connect(session, &address).unwrap();
        transport.discover_services(session).unwrap();
        transport
            .enable_notifications(session, GattProfile::default())
            .unwrap();

        assert_eq!(
            expect_transport(inbox.recv().await),
            TransportEvent::LinkEstablished { session }
        );
        assert!(matches!(
            expect_transport(inbox.recv().await),
            TransportEvent::ServicesDiscovered { .. }
        ));
        let TransportEvent::Notification { value, .. } = expect_transport(inbox.recv().await)
        else {
            panic!("expected notification");
        };
        assert_eq!(value, b"FALL:hard:2.3g");
    }

    #[tokio::test]
    async fn should_write_client_config_descriptor_on_subscribe() {
        let (handle, _inbox) = PipelineHandle::channel();
        let config = VirtualConfig::default();
        let address = DeviceAddress::new(config.address.clone());
        let transport = VirtualTransport::new(config, handle);
        let session = SessionId::from_raw(2);

        assert_eq!(transport.client_config(session), None);
        transport.connect(session, &address).unwrap();
        transport.discover_services(session).unwrap();
        assert_eq!(transport.client_config(session), Some([0x00, 0x00]));

        transport
            .enable_notifications(session, GattProfile::default())
            .unwrap();
        assert_eq!(transport.client_config(session), Some([0x01, 0x00]));

        transport.disconnect(session);
        assert_eq!(transport.client_config(session), None);
    }

    #[tokio::test]
    async fn should_report_link_lost_when_dropped() {
        let (handle, mut inbox) = PipelineHandle::channel();
        let config = VirtualConfig::default();
        let address = DeviceAddress::new(config.address.clone());
        let transport = VirtualTransport::new(config, handle);
        let session = SessionId::from_raw(4);
        transport.connect(session, &address).unwrap();
        let _ = inbox.recv().await;

        assert!(transport.drop_link());
        assert!(!transport.drop_link());
        assert_eq!(
            expect_transport(inbox.recv().await),
            TransportEvent::LinkLost { session }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_drive_pipeline_through_reconnect() {
        let (handle, inbox) = PipelineHandle::channel();
        let transport = Arc::new(VirtualTransport::new(
            VirtualConfig::default(),
            handle.clone(),
        ));
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<FallEvent>();

        let mut pipeline = FallPipeline::new(
            PipelineConfig::default(),
            Arc::clone(&transport),
            AlwaysGranted,
        );
        pipeline.register_consumer(move |event| {
            let _ = events_tx.send(event);
        });
        let task = pipeline.spawn(inbox);
        handle.start_scanning().unwrap();

        let first = tokio::time::timeout(Duration::from_secs(30), events_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.fall_type(), "Hard Fall");
        assert_eq!(transport.open_links(), 1);

        assert!(transport.drop_link());

        let again = tokio::time::timeout(Duration::from_secs(30), events_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.fall_type(), "Hard Fall");
        assert_eq!(transport.open_links(), 1);

        handle.shutdown().unwrap();
        task.await.unwrap();
        assert_eq!(transport.open_links(), 0);
    }
}
