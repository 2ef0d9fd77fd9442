//! btleplug-backed [`BleTransport`].
//!
//! Every command starts its work on a spawned task and returns at once;
//! outcomes travel back to the pipeline as [`TransportEvent`]s through the
//! [`PipelineHandle`]. One background task pumps the adapter's
//! [`CentralEvent`] stream, turning discoveries into advertisements and
//! disconnects into link losses.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt as _};

use falldetect_app::pipeline::PipelineHandle;
use falldetect_app::ports::{BleTransport, TransportError, TransportEvent};
use falldetect_domain::device::{Advertisement, DeviceAddress, SessionId};
use falldetect_domain::profile::GattProfile;

use crate::config::BleConfig;
use crate::error::BleError;
use crate::gatt;

type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

/// State of one connection session.
#[derive(Default)]
struct Link {
    /// Set once the link is up.
    peripheral: Option<Peripheral>,
    /// Task forwarding notifications, once subscribed.
    notifications: Option<JoinHandle<()>>,
}

struct Shared {
    adapter: Adapter,
    runtime: Handle,
    pipeline: PipelineHandle,
    connect_timeout: Duration,
    discovery_timeout: Duration,
    scanning: AtomicBool,
    /// Peripherals seen while scanning, by reported address.
    known: Mutex<HashMap<DeviceAddress, PeripheralId>>,
    links: Mutex<HashMap<SessionId, Link>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn peripheral(&self, session: SessionId) -> Option<Peripheral> {
        locked(&self.links)
            .get(&session)
            .and_then(|link| link.peripheral.clone())
    }

    async fn on_discovered(&self, id: &PeripheralId) {
        if !self.scanning.load(Ordering::SeqCst) {
            return;
        }
        let Ok(peripheral) = self.adapter.peripheral(id).await else {
            return;
        };
        let Ok(Some(properties)) = peripheral.properties().await else {
            return;
        };

        let address = DeviceAddress::new(properties.address.to_string());
        tracing::trace!(%address, name = ?properties.local_name, "BLE device detected");
        locked(&self.known).insert(address.clone(), id.clone());

        if let Some(advertisement) = named_advertisement(address, properties.local_name) {
            self.pipeline
                .report(TransportEvent::Advertisement(advertisement));
        }
    }

    fn on_disconnected(&self, id: &PeripheralId) {
        let sessions: Vec<SessionId> = locked(&self.links)
            .iter()
            .filter(|(_, link)| link.peripheral.as_ref().is_some_and(|p| p.id() == *id))
            .map(|(session, _)| *session)
            .collect();

        for session in sessions {
            tracing::debug!(%session, "peripheral disconnected");
            self.pipeline.report(TransportEvent::LinkLost { session });
        }
    }

    async fn connect(self: Arc<Self>, session: SessionId, id: PeripheralId) {
        let result = async {
            let peripheral = self.adapter.peripheral(&id).await?;
            tokio::time::timeout(self.connect_timeout, peripheral.connect())
                .await
                .map_err(|_| BleError::Timeout {
                    operation: "connect",
                    secs: self.connect_timeout.as_secs(),
                })??;
            Ok::<_, BleError>(peripheral)
        }
        .await;

        let peripheral = match result {
            Ok(peripheral) => peripheral,
            Err(err) => {
                self.pipeline.report(TransportEvent::ConnectFailed {
                    session,
                    reason: err.to_string(),
                });
                return;
            }
        };

        let attached = match locked(&self.links).get_mut(&session) {
            Some(link) => {
                link.peripheral = Some(peripheral.clone());
                true
            }
            None => false,
        };

        if attached {
            self.pipeline
                .report(TransportEvent::LinkEstablished { session });
        } else {
            tracing::debug!(%session, "session closed while connecting, dropping link");
            if let Err(err) = peripheral.disconnect().await {
                tracing::warn!(%err, %session, "failed to disconnect peripheral");
            }
        }
    }

    async fn discover(self: Arc<Self>, session: SessionId, peripheral: Peripheral) {
        let result = tokio::time::timeout(self.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| BleError::Timeout {
                operation: "discover_services",
                secs: self.discovery_timeout.as_secs(),
            })
            .and_then(|inner| inner.map_err(BleError::from));

        match result {
            Ok(()) => {
                let catalog = gatt::catalog_of(&peripheral.services());
                tracing::debug!(%session, services = catalog.services.len(), "services discovered");
                self.pipeline
                    .report(TransportEvent::ServicesDiscovered { session, catalog });
            }
            Err(err) => {
                tracing::warn!(%err, %session, "service discovery failed");
                self.pipeline.report(TransportEvent::LinkLost { session });
            }
        }
    }

    async fn subscribe(self: Arc<Self>, session: SessionId, peripheral: Peripheral, profile: GattProfile) {
        let result = async {
            let characteristic = gatt::find_characteristic(peripheral.characteristics(), profile)?;
            // Open the stream first so the first notification is not missed.
            let notifications = peripheral.notifications().await?;
            peripheral.subscribe(&characteristic).await?;
            Ok::<_, BleError>(notifications)
        }
        .await;

        let mut notifications = match result {
            Ok(stream) => stream,
            Err(err) => {
                self.pipeline.report(TransportEvent::SubscribeFailed {
                    session,
                    reason: err.to_string(),
                });
                return;
            }
        };

        let pipeline = self.pipeline.clone();
        let pump = self.runtime.spawn(async move {
            while let Some(notification) = notifications.next().await {
                pipeline.report(TransportEvent::Notification {
                    session,
                    characteristic: notification.uuid,
                    value: notification.value,
                });
            }
            tracing::debug!(%session, "notification stream ended");
        });

        match locked(&self.links).get_mut(&session) {
            Some(link) => link.notifications = Some(pump),
            None => pump.abort(),
        }
    }
}

/// The advertisement to report for a discovery, once the name is known.
///
/// BlueZ often announces a device before its local name resolves; the name
/// then arrives with a later `DeviceUpdated`, which is reported instead.
fn named_advertisement(address: DeviceAddress, local_name: Option<String>) -> Option<Advertisement> {
    let name = local_name.filter(|name| !name.trim().is_empty())?;
    Some(Advertisement {
        address,
        name: Some(name),
    })
}

async fn pump_central_events(shared: Arc<Shared>, mut events: CentralEvents) {
    while let Some(event) = events.next().await {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                shared.on_discovered(&id).await;
            }
            CentralEvent::DeviceDisconnected(id) => shared.on_disconnected(&id),
            _ => {}
        }
    }
    tracing::warn!("BLE adapter event stream ended");
}

/// [`BleTransport`] over the host's first BLE adapter.
pub struct BtleplugTransport {
    shared: Arc<Shared>,
    events: JoinHandle<()>,
}

impl BtleplugTransport {
    /// Open the first BLE adapter and start listening to its events.
    ///
    /// Must be called from within a tokio runtime; spawned work runs on it.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::NotAvailable`] when the host has no adapter, or
    /// [`BleError::Adapter`] when btleplug fails to initialise.
    pub async fn start(config: &BleConfig, pipeline: PipelineHandle) -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BleError::NotAvailable)?;
        let events = adapter.events().await?;

        if let Ok(info) = adapter.adapter_info().await {
            tracing::info!(adapter = %info, "BLE adapter ready");
        }

        let shared = Arc::new(Shared {
            adapter,
            runtime: Handle::current(),
            pipeline,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            discovery_timeout: Duration::from_secs(config.discovery_timeout_secs),
            scanning: AtomicBool::new(false),
            known: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
        });
        let events = tokio::spawn(pump_central_events(Arc::clone(&shared), events));

        Ok(Self { shared, events })
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        self.events.abort();
        for (_, link) in locked(&self.shared.links).drain() {
            if let Some(pump) = link.notifications {
                pump.abort();
            }
        }
    }
}

impl BleTransport for BtleplugTransport {
    fn start_scan(&self) -> Result<(), TransportError> {
        self.shared.scanning.store(true, Ordering::SeqCst);
        locked(&self.shared.known).clear();

        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            if let Err(err) = shared.adapter.start_scan(ScanFilter::default()).await {
                shared.scanning.store(false, Ordering::SeqCst);
                shared.pipeline.report(TransportEvent::ScanFailed {
                    reason: err.to_string(),
                });
            }
        });
        Ok(())
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        self.shared.scanning.store(false, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            if let Err(err) = shared.adapter.stop_scan().await {
                tracing::warn!(%err, "failed to stop BLE scan");
            }
        });
        Ok(())
    }

    fn connect(&self, session: SessionId, address: &DeviceAddress) -> Result<(), TransportError> {
        let id = locked(&self.shared.known)
            .get(address)
            .cloned()
            .ok_or_else(|| BleError::UnknownPeripheral(address.clone()).into_transport("connect"))?;

        locked(&self.shared.links).insert(session, Link::default());
        self.shared
            .runtime
            .spawn(Arc::clone(&self.shared).connect(session, id));
        Ok(())
    }

    fn discover_services(&self, session: SessionId) -> Result<(), TransportError> {
        let peripheral = self
            .shared
            .peripheral(session)
            .ok_or_else(|| BleError::UnknownSession(session).into_transport("discover_services"))?;

        self.shared
            .runtime
            .spawn(Arc::clone(&self.shared).discover(session, peripheral));
        Ok(())
    }

    fn enable_notifications(
        &self,
        session: SessionId,
        profile: GattProfile,
    ) -> Result<(), TransportError> {
        let peripheral = self.shared.peripheral(session).ok_or_else(|| {
            BleError::UnknownSession(session).into_transport("enable_notifications")
        })?;

        self.shared
            .runtime
            .spawn(Arc::clone(&self.shared).subscribe(session, peripheral, profile));
        Ok(())
    }

    fn disconnect(&self, session: SessionId) {
        let Some(link) = locked(&self.shared.links).remove(&session) else {
            return;
        };
        if let Some(pump) = link.notifications {
            pump.abort();
        }
        if let Some(peripheral) = link.peripheral {
            self.shared.runtime.spawn(async move {
                if let Err(err) = peripheral.disconnect().await {
                    tracing::warn!(%err, %session, "failed to disconnect peripheral");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> DeviceAddress {
        DeviceAddress::new("AA:BB:CC:DD:EE:FF")
    }

    #[test]
    fn should_hold_back_discovery_until_name_resolves() {
        assert!(named_advertisement(address(), None).is_none());

        let update = named_advertisement(address(), Some("Seeed_BLE".to_string())).unwrap();
        assert_eq!(update.address, address());
        assert!(update.is_named("Seeed_BLE"));
    }

    #[test]
    fn should_hold_back_blank_name() {
        assert!(named_advertisement(address(), Some("  ".to_string())).is_none());
    }
}
