//! Recording fakes of the pipeline's ports, shared by the test modules.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use falldetect_domain::device::{Advertisement, DeviceAddress, SessionId};
use falldetect_domain::profile::GattProfile;

use crate::ports::{BleTransport, PermissionGate, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    StartScan,
    StopScan,
    Connect(SessionId, DeviceAddress),
    DiscoverServices(SessionId),
    EnableNotifications(SessionId, GattProfile),
    Disconnect(SessionId),
}

#[derive(Default)]
pub(crate) struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    pub(crate) fail_start_scan: AtomicBool,
    pub(crate) fail_connect: AtomicBool,
    pub(crate) fail_discover: AtomicBool,
}

impl RecordingTransport {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|c| *c == wanted).count()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl BleTransport for RecordingTransport {
    fn start_scan(&self) -> Result<(), TransportError> {
        if self.fail_start_scan.load(Ordering::SeqCst) {
            return Err(TransportError::new("start_scan", "radio off"));
        }
        self.record(Call::StartScan);
        Ok(())
    }

    fn stop_scan(&self) -> Result<(), TransportError> {
        self.record(Call::StopScan);
        Ok(())
    }

    fn connect(&self, session: SessionId, address: &DeviceAddress) -> Result<(), TransportError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::new("connect", "busy"));
        }
        self.record(Call::Connect(session, address.clone()));
        Ok(())
    }

    fn discover_services(&self, session: SessionId) -> Result<(), TransportError> {
        if self.fail_discover.load(Ordering::SeqCst) {
            return Err(TransportError::new("discover_services", "gatt busy"));
        }
        self.record(Call::DiscoverServices(session));
        Ok(())
    }

    fn enable_notifications(
        &self,
        session: SessionId,
        profile: GattProfile,
    ) -> Result<(), TransportError> {
        self.record(Call::EnableNotifications(session, profile));
        Ok(())
    }

    fn disconnect(&self, session: SessionId) {
        self.record(Call::Disconnect(session));
    }
}

pub(crate) struct Gate(AtomicBool);

impl Gate {
    pub(crate) fn granted() -> Self {
        Self(AtomicBool::new(true))
    }

    pub(crate) fn denied() -> Self {
        Self(AtomicBool::new(false))
    }

    pub(crate) fn set(&self, granted: bool) {
        self.0.store(granted, Ordering::SeqCst);
    }
}

impl PermissionGate for Gate {
    fn has_required_permissions(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) fn advert(address: &str, name: Option<&str>) -> Advertisement {
    Advertisement {
        address: DeviceAddress::new(address),
        name: name.map(str::to_string),
    }
}
