//! Peripheral identity, advertisements, and connection sessions.

use std::fmt;

/// Platform address of a peripheral.
///
/// A MAC address on Linux/Android, a UUID string on macOS/Windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Wrap a platform address string.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Borrow the address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One advertisement seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Address of the advertising peripheral.
    pub address: DeviceAddress,
    /// Advertised local name, if any.
    pub name: Option<String>,
}

impl Advertisement {
    /// Whether the advertised name equals `target`, ignoring case.
    ///
    /// Case folding follows Unicode lowercase mapping, not just ASCII.
    #[must_use]
    pub fn is_named(&self, target: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name == target || name.to_lowercase() == target.to_lowercase())
    }
}

/// Identifier of one connection attempt.
///
/// Allocated fresh for every `connect`; transport callbacks carry it so
/// that late callbacks from an abandoned session can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw generation number.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The session that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A discovered GATT service and the characteristics it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    /// Service UUID.
    pub uuid: uuid::Uuid,
    /// Characteristic UUIDs within the service.
    pub characteristics: Vec<uuid::Uuid>,
}

/// Service/characteristic catalog reported after service discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GattCatalog {
    /// Every discovered service.
    pub services: Vec<DiscoveredService>,
}

impl GattCatalog {
    /// Look up a service by UUID.
    #[must_use]
    pub fn service(&self, uuid: uuid::Uuid) -> Option<&DiscoveredService> {
        self.services.iter().find(|s| s.uuid == uuid)
    }
}

impl DiscoveredService {
    /// Whether the service exposes the given characteristic.
    #[must_use]
    pub fn has_characteristic(&self, uuid: uuid::Uuid) -> bool {
        self.characteristics.contains(&uuid)
    }
}
