//! GATT helpers — catalog building and characteristic lookup.

use btleplug::api::{Characteristic, Service};

use falldetect_domain::device::{DiscoveredService, GattCatalog};
use falldetect_domain::profile::GattProfile;

use crate::error::BleError;

/// Build the port-level catalog from `(service, characteristics)` UUID pairs.
pub(crate) fn build_catalog<S, C>(services: S) -> GattCatalog
where
    S: IntoIterator<Item = (uuid::Uuid, C)>,
    C: IntoIterator<Item = uuid::Uuid>,
{
    GattCatalog {
        services: services
            .into_iter()
            .map(|(uuid, characteristics)| DiscoveredService {
                uuid,
                characteristics: characteristics.into_iter().collect(),
            })
            .collect(),
    }
}

/// Catalog of the services a peripheral has discovered.
pub(crate) fn catalog_of<'a>(services: impl IntoIterator<Item = &'a Service>) -> GattCatalog {
    build_catalog(services.into_iter().map(|service| {
        (
            service.uuid,
            service.characteristics.iter().map(|c| c.uuid),
        )
    }))
}

/// Find the profile's characteristic among the discovered ones.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] when the characteristic is
/// absent from the profile's service.
pub(crate) fn find_characteristic(
    characteristics: impl IntoIterator<Item = Characteristic>,
    profile: GattProfile,
) -> Result<Characteristic, BleError> {
    characteristics
        .into_iter()
        .find(|c| c.uuid == profile.characteristic && c.service_uuid == profile.service)
        .ok_or(BleError::CharacteristicNotFound {
            uuid: profile.characteristic,
        })
}
