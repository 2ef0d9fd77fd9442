//! BLE adapter error types.

use falldetect_app::ports::TransportError;
use falldetect_domain::device::{DeviceAddress, SessionId};

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// A btleplug adapter or peripheral operation failed.
    #[error("BLE adapter error")]
    Adapter(#[from] btleplug::Error),

    /// Connect was requested for an address never seen while scanning.
    #[error("peripheral {0} has not been seen while scanning")]
    UnknownPeripheral(DeviceAddress),

    /// A command referenced a session with no open link.
    #[error("no open link for session {0}")]
    UnknownSession(SessionId),

    /// A required GATT characteristic is not present on the peripheral.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound {
        /// UUID of the missing characteristic.
        uuid: uuid::Uuid,
    },

    /// A peripheral operation did not finish in time.
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Configured limit.
        secs: u64,
    },
}

impl BleError {
    /// Wrap into the port-level error for `operation`.
    #[must_use]
    pub fn into_transport(self, operation: &'static str) -> TransportError {
        TransportError::new(operation, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_adapter_error() {
        let err = BleError::Adapter(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE adapter error");
    }

    #[test]
    fn should_display_unknown_peripheral() {
        let err = BleError::UnknownPeripheral(DeviceAddress::new("AA:BB:CC:DD:EE:FF"));
        assert_eq!(
            err.to_string(),
            "peripheral AA:BB:CC:DD:EE:FF has not been seen while scanning"
        );
    }

    #[test]
    fn should_display_timeout() {
        let err = BleError::Timeout {
            operation: "connect",
            secs: 10,
        };
        assert_eq!(err.to_string(), "connect timed out after 10s");
    }

    #[test]
    fn should_keep_source_when_wrapped_for_transport() {
        let err = BleError::UnknownSession(SessionId::from_raw(3)).into_transport("discover_services");
        assert_eq!(err.operation, "discover_services");
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "no open link for session #3"
        );
    }
}
