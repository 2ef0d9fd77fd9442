//! Permission gate port — whether the host currently allows BLE access.

use std::sync::Arc;

/// Answers whether scanning and connecting are currently permitted.
///
/// Checked before every scan start and every connect; a `false` answer
/// makes the operation a logged no-op.
pub trait PermissionGate {
    /// `true` when every permission needed for scan + connect is granted.
    fn has_required_permissions(&self) -> bool;
}

/// Gate for hosts without runtime BLE permissions (desktop Linux, macOS).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    fn has_required_permissions(&self) -> bool {
        true
    }
}

impl<T: PermissionGate> PermissionGate for Arc<T> {
    fn has_required_permissions(&self) -> bool {
        (**self).has_required_permissions()
    }
}
