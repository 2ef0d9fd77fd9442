//! Peripheral scanner — finds the target peripheral by advertised name.
//!
//! Each scan session records every named address it sees once; the first
//! advertisement whose name matches the target (ignoring case) stops the
//! scan and is handed back to the caller for connection. Once stopped, late
//! advertisements are ignored, so a session yields at most one match.
//!
//! Nameless advertisements are not recorded: some stacks report a device
//! before its name resolves, and the named report for the same address
//! must still be able to match.

use std::collections::HashSet;

use falldetect_domain::device::{Advertisement, DeviceAddress};

use crate::pipeline::PipelineError;
use crate::ports::{BleTransport, PermissionGate};

/// Scanner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Not scanning.
    Idle,
    /// A scan session is running.
    Scanning,
}

/// Drives advertisement scanning for a single target name.
#[derive(Debug)]
pub struct PeripheralScanner {
    target_name: String,
    state: ScanState,
    seen: HashSet<DeviceAddress>,
}

impl PeripheralScanner {
    /// Create an idle scanner looking for `target_name`.
    #[must_use]
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            state: ScanState::Idle,
            seen: HashSet::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Name the scanner is looking for.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Number of distinct addresses recorded in the current session.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Start a new scan session.
    ///
    /// A no-op when already scanning. Clears the addresses recorded by the
    /// previous session.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::PermissionDenied`] when the gate is closed
    /// - [`PipelineError::Transport`] when the platform refuses to scan
    pub fn start_scanning(
        &mut self,
        transport: &impl BleTransport,
        gate: &impl PermissionGate,
    ) -> Result<(), PipelineError> {
        if !gate.has_required_permissions() {
            tracing::warn!("missing BLE permissions, not scanning");
            return Err(PipelineError::PermissionDenied);
        }
        if self.state == ScanState::Scanning {
            tracing::debug!("scan already running");
            return Ok(());
        }

        self.seen.clear();
        transport.start_scan()?;
        self.state = ScanState::Scanning;

        tracing::info!(target_name = %self.target_name, "BLE scan started");
        Ok(())
    }

    /// Stop the running scan session. Idempotent.
    pub fn stop_scanning(&mut self, transport: &impl BleTransport) {
        if self.state == ScanState::Idle {
            return;
        }
        self.state = ScanState::Idle;

        if let Err(err) = transport.stop_scan() {
            tracing::warn!(%err, "failed to stop BLE scan");
        } else {
            tracing::info!("BLE scan stopped");
        }
    }

    /// Record one advertisement.
    ///
    /// Returns the address to connect to when the advertisement is the
    /// first one of this session that matches the target name; the scan is
    /// stopped before returning.
    pub fn on_advertisement(
        &mut self,
        advertisement: &Advertisement,
        transport: &impl BleTransport,
    ) -> Option<DeviceAddress> {
        if self.state != ScanState::Scanning {
            return None;
        }
        let Some(name) = advertisement.name.as_deref() else {
            tracing::trace!(address = %advertisement.address, "name not resolved yet");
            return None;
        };
        if !self.seen.insert(advertisement.address.clone()) {
            return None;
        }

        tracing::debug!(address = %advertisement.address, name, "BLE device found");

        if !advertisement.is_named(&self.target_name) {
            return None;
        }

        tracing::info!(address = %advertisement.address, "target peripheral found");
        self.stop_scanning(transport);
        Some(advertisement.address.clone())
    }

    /// Record a platform scan failure.
    ///
    /// The scanner returns to [`ScanState::Idle`] and does not retry on its own.
    pub fn on_scan_failed(&mut self, reason: &str) {
        tracing::warn!(reason, "BLE scan failed");
        self.state = ScanState::Idle;
    }
}
