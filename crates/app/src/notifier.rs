//! Log-only alert notifier.

use std::future::Future;

use falldetect_domain::account::UserId;
use falldetect_domain::error::FallDetectError;

use crate::ports::{AlertNotifier, FallAlert};

/// Writes every alert to the log at `WARN` level.
///
/// Stands in for a push-notification service when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl AlertNotifier for TracingNotifier {
    fn notify(
        &self,
        recipient: &UserId,
        alert: &FallAlert,
    ) -> impl Future<Output = Result<(), FallDetectError>> + Send {
        tracing::warn!(
            recipient = %recipient,
            title = %alert.title,
            body = %alert.body,
            "fall alert"
        );
        async { Ok(()) }
    }
}
