//! Notifier port — alert delivery to a person.

use std::future::Future;

use falldetect_domain::account::UserId;
use falldetect_domain::error::FallDetectError;
use falldetect_domain::fall_event::FallEvent;

/// A human-readable fall alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallAlert {
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub body: String,
}

impl FallAlert {
    /// Build the standard alert for a detected fall.
    #[must_use]
    pub fn for_event(event: &FallEvent) -> Self {
        Self {
            title: "Fall Detected!".to_string(),
            body: format!(
                "Type: {}, Impact Intensity: {} g",
                event.fall_type(),
                event.impact_severity()
            ),
        }
    }
}

/// Delivers alerts to an account (push notification, SMS, …).
pub trait AlertNotifier {
    /// Send `alert` to `recipient`.
    fn notify(
        &self,
        recipient: &UserId,
        alert: &FallAlert,
    ) -> impl Future<Output = Result<(), FallDetectError>> + Send;
}
