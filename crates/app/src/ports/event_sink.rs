//! Event sink port — the outbound destination of accepted fall events.

use std::future::Future;
use std::sync::Arc;

use falldetect_domain::error::FallDetectError;
use falldetect_domain::fall_event::FallEvent;

/// Consumes accepted fall events (cloud store, caregiver alert, …).
///
/// The pipeline never retries a failed delivery; retry policy, if any,
/// belongs to the implementation.
pub trait EventSink {
    /// Deliver one event.
    fn deliver(&self, event: FallEvent) -> impl Future<Output = Result<(), FallDetectError>> + Send;
}

impl<T: EventSink + Send + Sync> EventSink for Arc<T> {
    fn deliver(&self, event: FallEvent) -> impl Future<Output = Result<(), FallDetectError>> + Send {
        (**self).deliver(event)
    }
}
