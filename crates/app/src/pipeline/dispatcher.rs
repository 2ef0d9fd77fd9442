//! Event dispatcher — duplicate suppression in front of the consumer.
//!
//! The peripheral tends to re-notify the same fall several times. Any event
//! arriving less than the suppression window after the last *accepted* one
//! is dropped, whatever its content. Suppressed events do not extend the
//! window.

use std::time::{Duration, Instant};

use falldetect_domain::fall_event::FallEvent;

/// Default suppression window.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(5000);

/// Callback receiving accepted events.
pub type Consumer = Box<dyn FnMut(FallEvent) + Send>;

/// Outcome of [`EventDispatcher::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Accepted and handed to the consumer.
    Delivered,
    /// Accepted, but no consumer is registered.
    Undelivered,
    /// Dropped as a duplicate.
    Suppressed,
}

/// Debounces fall events and forwards accepted ones to a single consumer.
pub struct EventDispatcher {
    window: Duration,
    last_accepted_at: Option<Instant>,
    consumer: Option<Consumer>,
}

impl EventDispatcher {
    /// Create a dispatcher with the given suppression window and no consumer.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted_at: None,
            consumer: None,
        }
    }

    /// Register the consumer, replacing any previous one.
    pub fn register(&mut self, consumer: impl FnMut(FallEvent) + Send + 'static) {
        if self.consumer.replace(Box::new(consumer)).is_some() {
            tracing::debug!("replaced fall event consumer");
        }
    }

    /// When the last event was accepted, if ever.
    #[must_use]
    pub fn last_accepted_at(&self) -> Option<Instant> {
        self.last_accepted_at
    }

    /// Accept or suppress `event` received at `now`.
    pub fn on_event(&mut self, event: FallEvent, now: Instant) -> Dispatch {
        if let Some(last) = self.last_accepted_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.window {
                tracing::warn!(
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    fall_type = event.fall_type(),
                    "suppressing duplicate fall event"
                );
                return Dispatch::Suppressed;
            }
        }

        self.last_accepted_at = Some(now);

        match self.consumer.as_mut() {
            Some(consumer) => {
                tracing::info!(
                    fall_type = event.fall_type(),
                    impact_severity = event.impact_severity(),
                    "fall detected"
                );
                consumer(event);
                Dispatch::Delivered
            }
            None => {
                tracing::warn!(
                    fall_type = event.fall_type(),
                    "fall detected but no consumer is registered"
                );
                Dispatch::Undelivered
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("window", &self.window)
            .field("last_accepted_at", &self.last_accepted_at)
            .field("has_consumer", &self.consumer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn event() -> FallEvent {
        FallEvent::from_parts("Hard Fall", "2024-03-01", "09:30 AM", "2.3g")
    }

    fn collecting() -> (EventDispatcher, Arc<Mutex<Vec<FallEvent>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let mut dispatcher = EventDispatcher::default();
        dispatcher.register(move |event| sink.lock().unwrap().push(event));
        (dispatcher, received)
    }

    #[test]
    fn should_deliver_first_event() {
        let (mut dispatcher, received) = collecting();
        assert_eq!(dispatcher.on_event(event(), Instant::now()), Dispatch::Delivered);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn should_suppress_event_inside_window() {
        let (mut dispatcher, received) = collecting();
        let start = Instant::now();
        dispatcher.on_event(event(), start);
        let second = dispatcher.on_event(event(), start + Duration::from_millis(4999));
        assert_eq!(second, Dispatch::Suppressed);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn should_deliver_event_at_window_boundary() {
        let (mut dispatcher, received) = collecting();
        let start = Instant::now();
        dispatcher.on_event(event(), start);
        let second = dispatcher.on_event(event(), start + DEFAULT_SUPPRESSION_WINDOW);
        assert_eq!(second, Dispatch::Delivered);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[test]
    fn should_not_extend_window_when_suppressing() {
        let (mut dispatcher, received) = collecting();
        let start = Instant::now();
        dispatcher.on_event(event(), start);
        dispatcher.on_event(event(), start + Duration::from_secs(3));
        assert_eq!(dispatcher.last_accepted_at(), Some(start));

        let third = dispatcher.on_event(event(), start + Duration::from_secs(6));
        assert_eq!(third, Dispatch::Delivered);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[test]
    fn should_suppress_distinct_falls_inside_window() {
        let (mut dispatcher, received) = collecting();
        let start = Instant::now();
        dispatcher.on_event(event(), start);
        let soft = FallEvent::from_parts("Soft Fall", "2024-03-01", "09:30 AM", "0.4");
        assert_eq!(
            dispatcher.on_event(soft, start + Duration::from_secs(1)),
            Dispatch::Suppressed
        );
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn should_accept_without_consumer_and_start_window() {
        let mut dispatcher = EventDispatcher::default();
        let start = Instant::now();
        assert_eq!(dispatcher.on_event(event(), start), Dispatch::Undelivered);
        assert_eq!(dispatcher.last_accepted_at(), Some(start));
    }

    #[test]
    fn should_replace_previous_consumer() {
        let (mut dispatcher, first) = collecting();
        let second = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&second);
        dispatcher.register(move |event| sink.lock().unwrap().push(event));

        dispatcher.on_event(event(), Instant::now());

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }
}
