//! Sink relay — moves accepted events off the pipeline task.
//!
//! The dispatcher's consumer is a plain synchronous callback invoked on the
//! pipeline's owner task. [`SinkRelay`] turns an async [`EventSink`] into
//! such a callback: the callback only enqueues, and a dedicated worker task
//! awaits the sink one event at a time, in acceptance order.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use falldetect_domain::fall_event::FallEvent;

use crate::ports::EventSink;

/// Sending side of the relay. Dropping every sender stops the worker once
/// the queue is drained.
#[derive(Debug, Clone)]
pub struct SinkRelay {
    sender: mpsc::UnboundedSender<FallEvent>,
}

impl SinkRelay {
    /// Spawn the delivery worker for `sink` on the current runtime.
    pub fn spawn<S>(sink: S) -> (Self, JoinHandle<()>)
    where
        S: EventSink + Send + Sync + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<FallEvent>();

        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let fall_type = event.fall_type().to_string();
                match sink.deliver(event).await {
                    Ok(()) => tracing::debug!(fall_type, "fall event delivered"),
                    Err(err) => tracing::warn!(%err, fall_type, "fall event delivery failed"),
                }
            }
            tracing::debug!("sink relay stopped");
        });

        (Self { sender }, worker)
    }

    /// Enqueue one event for delivery.
    pub fn send(&self, event: FallEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("sink relay stopped, dropping fall event");
        }
    }

    /// Turn the relay into a dispatcher consumer.
    pub fn into_consumer(self) -> impl FnMut(FallEvent) + Send + 'static {
        move |event| self.send(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use falldetect_domain::error::FallDetectError;

    #[derive(Default)]
    struct MemorySink {
        events: Mutex<Vec<FallEvent>>,
        attempts: AtomicUsize,
        fail_first: bool,
    }

    impl EventSink for MemorySink {
        async fn deliver(&self, event: FallEvent) -> Result<(), FallDetectError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && attempt == 0 {
                return Err(FallDetectError::Delivery("network down".into()));
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn event(kind: &str) -> FallEvent {
        FallEvent::from_parts(kind, "2024-03-01", "09:30 AM", "2.3")
    }

    #[tokio::test]
    async fn should_deliver_events_in_order() {
        let sink = std::sync::Arc::new(MemorySink::default());
        let (relay, worker) = SinkRelay::spawn(std::sync::Arc::clone(&sink));

        let mut consumer = relay.into_consumer();
        consumer(event("Hard Fall"));
        consumer(event("Soft Fall"));
        drop(consumer);
        worker.await.unwrap();

        let events = sink.events.lock().unwrap();
        let kinds: Vec<&str> = events.iter().map(FallEvent::fall_type).collect();
        assert_eq!(kinds, vec!["Hard Fall", "Soft Fall"]);
    }

    #[tokio::test]
    async fn should_keep_going_after_failed_delivery() {
        let sink = std::sync::Arc::new(MemorySink {
            fail_first: true,
            ..MemorySink::default()
        });
        let (relay, worker) = SinkRelay::spawn(std::sync::Arc::clone(&sink));

        relay.send(event("Hard Fall"));
        relay.send(event("Soft Fall"));
        drop(relay);
        worker.await.unwrap();

        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_not_panic_when_worker_is_gone() {
        let (relay, worker) = SinkRelay::spawn(MemorySink::default());
        worker.abort();
        let _ = worker.await;
        relay.send(event("Hard Fall"));
    }
}
