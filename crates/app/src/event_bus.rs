//! In-process event bus backed by a tokio broadcast channel, and the
//! listener tasks that consume it.

use std::future::Future;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use controllable_domain::error::ControllableError;
use controllable_domain::event::Event;

use crate::ports::{EventPublisher, EventSubscriber};

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ControllableError>> + Send {
        tracing::trace!(event_type = event.name(), event_id = %event.id, "publishing event");
        // send only fails when nobody is subscribed
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

impl EventSubscriber for InProcessEventBus {
    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

/// A running subscription. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) stops the listener task.
#[derive(Debug)]
pub struct ListenerHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Spawn a task feeding every event received on `rx` to `handler`, one at
    /// a time and in delivery order.
    pub fn spawn<F, Fut>(name: &'static str, rx: broadcast::Receiver<Event>, handler: F) -> Self
    where
        F: FnMut(Event) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_lag(name, rx, handler, || async {})
    }

    /// Like [`spawn`](Self::spawn), and runs `on_lag` whenever the receiver
    /// fell behind and events were dropped.
    pub fn spawn_with_lag<F, Fut, L, LFut>(
        name: &'static str,
        rx: broadcast::Receiver<Event>,
        mut handler: F,
        mut on_lag: L,
    ) -> Self
    where
        F: FnMut(Event) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        L: FnMut() -> LFut + Send + 'static,
        LFut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut events = BroadcastStream::new(rx);
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => handler(event).await,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            listener = name,
                            skipped,
                            "listener lagged, some events were dropped"
                        );
                        on_lag().await;
                    }
                }
            }
            tracing::debug!(listener = name, "event bus closed, listener stopped");
        });
        Self { name, task }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the listener task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(listener = self.name, "listener released");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use controllable_domain::entity::EntityId;
    use tokio::sync::mpsc;

    use super::*;

    fn target_changed(raw: &str) -> Event {
        Event::target_changed(EntityId::parse(raw).unwrap())
    }

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        let event = target_changed("light.a");
        let event_id = event.id;
        bus.publish(event).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event_id);
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        assert!(bus.publish(target_changed("light.a")).await.is_ok());
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(target_changed("light.early")).await.unwrap();

        let mut rx = bus.subscribe();
        let later = target_changed("light.late");
        let later_id = later.id;
        bus.publish(later).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id, later_id);
    }

    #[tokio::test]
    async fn should_feed_events_to_listener_in_order() {
        let bus = Arc::new(InProcessEventBus::new(16));
        let (tx, mut seen) = mpsc::unbounded_channel();
        let _handle = ListenerHandle::spawn("test", bus.subscribe(), move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event.id);
            }
        });

        let first = target_changed("light.a");
        let second = target_changed("light.b");
        let ids = [first.id, second.id];
        bus.publish(first).await.unwrap();
        bus.publish(second).await.unwrap();

        for expected in ids {
            let got = tokio::time::timeout(Duration::from_secs(1), seen.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, expected);
        }
    }

    #[tokio::test]
    async fn should_run_lag_hook_when_listener_falls_behind() {
        let bus = InProcessEventBus::new(4);
        let (tx, mut lagged) = mpsc::unbounded_channel();
        let _handle = ListenerHandle::spawn_with_lag(
            "test",
            bus.subscribe(),
            |_| async {},
            move || {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(());
                }
            },
        );

        // the listener task cannot run before the channel overflows
        for _ in 0..8 {
            bus.publish(target_changed("light.noise")).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(1), lagged.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn should_release_receiver_when_handle_dropped() {
        let bus = InProcessEventBus::new(16);
        let handle = ListenerHandle::spawn("test", bus.subscribe(), |_| async {});
        assert!(handle.is_active());
        assert_eq!(bus.receiver_count(), 1);

        handle.unsubscribe();
        // the aborted task drops its receiver once the runtime polls it
        for _ in 0..10 {
            if bus.receiver_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(bus.receiver_count(), 0);
    }
}
