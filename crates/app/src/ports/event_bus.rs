//! Event bus ports — publish/subscribe for bus events.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use controllable_domain::error::ControllableError;
use controllable_domain::event::Event;

/// Publishes events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ControllableError>> + Send;
}

/// Hands out receivers for every event published after the call.
pub trait EventSubscriber {
    fn subscribe(&self) -> broadcast::Receiver<Event>;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ControllableError>> + Send {
        (**self).publish(event)
    }
}

impl<T: EventSubscriber> EventSubscriber for Arc<T> {
    fn subscribe(&self) -> broadcast::Receiver<Event> {
        (**self).subscribe()
    }
}
