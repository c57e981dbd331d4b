//! Channel Event Queue
//!
//! Background reader threads publish [`ChannelEvent`]s; the single actor
//! owning the controller receives them in publish order. Ordering is
//! preserved per sender, which is what the session protocol relies on.

use tokio::sync::mpsc::{self, error::TryRecvError};

use super::ChannelEvent;

/// Create a connected sender/receiver pair
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventSender { sender }, EventReceiver { receiver })
}

/// Publishing half, cloned into every I/O thread
#[derive(Clone)]
pub struct EventSender {
    sender: mpsc::UnboundedSender<ChannelEvent>,
}

impl EventSender {
    /// Publish an event to the controller's queue
    pub fn publish(&self, event: ChannelEvent) {
        // A closed queue just means the front end is shutting down
        if self.sender.send(event).is_err() {
            debug!("Event queue closed, dropping channel event");
        }
    }

    /// Check whether the receiving side is gone
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving half, owned by the controller's actor
pub struct EventReceiver {
    receiver: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl EventReceiver {
    /// Receive the next event, waiting if necessary
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.receiver.recv().await
    }

    /// Blocking receive for callers outside an async runtime
    pub fn blocking_recv(&mut self) -> Option<ChannelEvent> {
        self.receiver.blocking_recv()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every event currently queued
    pub fn drain(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}
