//! Synchronous, in-order publish/subscribe bus (spec §9's replacement for a
//! signals/slots collaborator).
//!
//! Delivery order matches subscription order; a subscriber that blocks
//! delays its peers but can never reorder events for them, per the
//! ordering guarantee on subscriber delivery.

/// Cancel handle returned by [`EventBus::subscribe`].
pub type SubscriptionId = u64;

/// A typed, synchronous publish/subscribe channel.
pub struct EventBus<T> {
    next_id: SubscriptionId,
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut(&T) + Send>)>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<T> EventBus<T> {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`, returning a handle that cancels it.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Cancels a subscription. Unsubscribing an id that is already gone
    /// (or was never issued) is a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Delivers `event` to every live subscriber, in subscription order.
    pub fn publish(&mut self, event: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
