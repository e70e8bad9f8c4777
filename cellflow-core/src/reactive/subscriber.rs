//! Subscriber types for the engine.
//!
//! A Subscriber is a callback attached to one node; it runs every cycle in
//! which that node resolves, receiving the value and the engine.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::engine::Engine;
use crate::error::Result;
use crate::graph::{NodeId, Value};

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Callback = Rc<dyn Fn(&Value, &mut Engine) -> Result<()>>;

/// A subscription callback.
///
/// Cloning is cheap; the engine clones the subscribers of a node before
/// running them so callbacks are free to subscribe, unsubscribe or publish.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    callback: Callback,
}

impl Subscriber {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Value, &mut Engine) -> Result<()> + 'static,
    {
        Self {
            id: SubscriberId::new(),
            callback: Rc::new(callback),
        }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Run the callback for a resolved value.
    pub fn notify(&self, value: &Value, engine: &mut Engine) -> Result<()> {
        (self.callback)(value, engine)
    }
}

/// Whether a subscription is one of many or the node's single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    Regular,
    Singleton,
}

/// Handle returned by subscribing; pass it to `Engine::unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "dropping the handle makes the subscription impossible to remove"]
pub struct Subscription {
    node: NodeId,
    subscriber: SubscriberId,
    kind: SubscriptionKind,
}

impl Subscription {
    pub(crate) fn new(node: NodeId, subscriber: SubscriberId, kind: SubscriptionKind) -> Self {
        Self {
            node,
            subscriber,
            kind,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let called = Rc::new(Cell::new(0));
        let called_clone = Rc::clone(&called);

        let subscriber = Subscriber::new(move |value, _| {
            if let Some(n) = value.downcast_ref::<i32>() {
                called_clone.set(*n);
            }
            Ok(())
        });

        let mut engine = Engine::new();
        let value: Value = Arc::new(9_i32);
        assert!(subscriber.notify(&value, &mut engine).is_ok());
        assert_eq!(called.get(), 9);
    }
}
