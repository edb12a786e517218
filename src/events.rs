//! Event payloads and the subscriber list they are multicast through.
//!
//! Handlers run on whatever thread publishes the event. For sensor-driven
//! changes that is the sensor's own thread, not the thread that subscribed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Serialize, Serializer};

use crate::error::Error;
use crate::orientation::Orientation;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrientationChangedEvent {
    pub orientation: Orientation,
}

/// Best-effort diagnostic. Never used for control flow.
#[derive(Clone, Debug, Serialize)]
pub struct LogEvent {
    pub message: String,
    #[serde(serialize_with = "fault_message")]
    pub fault: Option<Arc<Error>>,
}

fn fault_message<S: Serializer>(fault: &Option<Arc<Error>>, s: S) -> Result<S::Ok, S::Error> {
    match fault {
        Some(err) => s.serialize_some(&err.to_string()),
        None => s.serialize_none(),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct Subscribers<E> {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, Handler<E>)>>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Subscribers {
            next_id: AtomicU64::new(0),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    ///
    /// The list is snapshotted first, so handlers may subscribe or
    /// unsubscribe from inside the callback.
    pub fn publish(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in snapshot {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn multicast_in_order() {
        let subscribers = Subscribers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = seen.clone();
            subscribers.subscribe(move |n: &u32| seen.lock().unwrap().push(format!("{}{}", tag, n)));
        }

        subscribers.publish(&1);
        subscribers.publish(&2);

        assert_eq!(*seen.lock().unwrap(), ["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subscribers = Subscribers::<u32>::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let id = subscribers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscribers.publish(&0);
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.publish(&0);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let subscribers = Arc::new(Subscribers::<u32>::new());
        let slot = Arc::new(Mutex::new(None));
        let (list, own_id) = (subscribers.clone(), slot.clone());
        let id = subscribers.subscribe(move |_| {
            if let Some(id) = own_id.lock().unwrap().take() {
                list.unsubscribe(id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        subscribers.publish(&7);
        assert_eq!(subscribers.len(), 0);
    }

    #[test]
    fn log_event_json() -> crate::error::Result<()> {
        let event = LogEvent {
            message: "lost display".into(),
            fault: Some(Arc::new(Error::MissingHandle("display"))),
        };
        assert_eq!(
            serde_json::to_string(&event)?,
            r#"{"message":"lost display","fault":"Display handle `display` is unavailable"}"#
        );
        Ok(())
    }
}
