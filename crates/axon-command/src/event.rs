//! Multicast event generators.
//!
//! An event generator is the provider-side half of event dispatch: a
//! named, void- or write-shaped multicast point owning one subscriber
//! per connected required interface. Firing a generator invokes every
//! current subscriber exactly once, in subscription order.
//!
//! # Failure Isolation
//!
//! A failing subscriber must not block the others: delivery failures are
//! logged via `tracing::warn!` and fan-out continues. The firing side
//! learns how many subscribers were notified, not whether each handler
//! succeeded — handler failures belong to the subscribing component.
//!
//! # Example
//!
//! ```
//! use axon_command::EventWrite;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! let event = EventWrite::new::<i64>("PositionChanged");
//! let seen = Arc::new(AtomicI64::new(0));
//!
//! let s = Arc::clone(&seen);
//! event
//!     .subscribe("observer", move |v: &i64| {
//!         s.store(*v, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(event.fire(&42i64).unwrap(), 1);
//! assert_eq!(seen.load(Ordering::SeqCst), 42);
//! ```

use crate::arg::ArgSpec;
use crate::error::{ExecuteError, ExecuteResult};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tracing::warn;

/// Erased handler invoked with the fired payload.
///
/// The interface layer builds these at connection time, when the
/// handler's concrete payload type is known and a clone-into-mailbox
/// closure can be constructed.
pub type ErasedWriteHandler = Arc<dyn Fn(&dyn Any) -> ExecuteResult + Send + Sync>;

/// Erased handler invoked with no payload.
pub type ErasedVoidHandler = Arc<dyn Fn() -> ExecuteResult + Send + Sync>;

struct VoidSubscriber {
    user: String,
    handler: ErasedVoidHandler,
}

/// A void-shaped multicast event generator.
pub struct EventVoid {
    name: String,
    subscribers: RwLock<Vec<VoidSubscriber>>,
}

impl EventVoid {
    /// Creates a generator with no subscribers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the event's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a subscriber for `user`.
    ///
    /// Subscribers fire in subscription order.
    pub fn subscribe(
        &self,
        user: impl Into<String>,
        handler: impl Fn() -> ExecuteResult + Send + Sync + 'static,
    ) {
        self.subscribers.write().push(VoidSubscriber {
            user: user.into(),
            handler: Arc::new(handler),
        });
    }

    /// Removes every subscriber registered by `user`.
    ///
    /// Returns `true` if anything was removed.
    pub fn unsubscribe(&self, user: &str) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.user != user);
        subscribers.len() != before
    }

    /// Fires the event, invoking every current subscriber once in
    /// subscription order. Returns the number of subscribers notified.
    pub fn fire(&self) -> usize {
        let subscribers = self.subscribers.read();
        for sub in subscribers.iter() {
            if let Err(err) = (sub.handler)() {
                warn!(event = %self.name, user = %sub.user, %err, "void event delivery failed");
            }
        }
        subscribers.len()
    }

    /// Returns the current subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl std::fmt::Debug for EventVoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventVoid")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

struct WriteSubscriber {
    user: String,
    handler: ErasedWriteHandler,
}

/// A write-shaped multicast event generator.
///
/// The payload prototype is captured at creation; both subscription and
/// firing are checked against it.
pub struct EventWrite {
    name: String,
    payload: ArgSpec,
    subscribers: RwLock<Vec<WriteSubscriber>>,
}

impl EventWrite {
    /// Creates a generator for payload type `T`.
    #[must_use]
    pub fn new<T: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: ArgSpec::of::<T>(),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the event's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the payload prototype.
    #[must_use]
    pub fn payload_spec(&self) -> ArgSpec {
        self.payload
    }

    /// Appends a typed subscriber for `user`.
    ///
    /// # Errors
    ///
    /// Fails with [`ExecuteError::TypeMismatch`] if `T` is not the
    /// generator's payload type.
    pub fn subscribe<T: Any>(
        &self,
        user: impl Into<String>,
        handler: impl Fn(&T) -> ExecuteResult + Send + Sync + 'static,
    ) -> ExecuteResult<()> {
        self.payload.check_type::<T>()?;
        let spec = self.payload;
        self.subscribe_erased(
            user,
            Arc::new(move |any: &dyn Any| {
                spec.check_erased(any)?;
                let value = any
                    .downcast_ref::<T>()
                    .ok_or_else(|| ExecuteError::TypeMismatch {
                        expected: spec.type_name().to_string(),
                        found: "<erased>".to_string(),
                    })?;
                handler(value)
            }),
        );
        Ok(())
    }

    /// Appends an already-erased subscriber for `user`.
    ///
    /// Used at connection time, when the binding layer has built a
    /// clone-into-mailbox closure for the handler.
    pub fn subscribe_erased(&self, user: impl Into<String>, handler: ErasedWriteHandler) {
        self.subscribers.write().push(WriteSubscriber {
            user: user.into(),
            handler,
        });
    }

    /// Removes every subscriber registered by `user`.
    ///
    /// Returns `true` if anything was removed.
    pub fn unsubscribe(&self, user: &str) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.user != user);
        subscribers.len() != before
    }

    /// Fires the event with a typed payload.
    ///
    /// Returns the number of subscribers notified.
    ///
    /// # Errors
    ///
    /// Fails with [`ExecuteError::TypeMismatch`] — before any delivery —
    /// if the payload is not the prototype type.
    pub fn fire<T: Any + Send>(&self, payload: &T) -> ExecuteResult<usize> {
        self.payload.check(payload)?;
        Ok(self.fan_out(payload))
    }

    /// Fires the event with an already-erased payload.
    pub fn fire_erased(&self, payload: &dyn Any) -> ExecuteResult<usize> {
        self.payload.check_erased(payload)?;
        Ok(self.fan_out(payload))
    }

    fn fan_out(&self, payload: &dyn Any) -> usize {
        let subscribers = self.subscribers.read();
        for sub in subscribers.iter() {
            if let Err(err) = (sub.handler)(payload) {
                warn!(event = %self.name, user = %sub.user, %err, "write event delivery failed");
            }
        }
        subscribers.len()
    }

    /// Returns the current subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl std::fmt::Debug for EventWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWrite")
            .field("name", &self.name)
            .field("payload", &self.payload)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn void_event_fires_all_subscribers_in_order() {
        let event = EventVoid::new("Tick");
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let o = Arc::clone(&order);
            event.subscribe(tag, move || {
                o.lock().push(tag);
                Ok(())
            });
        }

        assert_eq!(event.fire(), 3);
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn void_event_isolates_failing_subscriber() {
        let event = EventVoid::new("Tick");
        let hits = Arc::new(AtomicU32::new(0));

        event.subscribe("bad", || Err(ExecuteError::handler("boom")));
        let h = Arc::clone(&hits);
        event.subscribe("good", move || {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(event.fire(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn void_event_unsubscribe() {
        let event = EventVoid::new("Tick");
        event.subscribe("a", || Ok(()));
        event.subscribe("b", || Ok(()));

        assert!(event.unsubscribe("a"));
        assert!(!event.unsubscribe("a"));
        assert_eq!(event.subscriber_count(), 1);
    }

    #[test]
    fn write_event_delivers_payload() {
        let event = EventWrite::new::<i32>("ValueChanged");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let s = Arc::clone(&seen);
            event
                .subscribe("user", move |v: &i32| {
                    s.lock().push(*v);
                    Ok(())
                })
                .unwrap();
        }

        assert_eq!(event.fire(&5i32).unwrap(), 3);
        assert_eq!(*seen.lock(), vec![5, 5, 5]);
    }

    #[test]
    fn write_event_rejects_wrong_payload_type() {
        let event = EventWrite::new::<i32>("ValueChanged");
        assert!(event.fire(&"five").is_err());
        assert!(event.subscribe("user", |_: &String| Ok(())).is_err());
    }

    #[test]
    fn write_event_unsubscribe_reduces_delivery() {
        let event = EventWrite::new::<u8>("Beat");
        let hits = Arc::new(AtomicU32::new(0));

        for user in ["one", "two", "three"] {
            let h = Arc::clone(&hits);
            event
                .subscribe(user, move |_: &u8| {
                    h.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }

        assert_eq!(event.fire(&0u8).unwrap(), 3);
        assert!(event.unsubscribe("two"));
        assert_eq!(event.fire(&0u8).unwrap(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }
}
