#![forbid(unsafe_code)]

//! Single-threaded observable values.
//!
//! An [`Observable`] holds a value and a list of subscribers. Setting a new,
//! different value bumps a version counter and notifies every subscriber.
//! [`subscribe`](Observable::subscribe) returns a [`Subscription`] guard;
//! dropping or disposing the guard unsubscribes.
//!
//! Subscribers are called after the internal borrow is released, so a
//! subscriber may read the observable, set it, or unsubscribe itself.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use overture_core::Disposable;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    version: u64,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

/// A shared, versioned value with change notification.
///
/// Clones share the same value and subscriber list.
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                version: 0,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Replace the value. Subscribers are notified only if it changed.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let subscribers = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value.clone();
            inner.version += 1;
            inner
                .subscribers
                .iter()
                .map(|(_, cb)| Rc::clone(cb))
                .collect::<Vec<_>>()
        };
        for callback in subscribers {
            callback(&value);
        }
        true
    }

    /// Register `callback` for future changes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Rc::new(callback)));
        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    /// Number of changes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// Guard for an [`Observable`] subscription.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Disposable for Subscription {
    fn dispose(&mut self) {
        self.unsubscribe();
    }

    fn is_disposed(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn set_notifies_on_change_only() {
        let obs = Observable::new(false);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = obs.subscribe(move |_| h.set(h.get() + 1));
        assert!(obs.set(true));
        assert!(!obs.set(true));
        assert_eq!(hits.get(), 1);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let obs = Observable::new(0u32);
        let seen = Rc::new(Cell::new(0));
        {
            let s = Rc::clone(&seen);
            let _sub = obs.subscribe(move |v| s.set(*v));
            obs.set(5);
        }
        obs.set(9);
        assert_eq!(seen.get(), 5);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn dispose_is_idempotent() {
        let obs = Observable::new(1u8);
        let mut sub = obs.subscribe(|_| {});
        sub.dispose();
        sub.dispose();
        assert!(sub.is_disposed());
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_may_read_during_notification() {
        let obs = Observable::new(1u8);
        let reader = obs.clone();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = obs.subscribe(move |_| s.set(reader.get()));
        obs.set(2);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn subscription_outliving_observable_is_harmless() {
        let obs = Observable::new(0u8);
        let mut sub = obs.subscribe(|_| {});
        drop(obs);
        sub.unsubscribe();
        assert!(sub.is_disposed());
    }
}
