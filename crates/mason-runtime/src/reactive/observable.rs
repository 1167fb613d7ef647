#![forbid(unsafe_code)]

//! Observable value with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] keeps a value in shared `Rc<RefCell<..>>` storage.
//! Writers call [`set`](Observable::set) or [`update`](Observable::update);
//! when the value actually changes (by `PartialEq`), the version is bumped
//! and every live subscriber is called with the new value, in registration
//! order.
//!
//! The live column count and the item-sequence version handed to
//! [`attach_masonry`](crate::attach_masonry) are both observables.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on each value-changing write.
//! 2. Writing a value equal to the current one is a no-op.
//! 3. No borrow is held while subscribers run, so a subscriber may read
//!    or write the same observable.
//! 4. A dropped [`Subscription`] is never called again; its slot is
//!    pruned on the next notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;
type WeakCallback<T> = Weak<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    version: u64,
    subscribers: Vec<WeakCallback<T>>,
}

/// A shared, version-tracked value.
///
/// Cloning yields another handle to the same value and subscriber list.
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

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate in place, notifying subscribers if the value changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.value.clone();
            f(&mut inner.value);
            let changed = inner.value != before;
            if changed {
                inner.version += 1;
            }
            changed
        };
        if changed {
            self.notify();
        }
    }

    /// Call `callback` with every new value until the guard is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Callback<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Number of value-changing writes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Subscribers whose guard is still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn notify(&self) {
        let (value, version, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Callback<T>> =
                inner.subscribers.iter().filter_map(|w| w.upgrade()).collect();
            (inner.value.clone(), inner.version, callbacks)
        };
        tracing::trace!(
            target: "mason.runtime",
            version,
            subscribers = callbacks.len(),
            "observable changed"
        );
        for cb in &callbacks {
            cb(&value);
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard for an [`Observable`] subscriber.
///
/// Holds the only strong reference to the callback; the observable keeps
/// a weak one. Dropping the guard makes the callback unreachable.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
