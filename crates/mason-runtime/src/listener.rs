#![forbid(unsafe_code)]

//! Listener registration for host-side notification sources.
//!
//! Viewport resize and container child-list mutation are both plain
//! "something changed" signals. Hosts expose them as a
//! [`NotificationSource`]; consumers hold a [`SourceGuard`] that
//! unsubscribes on drop, so a detached container never leaves a
//! registration behind.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifier of one registered listener, unique per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A source of argument-less change notifications.
///
/// Implementations must not block on, or call back into, the subscriber
/// while it is being registered; delivery is passive.
pub trait NotificationSource {
    /// Register `callback`; it runs on every notification until removed.
    fn subscribe(&self, callback: Rc<dyn Fn()>) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// Subscription to a [`NotificationSource`], released on drop.
#[must_use = "dropping a SourceGuard unsubscribes immediately"]
pub struct SourceGuard {
    source: Rc<dyn NotificationSource>,
    id: ListenerId,
}

impl SourceGuard {
    /// Subscribe `callback` to `source`.
    pub fn subscribe(source: Rc<dyn NotificationSource>, callback: Rc<dyn Fn()>) -> Self {
        let id = source.subscribe(callback);
        Self { source, id }
    }

    /// Id assigned by the source.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.source.unsubscribe(self.id);
    }
}

impl fmt::Debug for SourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceGuard").field("id", &self.id).finish()
    }
}

/// Ordered list of callbacks, for implementing sources.
///
/// Callbacks are snapshotted before delivery, so a callback may add or
/// remove listeners (including itself) while being called.
pub struct ListenerList<F: ?Sized> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Rc<F>)>>,
}

impl<F: ?Sized> ListenerList<F> {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Append a callback.
    pub fn add(&self, callback: Rc<F>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, callback));
        id
    }

    /// Remove a callback; returns whether it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    /// Registered callbacks in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl ListenerList<dyn Fn()> {
    /// Call every registered callback.
    pub fn emit(&self) {
        for cb in self.snapshot() {
            cb();
        }
    }
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for ListenerList<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList")
            .field("listeners", &self.len())
            .finish()
    }
}

impl NotificationSource for ListenerList<dyn Fn()> {
    fn subscribe(&self, callback: Rc<dyn Fn()>) -> ListenerId {
        self.add(callback)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.remove(id);
    }
}
