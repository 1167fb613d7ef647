#![forbid(unsafe_code)]

//! Headless viewport: a width, resize listeners and width media queries.
//!
//! [`Viewport::set_width`] updates every query's state before delivering
//! any change notification, then fires the resize listeners. A listener
//! that inspects other queries therefore always sees the new width.

use crate::query::MediaCondition;
use mason_runtime::{ListenerId, ListenerList, MediaQuery, MediaSource, NotificationSource};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Evaluator for one query string against a [`Viewport`].
pub struct ViewportQuery {
    query: String,
    /// `None` when the query failed to parse; such a query never matches.
    condition: Option<MediaCondition>,
    state: Cell<bool>,
    listeners: ListenerList<dyn Fn(bool)>,
}

impl ViewportQuery {
    fn refresh(&self, width: f64) -> bool {
        let now = self.condition.as_ref().is_some_and(|c| c.matches(width));
        self.state.replace(now) != now
    }

    fn notify(&self) {
        let value = self.state.get();
        for cb in self.listeners.snapshot() {
            cb(value);
        }
    }

    /// Whether the query string parsed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.condition.is_some()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl MediaQuery for ViewportQuery {
    fn query(&self) -> &str {
        &self.query
    }

    fn matches(&self) -> bool {
        self.state.get()
    }

    fn add_listener(&self, callback: Rc<dyn Fn(bool)>) -> ListenerId {
        self.listeners.add(callback)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

impl fmt::Debug for ViewportQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportQuery")
            .field("query", &self.query)
            .field("matches", &self.state.get())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A resizable viewport.
pub struct Viewport {
    width: Cell<f64>,
    resize: ListenerList<dyn Fn()>,
    queries: RefCell<Vec<Weak<ViewportQuery>>>,
    resizes: Cell<u64>,
}

impl Viewport {
    #[must_use]
    pub fn new(width: f64) -> Rc<Self> {
        Rc::new(Self {
            width: Cell::new(width),
            resize: ListenerList::new(),
            queries: RefCell::new(Vec::new()),
            resizes: Cell::new(0),
        })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width.get()
    }

    /// Change the width, flip affected queries, then fire resize listeners.
    ///
    /// Setting the current width is a no-op.
    pub fn set_width(&self, width: f64) {
        if self.width.replace(width) == width {
            return;
        }
        self.resizes.set(self.resizes.get() + 1);
        let flipped: Vec<Rc<ViewportQuery>> = {
            let mut queries = self.queries.borrow_mut();
            queries.retain(|q| q.strong_count() > 0);
            queries
                .iter()
                .filter_map(|q| q.upgrade())
                .filter(|q| q.refresh(width))
                .collect()
        };
        tracing::trace!(
            target: "mason.harness",
            width,
            flipped = flipped.len(),
            "viewport resized"
        );
        for query in &flipped {
            query.notify();
        }
        self.resize.emit();
    }

    /// Number of effective `set_width` calls.
    #[must_use]
    pub fn resizes(&self) -> u64 {
        self.resizes.get()
    }

    /// Resize listeners currently registered.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.resize.len()
    }

    /// Media source evaluating queries against this viewport.
    #[must_use]
    pub fn media(self: &Rc<Self>) -> ViewportMedia {
        ViewportMedia {
            viewport: Rc::clone(self),
        }
    }

    fn track(&self, query: &Rc<ViewportQuery>) {
        self.queries.borrow_mut().push(Rc::downgrade(query));
    }
}

impl NotificationSource for Viewport {
    fn subscribe(&self, callback: Rc<dyn Fn()>) -> ListenerId {
        self.resize.add(callback)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.resize.remove(id);
    }
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("width", &self.width.get())
            .field("resize_listeners", &self.resize.len())
            .finish()
    }
}

/// [`MediaSource`] backed by a [`Viewport`].
#[derive(Clone)]
pub struct ViewportMedia {
    viewport: Rc<Viewport>,
}

impl ViewportMedia {
    /// Create a tracked evaluator for `query`.
    ///
    /// A query that does not parse is logged and never matches.
    #[must_use]
    pub fn query(&self, query: &str) -> Rc<ViewportQuery> {
        let condition = match MediaCondition::parse(query) {
            Ok(condition) => Some(condition),
            Err(err) => {
                tracing::warn!(target: "mason.harness", query, error = %err, "unsupported media query");
                None
            }
        };
        let evaluator = Rc::new(ViewportQuery {
            query: query.to_owned(),
            condition,
            state: Cell::new(false),
            listeners: ListenerList::new(),
        });
        evaluator.refresh(self.viewport.width());
        self.viewport.track(&evaluator);
        evaluator
    }
}

impl MediaSource for ViewportMedia {
    fn evaluate(&self, query: &str) -> Rc<dyn MediaQuery> {
        self.query(query)
    }
}

impl fmt::Debug for ViewportMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportMedia")
            .field("width", &self.viewport.width())
            .finish()
    }
}
