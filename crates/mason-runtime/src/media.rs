#![forbid(unsafe_code)]

//! Media-query evaluators and their process-wide cache.
//!
//! A [`MediaSource`] turns a query string into a live boolean predicate
//! ([`MediaQuery`]). [`MediaRegistry`] caches one evaluator per distinct
//! query string so that every container and every rule sharing a query
//! also shares its evaluator. The cache is append-only; evaluators live
//! as long as the registry.

use crate::listener::ListenerId;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A live boolean predicate over the viewport.
pub trait MediaQuery {
    /// The query string this evaluator was created for.
    fn query(&self) -> &str;

    /// Whether the predicate currently holds.
    fn matches(&self) -> bool;

    /// Call `callback` with the new value whenever [`matches`](Self::matches)
    /// flips.
    fn add_listener(&self, callback: Rc<dyn Fn(bool)>) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

/// Factory for [`MediaQuery`] evaluators.
pub trait MediaSource {
    fn evaluate(&self, query: &str) -> Rc<dyn MediaQuery>;
}

/// Append-only cache of evaluators keyed by query string.
pub struct MediaRegistry {
    source: Rc<dyn MediaSource>,
    cache: RefCell<FxHashMap<String, Rc<dyn MediaQuery>>>,
}

impl MediaRegistry {
    /// An empty registry backed by `source`.
    pub fn new(source: Rc<dyn MediaSource>) -> Self {
        Self {
            source,
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// The evaluator for `query`, creating and caching it on first use.
    pub fn get(&self, query: &str) -> Rc<dyn MediaQuery> {
        if let Some(existing) = self.cache.borrow().get(query) {
            return Rc::clone(existing);
        }
        // Evaluate outside the borrow: a source may consult the registry.
        let created = self.source.evaluate(query);
        tracing::debug!(target: "mason.runtime", query, "media query registered");
        Rc::clone(
            self.cache
                .borrow_mut()
                .entry(query.to_owned())
                .or_insert(created),
        )
    }

    /// Whether `query` already has a cached evaluator.
    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.cache.borrow().contains_key(query)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

impl fmt::Debug for MediaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaRegistry")
            .field("queries", &self.len())
            .finish()
    }
}
