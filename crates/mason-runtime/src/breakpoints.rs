#![forbid(unsafe_code)]

//! Live column count from media-query breakpoints.
//!
//! # Resolution
//!
//! Every rule owns a listener on its query's evaluator. When a query
//! becomes true its rule writes its column count into the shared
//! [`Observable<ColumnCount>`]; a query becoming false writes nothing. The
//! effective count is therefore whichever rule fired most recently, and it
//! survives every query turning false.
//!
//! At registration, rules are evaluated once in list order, so the last
//! matching rule in the list wins.
//!
//! # Overlap
//!
//! Ranges are not required to be exclusive. When a rule fires while
//! another rule's query is also true, the result is still last-fired-wins,
//! but a `warn` event names both queries.
//! [`overlapping`](BreakpointResolver::overlapping) reports the same
//! condition on demand.

use crate::listener::ListenerId;
use crate::media::{MediaQuery, MediaRegistry};
use crate::reactive::Observable;
use mason_layout::{ColumnCount, ConfigError, LayoutConfig, MasonryBreakpoint};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

struct Rule {
    breakpoint: MasonryBreakpoint,
    query: Rc<dyn MediaQuery>,
    listener: Cell<Option<ListenerId>>,
}

/// One registered breakpoint list. Dropping it removes every listener.
struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    fn register(
        registry: &MediaRegistry,
        breakpoints: Vec<MasonryBreakpoint>,
        columns: &Observable<ColumnCount>,
    ) -> Rc<Self> {
        let set = Rc::new(Self {
            rules: breakpoints
                .into_iter()
                .map(|breakpoint| Rule {
                    query: registry.get(breakpoint.query()),
                    breakpoint,
                    listener: Cell::new(None),
                })
                .collect(),
        });

        for (index, rule) in set.rules.iter().enumerate() {
            let weak = Rc::downgrade(&set);
            let columns = columns.clone();
            let id = rule.query.add_listener(Rc::new(move |matches: bool| {
                if matches {
                    on_rule_matched(&weak, index, &columns);
                }
            }));
            rule.listener.set(Some(id));
        }

        let matching: Vec<&Rule> = set.rules.iter().filter(|r| r.query.matches()).collect();
        if let Some(last) = matching.last() {
            if matching.len() > 1 {
                tracing::warn!(
                    target: "mason.runtime",
                    queries = ?matching.iter().map(|r| r.breakpoint.query()).collect::<Vec<_>>(),
                    winner = last.breakpoint.query(),
                    "overlapping breakpoints match at registration"
                );
            }
            columns.set(last.breakpoint.columns());
        }
        set
    }

    fn matching_queries(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.query.matches())
            .map(|r| r.breakpoint.query())
            .collect()
    }
}

impl Drop for RuleSet {
    fn drop(&mut self) {
        for rule in &self.rules {
            if let Some(id) = rule.listener.take() {
                rule.query.remove_listener(id);
            }
        }
    }
}

fn on_rule_matched(set: &Weak<RuleSet>, index: usize, columns: &Observable<ColumnCount>) {
    let Some(set) = set.upgrade() else {
        return;
    };
    let Some(rule) = set.rules.get(index) else {
        return;
    };
    for (other_index, other) in set.rules.iter().enumerate() {
        if other_index != index && other.query.matches() {
            tracing::warn!(
                target: "mason.runtime",
                fired = rule.breakpoint.query(),
                also_true = other.breakpoint.query(),
                columns = rule.breakpoint.columns().get(),
                "overlapping breakpoints; last fired wins"
            );
        }
    }
    tracing::debug!(
        target: "mason.runtime",
        query = rule.breakpoint.query(),
        columns = rule.breakpoint.columns().get(),
        "breakpoint matched"
    );
    columns.set(rule.breakpoint.columns());
}

/// Maps breakpoint rules plus live media state to a column count.
pub struct BreakpointResolver {
    registry: Rc<MediaRegistry>,
    columns: Observable<ColumnCount>,
    default_columns: ColumnCount,
    set: Rc<RuleSet>,
}

impl BreakpointResolver {
    /// Validate `config` and register its breakpoints.
    pub fn from_config(
        registry: Rc<MediaRegistry>,
        config: &LayoutConfig,
    ) -> Result<Self, ConfigError> {
        let rules = config.validate()?;
        Ok(resolve_columns(
            registry,
            rules.breakpoints,
            rules.default_columns,
        ))
    }

    /// The live column count. Clones share the same value.
    #[must_use]
    pub fn columns(&self) -> Observable<ColumnCount> {
        self.columns.clone()
    }

    /// The column count right now.
    #[must_use]
    pub fn current(&self) -> ColumnCount {
        self.columns.get()
    }

    /// Count used until any rule has matched.
    #[must_use]
    pub fn default_columns(&self) -> ColumnCount {
        self.default_columns
    }

    /// Registered rules in list order.
    pub fn breakpoints(&self) -> impl Iterator<Item = &MasonryBreakpoint> + '_ {
        self.set.rules.iter().map(|r| &r.breakpoint)
    }

    /// Replace the rule list.
    ///
    /// The previous rules' listeners are removed before the new ones are
    /// registered. The column count is kept unless a new rule matches.
    pub fn set_breakpoints(&mut self, breakpoints: Vec<MasonryBreakpoint>) {
        let replacement = Rc::new(RuleSet { rules: Vec::new() });
        drop(std::mem::replace(&mut self.set, replacement));
        self.set = RuleSet::register(&self.registry, breakpoints, &self.columns);
    }

    /// Queries that are true at the same time, or empty when at most one is.
    #[must_use]
    pub fn overlapping(&self) -> Vec<&str> {
        let matching = self.set.matching_queries();
        if matching.len() > 1 { matching } else { Vec::new() }
    }
}

impl fmt::Debug for BreakpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakpointResolver")
            .field("columns", &self.current())
            .field("default_columns", &self.default_columns)
            .field("rules", &self.set.rules.len())
            .finish()
    }
}

/// Register `breakpoints` and expose the resulting live column count.
///
/// Starts at `default_columns`; any rule whose query already matches
/// overrides it immediately.
pub fn resolve_columns(
    registry: Rc<MediaRegistry>,
    breakpoints: Vec<MasonryBreakpoint>,
    default_columns: ColumnCount,
) -> BreakpointResolver {
    let columns = Observable::new(default_columns);
    let set = RuleSet::register(&registry, breakpoints, &columns);
    tracing::debug!(
        target: "mason.runtime",
        rules = set.rules.len(),
        columns = columns.get().get(),
        "breakpoints registered"
    );
    BreakpointResolver {
        registry,
        columns,
        default_columns,
        set,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fake::Switchboard;
    use mason_layout::BreakpointConfig;

    const WIDE: &str = "width>=1024";
    const NARROW: &str = "width<1024";

    fn cols(n: usize) -> ColumnCount {
        ColumnCount::new(n).unwrap()
    }

    fn bp(query: &str, n: usize) -> MasonryBreakpoint {
        MasonryBreakpoint::new(query, n).unwrap()
    }

    fn setup() -> (Rc<Switchboard>, Rc<MediaRegistry>) {
        let board = Rc::new(Switchboard::default());
        let registry = Rc::new(MediaRegistry::new(board.clone()));
        (board, registry)
    }

    #[test]
    fn default_when_nothing_matches() {
        let (_, registry) = setup();
        let resolver = resolve_columns(registry, vec![bp(WIDE, 4)], cols(3));
        assert_eq!(resolver.current(), cols(3));
    }

    #[test]
    fn initial_match_wins_over_default() {
        let (board, registry) = setup();
        board.switch(WIDE).set(true);
        let resolver = resolve_columns(registry, vec![bp(WIDE, 4), bp(NARROW, 2)], cols(1));
        assert_eq!(resolver.current(), cols(4));
    }

    #[test]
    fn crossing_threshold_switches_columns() {
        let (board, registry) = setup();
        board.switch(WIDE).set(true);
        let resolver = resolve_columns(registry, vec![bp(WIDE, 4), bp(NARROW, 2)], cols(1));
        board.switch(WIDE).set(false);
        board.switch(NARROW).set(true);
        assert_eq!(resolver.current(), cols(2));
        board.switch(NARROW).set(false);
        board.switch(WIDE).set(true);
        assert_eq!(resolver.current(), cols(4));
    }

    #[test]
    fn last_matching_rule_wins_at_registration() {
        let (board, registry) = setup();
        board.switch("a").set(true);
        board.switch("b").set(true);
        let resolver = resolve_columns(registry, vec![bp("a", 2), bp("b", 5)], cols(1));
        assert_eq!(resolver.current(), cols(5));
        assert_eq!(resolver.overlapping(), vec!["a", "b"]);
    }

    #[test]
    fn last_fired_wins_on_overlap() {
        let (board, registry) = setup();
        let resolver = resolve_columns(registry, vec![bp("a", 2), bp("b", 5)], cols(1));
        board.switch("b").set(true);
        board.switch("a").set(true);
        assert_eq!(resolver.current(), cols(2));
    }

    #[test]
    fn all_false_keeps_last_value() {
        let (board, registry) = setup();
        let resolver = resolve_columns(registry, vec![bp(WIDE, 4)], cols(1));
        board.switch(WIDE).set(true);
        board.switch(WIDE).set(false);
        assert_eq!(resolver.current(), cols(4));
        assert!(resolver.overlapping().is_empty());
    }

    #[test]
    fn observable_notifies_on_change() {
        let (board, registry) = setup();
        let resolver = resolve_columns(registry, vec![bp(WIDE, 4)], cols(1));
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = resolver.columns().subscribe(move |c| s.borrow_mut().push(c.get()));
        board.switch(WIDE).set(true);
        assert_eq!(*seen.borrow(), vec![4]);
    }

    #[test]
    fn set_breakpoints_replaces_listeners() {
        let (board, registry) = setup();
        let mut resolver = resolve_columns(registry, vec![bp(WIDE, 4)], cols(1));
        assert_eq!(board.switch(WIDE).listener_count(), 1);
        resolver.set_breakpoints(vec![bp(NARROW, 2)]);
        assert_eq!(board.switch(WIDE).listener_count(), 0);
        assert_eq!(board.switch(NARROW).listener_count(), 1);

        board.switch(WIDE).set(true);
        assert_eq!(resolver.current(), cols(1));
        board.switch(NARROW).set(true);
        assert_eq!(resolver.current(), cols(2));
        assert_eq!(resolver.breakpoints().count(), 1);
    }

    #[test]
    fn drop_removes_listeners() {
        let (board, registry) = setup();
        let resolver = resolve_columns(registry, vec![bp(WIDE, 4), bp(NARROW, 2)], cols(1));
        let columns = resolver.columns();
        drop(resolver);
        assert_eq!(board.switch(WIDE).listener_count(), 0);
        assert_eq!(board.switch(NARROW).listener_count(), 0);
        board.switch(WIDE).set(true);
        assert_eq!(columns.get(), cols(1));
    }

    #[test]
    fn shared_query_evaluated_once() {
        let (board, registry) = setup();
        let _a = resolve_columns(registry.clone(), vec![bp(WIDE, 4)], cols(1));
        let _b = resolve_columns(registry.clone(), vec![bp(WIDE, 3)], cols(1));
        assert_eq!(board.evaluations.get(), 1);
        assert_eq!(board.switch(WIDE).listener_count(), 2);
    }

    #[test]
    fn from_config_validates() {
        let (board, registry) = setup();
        board.switch(WIDE).set(true);
        let config = LayoutConfig {
            default_columns: Some(2),
            breakpoints: vec![BreakpointConfig {
                query: WIDE.into(),
                columns: 4,
            }],
            ..LayoutConfig::default()
        };
        let resolver = BreakpointResolver::from_config(registry.clone(), &config).unwrap();
        assert_eq!(resolver.current(), cols(4));
        assert_eq!(resolver.default_columns(), cols(2));

        let bad = LayoutConfig {
            breakpoints: vec![BreakpointConfig {
                query: WIDE.into(),
                columns: 0,
            }],
            ..LayoutConfig::default()
        };
        assert_eq!(
            BreakpointResolver::from_config(registry, &bad).unwrap_err(),
            ConfigError::ZeroBreakpointColumns {
                query: WIDE.into()
            }
        );
    }
}
