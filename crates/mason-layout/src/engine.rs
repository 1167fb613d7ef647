#![forbid(unsafe_code)]

//! Incremental masonry layout engine.
//!
//! One [`LayoutEngine`] belongs to one container. Each call to
//! [`run`](LayoutEngine::run) walks the container's element children in
//! document order and assigns every item to the shortest column. Items
//! whose slot is unchanged since the previous pass reuse their cached
//! height and column without touching the host.
//!
//! # Key Invariant
//!
//! The output of an incremental pass is identical to a full pass over the
//! same children. A clean prefix replays the exact same greedy decisions
//! (same keys, same heights, same column vector), so reusing its cached
//! column is equivalent to recomputing it.
//!
//! # Dirtiness
//!
//! A pass is *full* when the content width or column count changed, when
//! [`invalidate_all`](LayoutEngine::invalidate_all) was called, or when
//! force-full mode is on. Otherwise the first child whose key differs from
//! the cached slot at the same index (or was passed to
//! [`invalidate`](LayoutEngine::invalidate)) turns the rest of the pass
//! full: one insertion or removal shifts every later slot.
//!
//! # Failure Modes
//!
//! - Zero content width: every column is zero-wide, the pass still runs.
//! - Negative or non-finite readings from the host are clamped to `0.0`.

use crate::columns::{ColumnCount, longest, shortest};
use crate::config::LayoutConfig;
use crate::host::{ChildNode, ItemKey, LayoutHost, Placement};
use crate::state::{LayoutState, PlacedSlot};
use rustc_hash::FxHashSet;
use web_time::Instant;

// ============================================================================
// PassStats
// ============================================================================

/// Statistics for a single layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassStats {
    /// Items whose height was measured through the host.
    pub measured: usize,
    /// Items advanced from their cached height.
    pub reused: usize,
    /// Element children traversed.
    pub total: usize,
    /// Whether reuse was disabled from the first child.
    pub full_relayout: bool,
    /// Content width used by the pass.
    pub container_width: f64,
    /// Height written to the container.
    pub container_height: f64,
    /// Bottom offset of every column after the pass.
    pub column_heights: Vec<f64>,
}

impl PassStats {
    /// Fraction of items served from cache (0.0 – 1.0).
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.reused as f64 / self.total as f64
        }
    }
}

// ============================================================================
// LayoutEngine
// ============================================================================

/// Masonry layout engine for one container.
pub struct LayoutEngine {
    state: LayoutState,
    /// Keys to re-measure on the next pass even if their slot is unchanged.
    invalidated: FxHashSet<ItemKey>,
    /// Next pass must be full.
    invalidate_all: bool,
    /// Every pass is full.
    force_full: bool,
    last: PassStats,
    passes: u64,
}

impl LayoutEngine {
    /// Create an engine with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LayoutState::new(),
            invalidated: FxHashSet::default(),
            invalidate_all: false,
            force_full: false,
            last: PassStats::default(),
            passes: 0,
        }
    }

    /// Create an engine honoring `config.force_full_layout`.
    #[must_use]
    pub fn with_config(config: &LayoutConfig) -> Self {
        let mut engine = Self::new();
        engine.force_full = config.force_full_layout;
        engine
    }

    // ── Pass ────────────────────────────────────────────────────────

    /// Lay out every element child of `host` into `columns` columns.
    pub fn run<H>(&mut self, host: &mut H, columns: ColumnCount) -> PassStats
    where
        H: LayoutHost + ?Sized,
    {
        let start = Instant::now();
        let column_count = columns.get();
        let container_width = sanitize(host.content_width(), "container_width");

        let width_changed = self.state.container_width() != Some(container_width);
        let columns_changed = self.state.column_count() != column_count;
        let mut full = self.force_full || self.invalidate_all || width_changed || columns_changed;

        let _span = tracing::debug_span!(
            target: "mason.layout",
            "masonry.pass",
            columns = column_count,
            container_width,
            full_relayout = full,
            measured = tracing::field::Empty,
            reused = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        )
        .entered();

        let column_width = container_width / column_count as f64;
        let mut heights = vec![0.0_f64; column_count];
        let mut slots = Vec::with_capacity(self.state.slots().len());
        let mut stats = PassStats {
            full_relayout: full,
            container_width,
            ..PassStats::default()
        };

        for child in host.children() {
            let ChildNode::Element(key) = child else {
                continue;
            };
            let index = slots.len();

            let clean = if full {
                None
            } else {
                self.state
                    .cached(index)
                    .filter(|slot| slot.key == key && !self.invalidated.contains(&key))
                    .copied()
            };

            let slot = match clean {
                Some(cached) => {
                    stats.reused += 1;
                    PlacedSlot {
                        top: heights[cached.column],
                        ..cached
                    }
                }
                None => {
                    full = true;
                    let column = shortest(&heights);
                    let top = heights[column];
                    host.place(
                        key,
                        Placement {
                            column,
                            left: column as f64 * column_width,
                            top,
                            width: column_width,
                        },
                    );
                    let height = sanitize(host.measure_height(key), "item_height");
                    stats.measured += 1;
                    tracing::trace!(
                        target: "mason.layout",
                        %key,
                        index,
                        column,
                        top,
                        height,
                        "item placed"
                    );
                    PlacedSlot {
                        key,
                        column,
                        top,
                        height,
                    }
                }
            };

            heights[slot.column] += slot.height;
            slots.push(slot);
        }

        let container_height = heights[longest(&heights)];
        host.set_container_height(container_height);

        stats.total = slots.len();
        stats.container_height = container_height;
        stats.column_heights.clone_from(&heights);
        self.state.commit(container_width, heights, slots);
        self.invalidated.clear();
        self.invalidate_all = false;
        self.passes += 1;

        let duration_us = start.elapsed().as_micros() as u64;
        let span = tracing::Span::current();
        span.record("measured", stats.measured);
        span.record("reused", stats.reused);
        span.record("duration_us", duration_us);
        tracing::debug!(
            target: "mason.layout",
            total = stats.total,
            measured = stats.measured,
            reused = stats.reused,
            container_height,
            duration_us,
            "layout pass complete"
        );

        self.last = stats.clone();
        stats
    }

    // ── Dirty Tracking ──────────────────────────────────────────────

    /// Re-measure `key` on the next pass, along with everything after it.
    ///
    /// Use when an item's content changed height without any structural
    /// change to the child list.
    pub fn invalidate(&mut self, key: ItemKey) {
        self.invalidated.insert(key);
    }

    /// Make the next pass full.
    pub fn invalidate_all(&mut self) {
        self.invalidate_all = true;
    }

    /// Whether the next pass is already known to be full.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.invalidate_all || self.force_full
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Enable or disable force-full mode.
    pub fn set_force_full(&mut self, force: bool) {
        self.force_full = force;
    }

    /// Whether force-full mode is enabled.
    #[must_use]
    pub fn force_full(&self) -> bool {
        self.force_full
    }

    // ── Introspection ───────────────────────────────────────────────

    /// Committed state of the last pass.
    #[must_use]
    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    /// Statistics of the last pass.
    #[must_use]
    pub fn stats(&self) -> &PassStats {
        &self.last
    }

    /// Number of passes run so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Current placement of `key`, if it was laid out by the last pass.
    #[must_use]
    pub fn placement(&self, key: ItemKey) -> Option<Placement> {
        self.state.placement(key)
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("slots", &self.state.slots().len())
            .field("columns", &self.state.column_count())
            .field("passes", &self.passes)
            .field("force_full", &self.force_full)
            .finish()
    }
}

fn sanitize(value: f64, what: &'static str) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::debug!(target: "mason.layout", what, value, "clamping host reading to zero");
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================
