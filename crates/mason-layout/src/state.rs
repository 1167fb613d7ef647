#![forbid(unsafe_code)]

//! Per-container layout state committed at the end of every pass.

use crate::columns;
use crate::host::{ItemKey, Placement};

/// One laid-out item: its key, column, offset and cached height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedSlot {
    pub key: ItemKey,
    pub column: usize,
    pub top: f64,
    pub height: f64,
}

/// What the engine remembers between passes.
///
/// # Invariants
///
/// 1. `slots` is index-aligned with the container's element children as
///    of the last pass; a key and its cached height live in the same slot,
///    so they can never drift apart in length.
/// 2. `column_heights.len()` equals the column count of the last pass.
/// 3. Every `slot.column < column_heights.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutState {
    container_width: Option<f64>,
    column_heights: Vec<f64>,
    slots: Vec<PlacedSlot>,
}

impl LayoutState {
    /// Empty state: no pass has run yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Content width seen by the last pass, `None` before the first pass.
    #[must_use]
    pub fn container_width(&self) -> Option<f64> {
        self.container_width
    }

    /// Running bottom offset of every column after the last pass.
    #[must_use]
    pub fn column_heights(&self) -> &[f64] {
        &self.column_heights
    }

    /// Number of columns used by the last pass (0 before the first pass).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_heights.len()
    }

    /// Height of the tallest column.
    #[must_use]
    pub fn container_height(&self) -> f64 {
        self.column_heights
            .get(columns::longest(&self.column_heights))
            .copied()
            .unwrap_or(0.0)
    }

    /// Laid-out items in traversal order.
    #[must_use]
    pub fn slots(&self) -> &[PlacedSlot] {
        &self.slots
    }

    /// Keys in traversal order.
    pub fn keys(&self) -> impl Iterator<Item = ItemKey> + '_ {
        self.slots.iter().map(|slot| slot.key)
    }

    /// Slot for `key`, if it was laid out by the last pass.
    #[must_use]
    pub fn slot(&self, key: ItemKey) -> Option<&PlacedSlot> {
        self.slots.iter().find(|slot| slot.key == key)
    }

    /// Current placement of `key`, reconstructed from its slot.
    #[must_use]
    pub fn placement(&self, key: ItemKey) -> Option<Placement> {
        let slot = self.slot(key)?;
        let width = self.column_width();
        Some(Placement {
            column: slot.column,
            left: slot.column as f64 * width,
            top: slot.top,
            width,
        })
    }

    /// Column width of the last pass.
    #[must_use]
    pub fn column_width(&self) -> f64 {
        match (self.container_width, self.column_heights.len()) {
            (Some(width), n) if n > 0 => width / n as f64,
            _ => 0.0,
        }
    }

    pub(crate) fn commit(&mut self, width: f64, heights: Vec<f64>, slots: Vec<PlacedSlot>) {
        self.container_width = Some(width);
        self.column_heights = heights;
        self.slots = slots;
    }

    pub(crate) fn cached(&self, index: usize) -> Option<&PlacedSlot> {
        self.slots.get(index)
    }
}
