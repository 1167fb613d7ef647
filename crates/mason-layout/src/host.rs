#![forbid(unsafe_code)]

//! The seam between the engine and whatever owns the real elements.
//!
//! A [`LayoutHost`] represents one container. The engine reads the
//! container's width and child list, writes placements, and forces height
//! measurements only for items it considers dirty. Everything the engine
//! remembers between passes is keyed by [`ItemKey`], never by a handle to
//! a rendered element.

use crate::columns::ColumnCount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for one item, bound to a layout slot.
///
/// Keys are supplied by the application (or assigned by the host when
/// an item is rendered) and must stay stable for the lifetime of the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey(pub u64);

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

impl From<u64> for ItemKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// One direct child of the container, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildNode {
    /// A laid-out item.
    Element(ItemKey),
    /// Text, comments and anything else the engine must skip.
    Other,
}

/// Where an item goes: absolute offsets inside the container's content box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub column: usize,
    pub left: f64,
    pub top: f64,
    pub width: f64,
}

/// Tree traversal, measurement and style writes for one container.
pub trait LayoutHost {
    /// Content-box width: client width minus horizontal padding.
    fn content_width(&self) -> f64;

    /// Direct children in stable document order.
    fn children(&self) -> Vec<ChildNode>;

    /// Size and absolutely position an item.
    fn place(&mut self, key: ItemKey, placement: Placement);

    /// Force a layout read and return the item's rendered height.
    ///
    /// Called right after [`place`](Self::place), so the height reflects
    /// the new column width.
    fn measure_height(&mut self, key: ItemKey) -> f64;

    /// Set the container's own height.
    fn set_container_height(&mut self, height: f64);

    /// Turn the container into a positioning context and tag it with the
    /// active column count. Called on attach and on column-count change.
    fn prepare_container(&mut self, columns: ColumnCount) {
        let _ = columns;
    }
}
