#![forbid(unsafe_code)]

//! Headless container document.
//!
//! A [`Document`] is one masonry container with element and text
//! children. Items have either a fixed height or an aspect ratio, so their
//! rendered height depends on the width they were placed at, like images.
//! The document records every placement and counts every forced
//! measurement, which is what incremental-reuse tests assert on.
//!
//! Structural changes (insert, remove, replace) notify the
//! [`mutation_source`](Document::mutation_source) listeners synchronously.
//! Size changes do not: they are invisible to a child-list observer.

use mason_layout::{ChildNode, ColumnCount, ItemKey, LayoutHost, Placement};
use mason_runtime::{ListenerList, NotificationSource};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Tolerance for comparing accumulated offsets.
const EPSILON: f64 = 1e-6;

/// Document mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("{0} is already in the container")]
    DuplicateKey(ItemKey),
    #[error("{0} is not in the container")]
    UnknownKey(ItemKey),
}

/// How an item's rendered height is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemSize {
    /// Height independent of width. Negative or NaN values are passed to
    /// the engine as-is.
    Fixed(f64),
    /// `width / height` ratio; height scales with the placed width.
    AspectRatio(f64),
}

impl ItemSize {
    /// Rendered height at `width`.
    #[must_use]
    pub fn height_at(self, width: f64) -> f64 {
        match self {
            Self::Fixed(height) => height,
            Self::AspectRatio(ratio) if ratio.is_finite() && ratio > 0.0 => width / ratio,
            Self::AspectRatio(_) => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Item { key: ItemKey, size: ItemSize },
    Text(String),
}

/// Styles the engine writes on the container element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerStyle {
    /// `position: relative`
    pub positioned: bool,
    /// `width: 100%; max-width: 100%`
    pub full_width: bool,
    /// Explicit `height`, set after each pass.
    pub height: Option<f64>,
    /// Column-count marker attribute.
    pub columns_mark: Option<ColumnCount>,
}

/// One container and its children.
pub struct Document {
    client_width: f64,
    padding: (f64, f64),
    nodes: Vec<Node>,
    placements: FxHashMap<ItemKey, Placement>,
    measurements: FxHashMap<ItemKey, u32>,
    container: ContainerStyle,
    mutations: Rc<ListenerList<dyn Fn()>>,
    next_key: u64,
    style_writes: u64,
}

impl Document {
    /// Empty container with the given client width and no padding.
    #[must_use]
    pub fn new(client_width: f64) -> Self {
        Self {
            client_width,
            padding: (0.0, 0.0),
            nodes: Vec::new(),
            placements: FxHashMap::default(),
            measurements: FxHashMap::default(),
            container: ContainerStyle::default(),
            mutations: Rc::new(ListenerList::new()),
            next_key: 0,
            style_writes: 0,
        }
    }

    #[must_use]
    pub fn with_padding(mut self, left: f64, right: f64) -> Self {
        self.padding = (left, right);
        self
    }

    pub fn set_client_width(&mut self, width: f64) {
        self.client_width = width;
    }

    pub fn set_padding(&mut self, left: f64, right: f64) {
        self.padding = (left, right);
    }

    /// Child-list change notifications.
    #[must_use]
    pub fn mutation_source(&self) -> Rc<dyn NotificationSource> {
        self.mutations.clone()
    }

    /// Listeners currently subscribed to [`mutation_source`](Self::mutation_source).
    #[must_use]
    pub fn mutation_listeners(&self) -> usize {
        self.mutations.len()
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Append an item with a fresh key.
    pub fn push(&mut self, size: ItemSize) -> ItemKey {
        let key = self.fresh_key();
        self.nodes.push(Node::Item { key, size });
        self.mutated();
        key
    }

    /// Append an item with a caller-chosen key.
    pub fn push_keyed(&mut self, key: ItemKey, size: ItemSize) -> Result<(), DocumentError> {
        self.insert_keyed(usize::MAX, key, size)
    }

    /// Insert an item with a fresh key before the `index`-th element
    /// (appending when `index` is past the end).
    pub fn insert(&mut self, index: usize, size: ItemSize) -> ItemKey {
        let key = self.fresh_key();
        let at = self.node_position(index);
        self.nodes.insert(at, Node::Item { key, size });
        self.mutated();
        key
    }

    /// Insert an item with a caller-chosen key before the `index`-th element.
    pub fn insert_keyed(
        &mut self,
        index: usize,
        key: ItemKey,
        size: ItemSize,
    ) -> Result<(), DocumentError> {
        if self.contains(key) {
            return Err(DocumentError::DuplicateKey(key));
        }
        self.reserve_key(key);
        let at = self.node_position(index);
        self.nodes.insert(at, Node::Item { key, size });
        self.mutated();
        Ok(())
    }

    /// Insert a text node at raw child position `position` (clamped).
    pub fn insert_text(&mut self, position: usize, text: impl Into<String>) {
        let at = position.min(self.nodes.len());
        self.nodes.insert(at, Node::Text(text.into()));
        self.mutated();
    }

    /// Remove an item and its styles.
    pub fn remove(&mut self, key: ItemKey) -> Result<(), DocumentError> {
        let position = self
            .nodes
            .iter()
            .position(|node| matches!(node, Node::Item { key: k, .. } if *k == key))
            .ok_or(DocumentError::UnknownKey(key))?;
        self.nodes.remove(position);
        self.placements.remove(&key);
        self.mutated();
        Ok(())
    }

    /// Replace every child with `items`, as one mutation.
    pub fn replace_all(
        &mut self,
        items: impl IntoIterator<Item = (ItemKey, ItemSize)>,
    ) -> Result<(), DocumentError> {
        let mut seen = FxHashSet::default();
        let mut nodes = Vec::new();
        for (key, size) in items {
            if !seen.insert(key) {
                return Err(DocumentError::DuplicateKey(key));
            }
            nodes.push(Node::Item { key, size });
        }
        for key in &seen {
            self.reserve_key(*key);
        }
        self.placements.retain(|key, _| seen.contains(key));
        self.nodes = nodes;
        self.mutated();
        Ok(())
    }

    /// Change how an item renders without touching the child list.
    pub fn set_item_size(&mut self, key: ItemKey, size: ItemSize) -> Result<(), DocumentError> {
        self.nodes
            .iter_mut()
            .find_map(|node| match node {
                Node::Item { key: k, size: s } if *k == key => Some(s),
                _ => None,
            })
            .map(|slot| *slot = size)
            .ok_or(DocumentError::UnknownKey(key))
    }

    // ── Readback ────────────────────────────────────────────────────

    /// Element keys in document order.
    #[must_use]
    pub fn element_keys(&self) -> Vec<ItemKey> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Item { key, .. } => Some(*key),
                Node::Text(_) => None,
            })
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: ItemKey) -> bool {
        self.size_of(key).is_some()
    }

    /// Last placement written for `key`.
    #[must_use]
    pub fn placement(&self, key: ItemKey) -> Option<Placement> {
        self.placements.get(&key).copied()
    }

    /// Height `key` renders at with its current placement width.
    #[must_use]
    pub fn rendered_height(&self, key: ItemKey) -> Option<f64> {
        let width = self.placements.get(&key).map_or(0.0, |p| p.width);
        self.size_of(key).map(|size| size.height_at(width))
    }

    /// Forced measurements of `key` since the last reset.
    #[must_use]
    pub fn measure_count(&self, key: ItemKey) -> u32 {
        self.measurements.get(&key).copied().unwrap_or(0)
    }

    /// Keys measured since the last reset, in document order.
    #[must_use]
    pub fn measured_keys(&self) -> Vec<ItemKey> {
        self.element_keys()
            .into_iter()
            .filter(|key| self.measure_count(*key) > 0)
            .collect()
    }

    #[must_use]
    pub fn total_measurements(&self) -> u64 {
        self.measurements.values().map(|n| u64::from(*n)).sum()
    }

    /// Clear measurement and style-write counters.
    pub fn reset_counters(&mut self) {
        self.measurements.clear();
        self.style_writes = 0;
    }

    /// Item style writes since the last reset.
    #[must_use]
    pub fn style_writes(&self) -> u64 {
        self.style_writes
    }

    #[must_use]
    pub fn container(&self) -> &ContainerStyle {
        &self.container
    }

    #[must_use]
    pub fn container_height(&self) -> Option<f64> {
        self.container.height
    }

    /// Pairs of placed items in the same column whose boxes intersect.
    #[must_use]
    pub fn overlaps(&self) -> Vec<(ItemKey, ItemKey)> {
        let boxes: Vec<(ItemKey, usize, f64, f64)> = self
            .element_keys()
            .into_iter()
            .filter_map(|key| {
                let placement = self.placement(key)?;
                let height = self.rendered_height(key)?.max(0.0);
                Some((key, placement.column, placement.top, placement.top + height))
            })
            .collect();
        let mut overlaps = Vec::new();
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                if a.1 == b.1 && a.2 < b.3 - EPSILON && b.2 < a.3 - EPSILON {
                    overlaps.push((a.0, b.0));
                }
            }
        }
        overlaps
    }

    // ── Internals ───────────────────────────────────────────────────

    fn size_of(&self, key: ItemKey) -> Option<ItemSize> {
        self.nodes.iter().find_map(|node| match node {
            Node::Item { key: k, size } if *k == key => Some(*size),
            _ => None,
        })
    }

    fn fresh_key(&mut self) -> ItemKey {
        while self.contains(ItemKey(self.next_key)) {
            self.next_key += 1;
        }
        let key = ItemKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn reserve_key(&mut self, key: ItemKey) {
        self.next_key = self.next_key.max(key.0.saturating_add(1));
    }

    /// Raw position of the `index`-th element, or the end.
    fn node_position(&self, index: usize) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Item { .. }))
            .nth(index)
            .map_or(self.nodes.len(), |(position, _)| position)
    }

    fn mutated(&self) {
        tracing::trace!(
            target: "mason.harness",
            children = self.nodes.len(),
            "child list mutated"
        );
        self.mutations.emit();
    }
}

impl LayoutHost for Document {
    fn content_width(&self) -> f64 {
        self.client_width - self.padding.0 - self.padding.1
    }

    fn children(&self) -> Vec<ChildNode> {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Item { key, .. } => ChildNode::Element(*key),
                Node::Text(_) => ChildNode::Other,
            })
            .collect()
    }

    fn place(&mut self, key: ItemKey, placement: Placement) {
        if self.contains(key) {
            self.placements.insert(key, placement);
            self.style_writes += 1;
        }
    }

    fn measure_height(&mut self, key: ItemKey) -> f64 {
        *self.measurements.entry(key).or_insert(0) += 1;
        self.rendered_height(key).unwrap_or(0.0)
    }

    fn set_container_height(&mut self, height: f64) {
        self.container.height = Some(height);
    }

    fn prepare_container(&mut self, columns: ColumnCount) {
        self.container.positioned = true;
        self.container.full_width = true;
        self.container.columns_mark = Some(columns);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("client_width", &self.client_width)
            .field("padding", &self.padding)
            .field("children", &self.nodes.len())
            .field("container", &self.container)
            .finish()
    }
}
