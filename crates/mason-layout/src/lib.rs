#![forbid(unsafe_code)]

//! Masonry layout: shortest-column-first placement with incremental reuse.
//!
//! # Role
//! `mason-layout` owns the layout algorithm and its per-container state.
//! It knows nothing about event sources or frame timing; those live in
//! `mason-runtime`, which decides *when* a pass runs. This crate decides
//! *what* a pass does.
//!
//! # Primary pieces
//! - [`columns`]: shortest/longest column selection and [`ColumnCount`].
//! - [`LayoutEngine`]: one pass over a container, re-measuring only the
//!   items whose slot changed since the previous pass.
//! - [`LayoutHost`]: the seam to whatever owns the real elements.
//! - [`LayoutConfig`]: serde-backed configuration with env overrides.

pub mod breakpoint;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod state;

pub use breakpoint::MasonryBreakpoint;
pub use columns::{ColumnCount, longest, shortest};
pub use config::{BreakpointConfig, ColumnRules, LayoutConfig};
pub use engine::{LayoutEngine, PassStats};
pub use error::ConfigError;
pub use host::{ChildNode, ItemKey, LayoutHost, Placement};
pub use state::{LayoutState, PlacedSlot};
