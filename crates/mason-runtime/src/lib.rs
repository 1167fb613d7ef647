#![forbid(unsafe_code)]

//! Runtime glue for masonry containers.
//!
//! # Role
//! `mason-layout` knows how to lay a container out; this crate decides
//! when. It turns resize, child-list mutation, item-version and
//! column-count changes into at most one layout pass per display refresh,
//! and resolves the live column count from media-query breakpoints.
//!
//! # Primary pieces
//! - [`Observable`]: shared, version-tracked value with RAII subscriptions.
//! - [`MediaRegistry`] / [`BreakpointResolver`]: live column count.
//! - [`ScheduleCoalescer`]: one recompute per frame, debounced.
//! - [`ChangeWatcher`]: every trigger source wired to one coalescer.
//! - [`attach_masonry`]: all of the above for one container.
//!
//! # Threading
//! Everything here is single-threaded (`Rc`/`RefCell`). Work runs on the
//! thread that owns the host, between frames.

pub mod breakpoints;
pub mod coalesce;
pub mod frame;
pub mod listener;
pub mod masonry;
pub mod media;
pub mod reactive;
pub mod watcher;

pub use breakpoints::{BreakpointResolver, resolve_columns};
pub use coalesce::{CoalescerTrigger, ScheduleCoalescer};
pub use frame::{FrameHandle, FrameScheduler};
pub use listener::{ListenerId, ListenerList, NotificationSource, SourceGuard};
pub use masonry::{MasonryHandle, MasonrySources, attach_masonry};
pub use media::{MediaQuery, MediaRegistry, MediaSource};
pub use reactive::{Observable, Subscription};
pub use watcher::{ChangeWatcher, TriggerKind};
