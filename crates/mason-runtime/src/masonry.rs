#![forbid(unsafe_code)]

//! Attaching the engine to one live container.
//!
//! [`attach_masonry`] owns the whole lifecycle: it prepares the container,
//! creates the [`LayoutEngine`], wires every trigger through a
//! [`ChangeWatcher`] into a [`ScheduleCoalescer`], and schedules the first
//! pass. The returned [`MasonryHandle`] keeps all of that alive; detaching
//! (or dropping it) releases every subscription and cancels the pending
//! pass.
//!
//! # Pass Execution
//!
//! A pass reads the host, the engine state and the column observable when
//! it runs, never when it was triggered. If the container is already
//! borrowed when the frame arrives, the pass is rescheduled for the next
//! frame instead of running against a partial state.

use crate::coalesce::{CoalescerTrigger, ScheduleCoalescer};
use crate::frame::FrameScheduler;
use crate::listener::NotificationSource;
use crate::reactive::Observable;
use crate::watcher::{ChangeWatcher, TriggerKind};
use mason_layout::{ColumnCount, ItemKey, LayoutConfig, LayoutEngine, LayoutHost, PassStats, Placement};
use rustc_hash::FxHashSet;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// The collaborators a container is attached to.
#[derive(Clone)]
pub struct MasonrySources {
    /// Display-refresh scheduler.
    pub frames: Rc<dyn FrameScheduler>,
    /// Viewport resize notifications.
    pub viewport: Rc<dyn NotificationSource>,
    /// Child-list mutation notifications for the container.
    pub mutations: Rc<dyn NotificationSource>,
}

impl fmt::Debug for MasonrySources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasonrySources").finish_non_exhaustive()
    }
}

/// Invalidations requested while the engine was borrowed.
#[derive(Default)]
struct Deferred {
    keys: FxHashSet<ItemKey>,
    all: bool,
}

impl Deferred {
    fn apply(self, engine: &mut LayoutEngine) {
        if self.all {
            engine.invalidate_all();
        }
        for key in self.keys {
            engine.invalidate(key);
        }
    }
}

/// Live masonry attachment for one container.
pub struct MasonryHandle {
    engine: Rc<RefCell<LayoutEngine>>,
    deferred: Rc<RefCell<Deferred>>,
    columns: Observable<ColumnCount>,
    coalescer: Option<ScheduleCoalescer>,
    watcher: Option<ChangeWatcher>,
}

/// Attach a masonry layout to `host`.
///
/// `columns` is the live column count (typically
/// [`BreakpointResolver::columns`](crate::BreakpointResolver::columns));
/// `items_version` should be bumped whenever the item sequence is replaced.
/// The first pass is scheduled immediately.
pub fn attach_masonry<H>(
    host: Rc<RefCell<H>>,
    sources: MasonrySources,
    columns: Observable<ColumnCount>,
    items_version: Observable<u64>,
    config: &LayoutConfig,
) -> MasonryHandle
where
    H: LayoutHost + 'static,
{
    let engine = Rc::new(RefCell::new(LayoutEngine::with_config(config)));
    let deferred = Rc::new(RefCell::new(Deferred::default()));

    let initial = columns.get();
    let marked = match host.try_borrow_mut() {
        Ok(mut h) => {
            h.prepare_container(initial);
            Some(initial)
        }
        Err(_) => {
            tracing::debug!(
                target: "mason.runtime",
                "container busy at attach; preparing on first pass"
            );
            None
        }
    };

    let runner = Rc::new(PassRunner {
        host,
        engine: Rc::clone(&engine),
        deferred: Rc::clone(&deferred),
        columns: columns.clone(),
        marked: Cell::new(marked),
        retry: RefCell::new(None),
        deferring: Cell::new(false),
    });
    let coalescer = {
        let runner = Rc::clone(&runner);
        ScheduleCoalescer::new(Rc::clone(&sources.frames), move || runner.run())
    };
    *runner.retry.borrow_mut() = Some(coalescer.trigger_handle());

    let watcher = ChangeWatcher::watch(
        sources.viewport,
        sources.mutations,
        &items_version,
        &columns,
        coalescer.trigger_handle(),
    );

    tracing::debug!(
        target: "mason.runtime",
        columns = initial.get(),
        force_full = config.force_full_layout,
        "masonry attached"
    );
    coalescer.trigger();

    MasonryHandle {
        engine,
        deferred,
        columns,
        coalescer: Some(coalescer),
        watcher: Some(watcher),
    }
}

/// State a scheduled pass reads when its frame arrives.
struct PassRunner<H> {
    host: Rc<RefCell<H>>,
    engine: Rc<RefCell<LayoutEngine>>,
    deferred: Rc<RefCell<Deferred>>,
    columns: Observable<ColumnCount>,
    /// Column count the container was last prepared for.
    marked: Cell<Option<ColumnCount>>,
    retry: RefCell<Option<CoalescerTrigger>>,
    /// Set while a busy pass is requesting its retry.
    deferring: Cell<bool>,
}

impl<H: LayoutHost> PassRunner<H> {
    fn run(&self) {
        let (Ok(mut host), Ok(mut engine)) =
            (self.host.try_borrow_mut(), self.engine.try_borrow_mut())
        else {
            self.defer();
            return;
        };
        std::mem::take(&mut *self.deferred.borrow_mut()).apply(&mut engine);
        let columns = self.columns.get();
        if self.marked.get() != Some(columns) {
            host.prepare_container(columns);
            self.marked.set(Some(columns));
        }
        engine.run(&mut *host, columns);
    }

    /// Reschedule a pass that found the container busy.
    ///
    /// A scheduler that runs frames inline re-enters [`run`](Self::run)
    /// from inside the retry request while the container is still busy;
    /// that nested attempt is dropped and the next trigger picks it up.
    fn defer(&self) {
        if self.deferring.replace(true) {
            tracing::debug!(
                target: "mason.runtime",
                "container still busy; pass waits for the next trigger"
            );
            return;
        }
        tracing::debug!(target: "mason.runtime", "container busy; pass deferred");
        let retry = self.retry.borrow().clone();
        if let Some(trigger) = retry {
            trigger.trigger();
        }
        self.deferring.set(false);
    }
}

impl MasonryHandle {
    /// Schedule a pass for the next frame.
    pub fn relayout(&self) {
        if let Some(coalescer) = &self.coalescer {
            coalescer.trigger();
        }
    }

    /// Run a pass now, replacing any pending one.
    pub fn relayout_now(&self) {
        if let Some(coalescer) = &self.coalescer {
            coalescer.flush_now();
        }
    }

    /// Re-measure `key` (and everything after it) on the next pass, and
    /// schedule that pass.
    pub fn invalidate(&self, key: ItemKey) {
        if !self.is_attached() {
            return;
        }
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => engine.invalidate(key),
            Err(_) => {
                tracing::debug!(target: "mason.runtime", key = key.0, "engine busy; invalidation queued");
                self.deferred.borrow_mut().keys.insert(key);
            }
        }
        self.relayout();
    }

    /// Make the next pass full, and schedule it.
    pub fn invalidate_all(&self) {
        if !self.is_attached() {
            return;
        }
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => engine.invalidate_all(),
            Err(_) => {
                tracing::debug!(target: "mason.runtime", "engine busy; full relayout queued");
                self.deferred.borrow_mut().all = true;
            }
        }
        self.relayout();
    }

    /// Statistics of the most recent pass.
    #[must_use]
    pub fn stats(&self) -> PassStats {
        self.engine
            .try_borrow()
            .map(|engine| engine.stats().clone())
            .unwrap_or_default()
    }

    /// Passes run so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.engine.try_borrow().map(|e| e.passes()).unwrap_or(0)
    }

    /// Where `key` was placed by the most recent pass.
    #[must_use]
    pub fn placement(&self, key: ItemKey) -> Option<Placement> {
        self.engine.try_borrow().ok()?.placement(key)
    }

    /// The live column count this container follows.
    #[must_use]
    pub fn columns(&self) -> ColumnCount {
        self.columns.get()
    }

    /// Notifications received from one trigger source.
    #[must_use]
    pub fn triggers(&self, kind: TriggerKind) -> u64 {
        self.watcher.as_ref().map_or(0, |w| w.fired(kind))
    }

    /// Whether a pass is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.coalescer.as_ref().is_some_and(ScheduleCoalescer::is_pending)
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.coalescer.is_some()
    }

    /// Release every subscription and cancel the pending pass.
    ///
    /// Idempotent. Placements already written to the container stay.
    pub fn detach(&mut self) {
        let Some(coalescer) = self.coalescer.take() else {
            return;
        };
        self.watcher = None;
        coalescer.teardown();
        tracing::debug!(
            target: "mason.runtime",
            passes = self.passes(),
            runs = coalescer.runs(),
            "masonry detached"
        );
    }
}

impl Drop for MasonryHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for MasonryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasonryHandle")
            .field("attached", &self.is_attached())
            .field("columns", &self.columns())
            .field("passes", &self.passes())
            .finish()
    }
}
