#![forbid(unsafe_code)]

//! Every "layout might be stale" source, funnelled into one coalescer.

use crate::coalesce::CoalescerTrigger;
use crate::listener::{NotificationSource, SourceGuard};
use crate::reactive::{Observable, Subscription};
use mason_layout::ColumnCount;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Why a recompute was requested.
///
/// Used for logging and counters only: every kind schedules the same
/// coalesced pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// The viewport was resized.
    Resize,
    /// A child was added to or removed from the container.
    Mutation,
    /// A new version of the item sequence was published.
    Items,
    /// The live column count changed.
    Columns,
}

impl TriggerKind {
    pub const ALL: [Self; 4] = [Self::Resize, Self::Mutation, Self::Items, Self::Columns];

    fn index(self) -> usize {
        match self {
            Self::Resize => 0,
            Self::Mutation => 1,
            Self::Items => 2,
            Self::Columns => 3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Mutation => "mutation",
            Self::Items => "items",
            Self::Columns => "columns",
        }
    }
}

type Counters = Rc<[Cell<u64>; 4]>;

fn fire(counters: &Counters, trigger: &CoalescerTrigger, kind: TriggerKind) {
    let slot = &counters[kind.index()];
    slot.set(slot.get() + 1);
    tracing::trace!(target: "mason.runtime", trigger = kind.as_str(), "layout trigger");
    trigger.trigger();
}

/// Holds the subscriptions that feed one container's coalescer.
///
/// Dropping the watcher releases all four subscriptions.
pub struct ChangeWatcher {
    counters: Counters,
    _resize: SourceGuard,
    _mutation: SourceGuard,
    _items: Subscription,
    _columns: Subscription,
}

impl ChangeWatcher {
    /// Subscribe to every source, forwarding each notification to `trigger`.
    pub fn watch(
        viewport: Rc<dyn NotificationSource>,
        mutations: Rc<dyn NotificationSource>,
        items_version: &Observable<u64>,
        columns: &Observable<ColumnCount>,
        trigger: CoalescerTrigger,
    ) -> Self {
        let counters: Counters = Rc::new(Default::default());

        let source_callback = |kind: TriggerKind| -> Rc<dyn Fn()> {
            let counters = Rc::clone(&counters);
            let trigger = trigger.clone();
            Rc::new(move || fire(&counters, &trigger, kind))
        };
        let resize = SourceGuard::subscribe(viewport, source_callback(TriggerKind::Resize));
        let mutation = SourceGuard::subscribe(mutations, source_callback(TriggerKind::Mutation));

        let items = {
            let counters = Rc::clone(&counters);
            let trigger = trigger.clone();
            items_version.subscribe(move |_| fire(&counters, &trigger, TriggerKind::Items))
        };
        let columns = {
            let counters = Rc::clone(&counters);
            columns.subscribe(move |_| fire(&counters, &trigger, TriggerKind::Columns))
        };

        Self {
            counters,
            _resize: resize,
            _mutation: mutation,
            _items: items,
            _columns: columns,
        }
    }

    /// Notifications received from `kind` so far.
    #[must_use]
    pub fn fired(&self, kind: TriggerKind) -> u64 {
        self.counters[kind.index()].get()
    }
}

impl fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ChangeWatcher");
        for kind in TriggerKind::ALL {
            s.field(kind.as_str(), &self.fired(kind));
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coalesce::ScheduleCoalescer;
    use crate::frame::{FrameHandle, FrameScheduler};
    use crate::listener::ListenerList;
    use std::cell::RefCell;

    #[derive(Default)]
    struct QueueFrames {
        queue: RefCell<Vec<Box<dyn FnOnce()>>>,
        cancelled: Cell<u32>,
    }

    impl QueueFrames {
        fn run_frame(&self) {
            let batch = std::mem::take(&mut *self.queue.borrow_mut());
            for cb in batch {
                cb();
            }
        }
    }

    impl FrameScheduler for QueueFrames {
        fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle {
            self.queue.borrow_mut().push(callback);
            FrameHandle(self.queue.borrow().len() as u64)
        }

        fn cancel_frame(&self, _handle: FrameHandle) {
            // Stale callbacks are filtered by the coalescer's generation.
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }

    struct Rig {
        frames: Rc<QueueFrames>,
        viewport: Rc<ListenerList<dyn Fn()>>,
        mutations: Rc<ListenerList<dyn Fn()>>,
        items: Observable<u64>,
        columns: Observable<ColumnCount>,
        runs: Rc<Cell<u32>>,
        coalescer: ScheduleCoalescer,
    }

    fn rig() -> Rig {
        let frames = Rc::new(QueueFrames::default());
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        let coalescer = ScheduleCoalescer::new(frames.clone(), move || r.set(r.get() + 1));
        Rig {
            frames,
            viewport: Rc::new(ListenerList::new()),
            mutations: Rc::new(ListenerList::new()),
            items: Observable::new(0),
            columns: Observable::new(ColumnCount::ONE),
            runs,
            coalescer,
        }
    }

    fn watch(rig: &Rig) -> ChangeWatcher {
        ChangeWatcher::watch(
            rig.viewport.clone(),
            rig.mutations.clone(),
            &rig.items,
            &rig.columns,
            rig.coalescer.trigger_handle(),
        )
    }

    #[test]
    fn every_source_triggers() {
        let rig = rig();
        let watcher = watch(&rig);
        rig.viewport.emit();
        rig.mutations.emit();
        rig.items.set(1);
        rig.columns.set(ColumnCount::new(3).unwrap());
        for kind in TriggerKind::ALL {
            assert_eq!(watcher.fired(kind), 1, "{kind:?}");
        }
        rig.frames.run_frame();
        assert_eq!(rig.runs.get(), 1);
    }

    #[test]
    fn unchanged_observables_do_not_trigger() {
        let rig = rig();
        let watcher = watch(&rig);
        rig.items.set(0);
        rig.columns.set(ColumnCount::ONE);
        assert_eq!(watcher.fired(TriggerKind::Items), 0);
        assert_eq!(watcher.fired(TriggerKind::Columns), 0);
        assert!(!rig.coalescer.is_pending());
    }

    #[test]
    fn drop_releases_subscriptions() {
        let rig = rig();
        let watcher = watch(&rig);
        assert_eq!(rig.viewport.len(), 1);
        assert_eq!(rig.items.subscriber_count(), 1);
        drop(watcher);
        assert!(rig.viewport.is_empty());
        assert!(rig.mutations.is_empty());
        assert_eq!(rig.items.subscriber_count(), 0);
        assert_eq!(rig.columns.subscriber_count(), 0);
        rig.viewport.emit();
        assert!(!rig.coalescer.is_pending());
    }
}
