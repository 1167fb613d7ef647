#![forbid(unsafe_code)]

//! One recompute per display refresh.
//!
//! [`ScheduleCoalescer`] wraps a callback. Every
//! [`trigger`](ScheduleCoalescer::trigger) cancels the pending frame (if
//! any) and requests a new one, so a burst of triggers within one refresh
//! interval runs the callback exactly once, at the next frame after the
//! last trigger.
//!
//! # Invariants
//!
//! 1. At most one frame request is outstanding.
//! 2. After [`teardown`](ScheduleCoalescer::teardown) (or drop) the callback
//!    never runs again and triggering is a no-op.
//! 3. A frame callback that outlives its request (the scheduler ignored a
//!    cancel) is recognised by its generation and does nothing.

use crate::frame::{FrameHandle, FrameScheduler};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use web_time::Instant;

struct Inner {
    scheduler: Rc<dyn FrameScheduler>,
    callback: Rc<dyn Fn()>,
    pending: Cell<Option<FrameHandle>>,
    /// Bumped on every request, cancel and teardown.
    generation: Cell<u64>,
    torn_down: Cell<bool>,
    first_trigger: Cell<Option<Instant>>,
    triggers: Cell<u64>,
    runs: Cell<u64>,
}

impl Inner {
    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.generation.set(self.generation.get() + 1);
    }

    fn trigger(self: &Rc<Self>) {
        if self.torn_down.get() {
            return;
        }
        self.triggers.set(self.triggers.get() + 1);
        if self.first_trigger.get().is_none() {
            self.first_trigger.set(Some(Instant::now()));
        }

        self.cancel_pending();
        let generation = self.generation.get();
        let weak = Rc::downgrade(self);
        let handle = self.scheduler.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.fire(generation);
            }
        }));
        // A scheduler that ran the callback inline has already moved the
        // generation on.
        if self.generation.get() == generation {
            self.pending.set(Some(handle));
        }
    }

    fn fire(&self, generation: u64) {
        if self.torn_down.get() || self.generation.get() != generation {
            return;
        }
        self.pending.set(None);
        self.generation.set(generation + 1);
        self.run();
    }

    fn run(&self) {
        self.runs.set(self.runs.get() + 1);
        let coalesced_us = self
            .first_trigger
            .take()
            .map(|at| at.elapsed().as_micros() as u64)
            .unwrap_or(0);
        tracing::trace!(
            target: "mason.runtime",
            run = self.runs.get(),
            coalesced_us,
            "coalesced recompute"
        );
        let callback = Rc::clone(&self.callback);
        callback();
    }
}

/// Debounces triggers into at most one callback per frame.
pub struct ScheduleCoalescer {
    inner: Rc<Inner>,
}

impl ScheduleCoalescer {
    /// Wrap `callback`, scheduling it through `scheduler`.
    pub fn new(scheduler: Rc<dyn FrameScheduler>, callback: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                scheduler,
                callback: Rc::new(callback),
                pending: Cell::new(None),
                generation: Cell::new(0),
                torn_down: Cell::new(false),
                first_trigger: Cell::new(None),
                triggers: Cell::new(0),
                runs: Cell::new(0),
            }),
        }
    }

    /// Schedule the callback for the next frame, replacing any pending one.
    pub fn trigger(&self) {
        self.inner.trigger();
    }

    /// A trigger that can be handed to listeners without keeping the
    /// coalescer alive.
    #[must_use]
    pub fn trigger_handle(&self) -> CoalescerTrigger {
        CoalescerTrigger {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Cancel any pending frame and run the callback now.
    ///
    /// Does nothing after teardown.
    pub fn flush_now(&self) {
        if self.inner.torn_down.get() {
            return;
        }
        self.inner.cancel_pending();
        self.inner.run();
    }

    /// Cancel the pending frame and stop accepting triggers.
    pub fn teardown(&self) {
        if self.inner.torn_down.replace(true) {
            return;
        }
        self.inner.cancel_pending();
        self.inner.first_trigger.set(None);
    }

    /// Whether a frame is currently requested.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.get()
    }

    /// Triggers accepted so far.
    #[must_use]
    pub fn triggers(&self) -> u64 {
        self.inner.triggers.get()
    }

    /// Callback executions so far.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.inner.runs.get()
    }
}

impl Drop for ScheduleCoalescer {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for ScheduleCoalescer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleCoalescer")
            .field("pending", &self.is_pending())
            .field("torn_down", &self.is_torn_down())
            .field("triggers", &self.triggers())
            .field("runs", &self.runs())
            .finish()
    }
}

/// Weak trigger for a [`ScheduleCoalescer`].
///
/// Becomes a no-op once the coalescer is dropped or torn down.
#[derive(Clone)]
pub struct CoalescerTrigger {
    inner: Weak<Inner>,
}

impl CoalescerTrigger {
    pub fn trigger(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.trigger();
        }
    }

    /// Whether the coalescer still accepts triggers.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| !inner.torn_down.get())
    }
}

impl fmt::Debug for CoalescerTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescerTrigger")
            .field("live", &self.is_live())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Scheduler that queues callbacks until `run_frame` is called.
    #[derive(Default)]
    struct QueueFrames {
        next: Cell<u64>,
        queue: RefCell<Vec<(FrameHandle, Box<dyn FnOnce()>)>>,
        cancelled: Cell<u32>,
    }

    impl QueueFrames {
        fn run_frame(&self) {
            let batch = std::mem::take(&mut *self.queue.borrow_mut());
            for (_, cb) in batch {
                cb();
            }
        }

        fn queued(&self) -> usize {
            self.queue.borrow().len()
        }
    }

    impl FrameScheduler for QueueFrames {
        fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle {
            let handle = FrameHandle(self.next.get());
            self.next.set(handle.0 + 1);
            self.queue.borrow_mut().push((handle, callback));
            handle
        }

        fn cancel_frame(&self, handle: FrameHandle) {
            self.cancelled.set(self.cancelled.get() + 1);
            self.queue.borrow_mut().retain(|(h, _)| *h != handle);
        }
    }

    /// Scheduler that runs every callback immediately.
    struct InlineFrames;

    impl FrameScheduler for InlineFrames {
        fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle {
            callback();
            FrameHandle(0)
        }

        fn cancel_frame(&self, _handle: FrameHandle) {}
    }

    /// Scheduler that ignores cancellation.
    #[derive(Default)]
    struct LeakyFrames {
        queue: RefCell<Vec<Box<dyn FnOnce()>>>,
    }

    impl FrameScheduler for LeakyFrames {
        fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle {
            self.queue.borrow_mut().push(callback);
            FrameHandle(0)
        }

        fn cancel_frame(&self, _handle: FrameHandle) {}
    }

    fn counting(scheduler: Rc<dyn FrameScheduler>) -> (ScheduleCoalescer, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let coalescer = ScheduleCoalescer::new(scheduler, move || c.set(c.get() + 1));
        (coalescer, calls)
    }

    #[test]
    fn burst_runs_once() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        for _ in 0..10 {
            coalescer.trigger();
        }
        assert_eq!(frames.queued(), 1);
        assert!(coalescer.is_pending());
        frames.run_frame();
        assert_eq!(calls.get(), 1);
        assert!(!coalescer.is_pending());
        assert_eq!(coalescer.triggers(), 10);
        assert_eq!(coalescer.runs(), 1);
    }

    #[test]
    fn trigger_replaces_pending_frame() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, _) = counting(frames.clone());
        coalescer.trigger();
        coalescer.trigger();
        assert_eq!(frames.cancelled.get(), 1);
    }

    #[test]
    fn separate_frames_run_separately() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        coalescer.trigger();
        frames.run_frame();
        coalescer.trigger();
        frames.run_frame();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn teardown_cancels_and_ignores_triggers() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        coalescer.trigger();
        coalescer.teardown();
        assert_eq!(frames.queued(), 0);
        coalescer.trigger();
        frames.run_frame();
        assert_eq!(calls.get(), 0);
        assert!(coalescer.is_torn_down());
    }

    #[test]
    fn drop_cancels_pending() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        let handle = coalescer.trigger_handle();
        coalescer.trigger();
        drop(coalescer);
        assert_eq!(frames.queued(), 0);
        handle.trigger();
        assert!(!handle.is_live());
        frames.run_frame();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn stale_callback_is_ignored() {
        let frames = Rc::new(LeakyFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        coalescer.trigger();
        coalescer.trigger();
        coalescer.trigger();
        let queued = std::mem::take(&mut *frames.queue.borrow_mut());
        assert_eq!(queued.len(), 3);
        for cb in queued {
            cb();
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn inline_scheduler_leaves_nothing_pending() {
        let (coalescer, calls) = counting(Rc::new(InlineFrames));
        coalescer.trigger();
        assert_eq!(calls.get(), 1);
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn flush_now_runs_synchronously() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        coalescer.trigger();
        coalescer.flush_now();
        assert_eq!(calls.get(), 1);
        assert_eq!(frames.queued(), 0);
        frames.run_frame();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn weak_trigger_schedules() {
        let frames = Rc::new(QueueFrames::default());
        let (coalescer, calls) = counting(frames.clone());
        let handle = coalescer.trigger_handle();
        assert!(handle.is_live());
        handle.trigger();
        handle.trigger();
        frames.run_frame();
        assert_eq!(calls.get(), 1);
        assert_eq!(coalescer.triggers(), 2);
    }

    #[test]
    fn callback_may_retrigger() {
        let frames = Rc::new(QueueFrames::default());
        let slot: Rc<RefCell<Option<CoalescerTrigger>>> = Rc::new(RefCell::new(None));
        let calls = Rc::new(Cell::new(0));
        let (s, c) = (Rc::clone(&slot), Rc::clone(&calls));
        let coalescer = ScheduleCoalescer::new(frames.clone(), move || {
            c.set(c.get() + 1);
            if c.get() == 1 {
                if let Some(t) = s.borrow().as_ref() {
                    t.trigger();
                }
            }
        });
        *slot.borrow_mut() = Some(coalescer.trigger_handle());
        coalescer.trigger();
        frames.run_frame();
        assert_eq!(calls.get(), 1);
        assert!(coalescer.is_pending());
        frames.run_frame();
        assert_eq!(calls.get(), 2);
    }
}
