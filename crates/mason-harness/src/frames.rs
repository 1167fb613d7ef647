#![forbid(unsafe_code)]

//! Deterministic frame clock.

use mason_runtime::{FrameHandle, FrameScheduler};
use std::cell::{Cell, RefCell};
use std::fmt;

/// A [`FrameScheduler`] that only advances when told to.
///
/// Callbacks requested while a frame is running are queued for the next
/// frame, like `requestAnimationFrame` inside a frame callback.
#[derive(Default)]
pub struct ManualFrames {
    next: Cell<u64>,
    queue: RefCell<Vec<(FrameHandle, Box<dyn FnOnce()>)>>,
    requested: Cell<u64>,
    cancelled: Cell<u64>,
    frames: Cell<u64>,
}

impl ManualFrames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback queued before this call; returns how many ran.
    pub fn run_frame(&self) -> usize {
        let batch = std::mem::take(&mut *self.queue.borrow_mut());
        self.frames.set(self.frames.get() + 1);
        tracing::trace!(target: "mason.harness", callbacks = batch.len(), "frame");
        let ran = batch.len();
        for (_, callback) in batch {
            callback();
        }
        ran
    }

    /// Run frames until nothing is queued, up to `limit` frames.
    ///
    /// Returns the number of frames run.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut frames = 0;
        while frames < limit && self.pending() > 0 {
            self.run_frame();
            frames += 1;
        }
        frames
    }

    /// Callbacks waiting for the next frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    #[must_use]
    pub fn requested(&self) -> u64 {
        self.requested.get()
    }

    /// Cancellations that removed a queued callback.
    #[must_use]
    pub fn cancelled(&self) -> u64 {
        self.cancelled.get()
    }

    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.frames.get()
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle {
        let handle = FrameHandle(self.next.get());
        self.next.set(handle.0 + 1);
        self.requested.set(self.requested.get() + 1);
        self.queue.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|(h, _)| *h != handle);
        if queue.len() != before {
            self.cancelled.set(self.cancelled.get() + 1);
        }
    }
}

impl fmt::Debug for ManualFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFrames")
            .field("pending", &self.pending())
            .field("frames_run", &self.frames.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn callbacks_wait_for_frame() {
        let frames = ManualFrames::new();
        let hit = Rc::new(Cell::new(false));
        let h = Rc::clone(&hit);
        frames.request_frame(Box::new(move || h.set(true)));
        assert!(!hit.get());
        assert_eq!(frames.run_frame(), 1);
        assert!(hit.get());
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn cancel_removes_callback() {
        let frames = ManualFrames::new();
        let handle = frames.request_frame(Box::new(|| panic!("cancelled frame ran")));
        frames.cancel_frame(handle);
        frames.cancel_frame(handle);
        assert_eq!(frames.cancelled(), 1);
        assert_eq!(frames.run_frame(), 0);
    }

    #[test]
    fn nested_requests_go_to_next_frame() {
        let frames = Rc::new(ManualFrames::new());
        let count = Rc::new(Cell::new(0));
        let (f, c) = (Rc::clone(&frames), Rc::clone(&count));
        frames.request_frame(Box::new(move || {
            c.set(c.get() + 1);
            let c2 = Rc::clone(&c);
            f.request_frame(Box::new(move || c2.set(c2.get() + 1)));
        }));
        frames.run_frame();
        assert_eq!(count.get(), 1);
        assert_eq!(frames.run_until_idle(10), 1);
        assert_eq!(count.get(), 2);
        assert_eq!(frames.frames_run(), 2);
    }
}
