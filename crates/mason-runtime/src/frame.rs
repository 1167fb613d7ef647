#![forbid(unsafe_code)]

//! Display-refresh scheduling seam.

use std::fmt;

/// Handle to a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Runs callbacks at the next display-refresh opportunity.
///
/// A browser host maps this onto `requestAnimationFrame`; tests use a
/// scheduler they advance by hand. Callbacks run on the scheduler's
/// thread, after the call that requested them has returned.
pub trait FrameScheduler {
    /// Queue `callback` for the next frame.
    fn request_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle;

    /// Drop a queued callback. Handles that already ran are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}
