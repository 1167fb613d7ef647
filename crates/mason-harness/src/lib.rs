#![forbid(unsafe_code)]

//! Headless hosts for exercising masonry containers deterministically.
//!
//! - [`Document`]: a container with element and text children.
//! - [`Viewport`] / [`ViewportMedia`]: width, resize listeners and width
//!   media queries.
//! - [`ManualFrames`]: a frame clock advanced by the test.
//! - [`Stage`]: all three wired together, ready for
//!   [`attach_masonry`](mason_runtime::attach_masonry).
//!
//! Targets: `mason.harness` for harness events.

pub mod document;
pub mod frames;
pub mod query;
pub mod viewport;

pub use document::{ContainerStyle, Document, DocumentError, ItemSize};
pub use frames::ManualFrames;
pub use query::{MediaCondition, QueryParseError, WidthBound};
pub use viewport::{Viewport, ViewportMedia, ViewportQuery};

use mason_runtime::{MasonrySources, MediaRegistry};
use std::cell::RefCell;
use std::rc::Rc;

/// A viewport, its media registry and a manual frame clock.
#[derive(Debug)]
pub struct Stage {
    pub viewport: Rc<Viewport>,
    pub frames: Rc<ManualFrames>,
    pub registry: Rc<MediaRegistry>,
}

impl Stage {
    /// A stage whose viewport starts `width` pixels wide.
    #[must_use]
    pub fn new(width: f64) -> Self {
        let viewport = Viewport::new(width);
        let registry = Rc::new(MediaRegistry::new(Rc::new(viewport.media())));
        Self {
            viewport,
            frames: Rc::new(ManualFrames::new()),
            registry,
        }
    }

    /// Sources for attaching `document` on this stage.
    #[must_use]
    pub fn sources(&self, document: &Document) -> MasonrySources {
        MasonrySources {
            frames: self.frames.clone(),
            viewport: self.viewport.clone(),
            mutations: document.mutation_source(),
        }
    }

    /// Resize the viewport with `document` filling it.
    ///
    /// The container width changes first, so the pass triggered by the
    /// resize reads the new width.
    pub fn resize(&self, document: &RefCell<Document>, width: f64) {
        document.borrow_mut().set_client_width(width);
        self.viewport.set_width(width);
    }

    /// Advance one frame.
    pub fn run_frame(&self) -> usize {
        self.frames.run_frame()
    }
}
