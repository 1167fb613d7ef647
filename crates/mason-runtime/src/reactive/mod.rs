#![forbid(unsafe_code)]

//! Reactive primitives shared by the resolver, the watcher and hosts.

pub mod observable;

pub use observable::{Observable, Subscription};
