//! Hooks that let host applications observe the loader.

pub mod observers;

pub use observers::{LoaderContext, LoaderEvent, LoaderObserver};
