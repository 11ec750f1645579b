//! Core traits for plugin resources.

mod dispose;

pub use dispose::Dispose;
