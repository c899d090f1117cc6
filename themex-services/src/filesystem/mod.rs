//! Filesystem change notification.
//!
//! Wraps the `notify` crate so changes can be awaited from a single-threaded
//! async executor.

pub mod error;
pub mod watcher;

// Re-export public API
pub use error::FileSystemError;
pub use watcher::{FileSystemChange, FileSystemWatcher};
