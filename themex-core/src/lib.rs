#![warn(missing_docs)]

//! Core library for themex => See `themex` crate.
//!
//! Contains the synchronization engine and the components it drives.

/// Contains the [Component](component::Component) lifecycle trait.
pub mod component;

/// Contains the [ThemexConfig](config::ThemexConfig) struct.
pub mod config;

pub mod keys;

/// Contains the [Orchestrator](orchestrator::Orchestrator) owning every component.
pub mod orchestrator;

/// Contains the [ShellLoader](shell::ShellLoader) for the shell theme.
pub mod shell;

pub mod signal;

pub mod stylesheet;

pub mod sync;

/// Contains the debouncer for delayed work on the local executor.
pub mod tasks;

pub use component::Component;
pub use config::{StylesheetConfig, ThemexConfig, WallpaperConfig};
pub use orchestrator::Orchestrator;
pub use shell::ShellLoader;
pub use signal::{NightSignal, StateSignal};
pub use stylesheet::{CacheState, StylesheetCache, StylesheetRecord};
pub use sync::{default_rules, reconcile, Preference, SyncEngine, SyncError, SyncResult, SyncRule};
pub use tasks::Debouncer;
