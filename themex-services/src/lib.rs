// SPDX-License-Identifier: LGPL-3.0-only
//! Stores, filesystem and desktop services used by the themex synchronizer.

pub mod discovery;
pub mod filesystem;
pub mod io_helpers;
pub mod keystore;
#[cfg(feature = "night-light")]
pub mod night_light;
pub mod settings;
pub mod wallpaper;

// Re-export commonly used types
pub use discovery::{AvailableThemes, ThemeCategory, ThemeDirectories, ThemeLocator, XdgThemeLocator};
pub use keystore::{callback, Callback, GSettingsStore, KeyStore, MemoryStore, Owner, StoreError, StoreResult, Value, ValueKind};
pub use settings::{SettingsStore, WatchHandle};
pub use wallpaper::{WallpaperPair, WallpaperWriter};
