#![warn(missing_docs)]

//! Keep GNOME theme preferences in sync with Night Light.
//!
//! Each preference has a day value and a night value in the extension store;
//! the value matching the Night Light state is mirrored into the system store.
//! A custom shell stylesheet and a light/dark wallpaper descriptor follow along.

pub use themex_core as core;
pub use themex_services as services;
pub use themex_theme as theme;

/// A "prelude" for users of themex.
///
/// Importing this module brings into scope the most common types
/// needed to run the synchronizer.
///
/// ```rust
/// use themex::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::keys::{extension_schema, system_schema, SYSTEM_LAYOUT};
    pub use crate::core::{
        Component, NightSignal, Orchestrator, Preference, StylesheetCache, SyncEngine, SyncRule, ThemexConfig,
    };

    pub use crate::services::{
        GSettingsStore, KeyStore, MemoryStore, SettingsStore, ThemeLocator, Value, XdgThemeLocator,
    };

    pub use crate::theme::{ShellTheme, ThemeContext, ThemeEngine};

    pub use smol::LocalExecutor;
}
