#![warn(missing_docs)]

//! # themex Theme Engine
//!
//! Shell theme objects and the engine interface the synchronizer drives.
//!
//! ## Overview
//!
//! - **[ShellTheme](shell::ShellTheme)**: an immutable set of base stylesheets
//!   plus custom stylesheets layered on top
//! - **[ThemeEngine](context::ThemeEngine)**: the engine owning the active theme;
//!   get/set the theme, load/unload custom stylesheets, observe changes
//! - **[ThemeContext](context::ThemeContext)**: an in-process engine
//!
//! ## Reloading a custom stylesheet
//!
//! ```rust,no_run
//! use std::path::Path;
//! use themex_theme::context::{ThemeContext, ThemeEngine};
//!
//! let context = ThemeContext::new("user", None);
//! let previous = context.current_theme().unwrap_or_default();
//! let mut theme = previous.derive();
//! theme.load_stylesheet(Path::new("/home/me/.config/gnome-shell/gnome-shell.css")).unwrap();
//! for sheet in previous.custom_stylesheets() {
//!     let _ = theme.load_stylesheet(sheet);
//! }
//! context.set_theme(theme);
//! ```

/// Contains the [context::ThemeEngine] trait and the [context::ThemeContext] engine.
pub mod context;
/// Contains the [error::ThemeError] type.
pub mod error;
/// Contains the [shell::ShellTheme] stylesheet set.
pub mod shell;

pub use context::{HandlerId, ThemeContext, ThemeEngine};
pub use error::{ThemeError, ThemeResult};
pub use shell::ShellTheme;
