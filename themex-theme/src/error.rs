//! # Theme Error Types
//!
//! Error types raised by the theme engine while assembling stylesheet sets.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the theming system.
#[derive(Error, Debug)]
pub enum ThemeError {
    /// A stylesheet file does not exist.
    #[error("Stylesheet not found: {path:?}")]
    StylesheetNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// A stylesheet exists but could not be loaded into a theme.
    #[error("Failed to load stylesheet {path:?}: {source}")]
    StylesheetLoadError {
        /// The stylesheet that failed to load.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The theme has no default stylesheet to fall back on.
    #[error("No valid default stylesheet for session mode '{mode}'")]
    MissingDefaultStylesheet {
        /// The session mode whose stylesheet is missing.
        mode: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for theme operations.
pub type ThemeResult<T> = Result<T, ThemeError>;

impl ThemeError {
    /// Create a stylesheet not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::StylesheetNotFound { path: path.into() }
    }

    /// Create a stylesheet load error.
    pub fn load_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StylesheetLoadError {
            path: path.into(),
            source,
        }
    }

    /// Create a missing default stylesheet error.
    pub fn missing_default(mode: impl Into<String>) -> Self {
        Self::MissingDefaultStylesheet { mode: mode.into() }
    }

    /// Returns true if this error means the stylesheet simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StylesheetNotFound { .. })
    }
}
