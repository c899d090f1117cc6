//! The [ShellTheme] stylesheet set.

use std::path::{Path, PathBuf};

use crate::error::{ThemeError, ThemeResult};

/// A complete set of stylesheets making up the active shell theme.
///
/// The three base stylesheets are fixed for the lifetime of a theme object.
/// Custom stylesheets are layered on top, in load order; the first entry of
/// [ShellTheme::custom_stylesheets] is the one loaded first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellTheme {
    theme_stylesheet: Option<PathBuf>,
    default_stylesheet: Option<PathBuf>,
    application_stylesheet: Option<PathBuf>,
    custom_stylesheets: Vec<PathBuf>,
}

impl ShellTheme {
    /// Create a theme with only a default stylesheet.
    pub fn new(default_stylesheet: Option<PathBuf>) -> Self {
        Self {
            default_stylesheet,
            ..Default::default()
        }
    }

    /// Set the user theme stylesheet.
    pub fn with_theme_stylesheet(mut self, path: Option<PathBuf>) -> Self {
        self.theme_stylesheet = path;
        self
    }

    /// Set the application stylesheet.
    pub fn with_application_stylesheet(mut self, path: Option<PathBuf>) -> Self {
        self.application_stylesheet = path;
        self
    }

    /// Build a new theme carrying forward the base stylesheets of this one,
    /// without any custom stylesheets.
    pub fn derive(&self) -> Self {
        Self {
            theme_stylesheet: self.theme_stylesheet.clone(),
            default_stylesheet: self.default_stylesheet.clone(),
            application_stylesheet: self.application_stylesheet.clone(),
            custom_stylesheets: Vec::new(),
        }
    }

    /// The user theme stylesheet, if any.
    pub fn theme_stylesheet(&self) -> Option<&Path> {
        self.theme_stylesheet.as_deref()
    }

    /// The session default stylesheet, if any.
    pub fn default_stylesheet(&self) -> Option<&Path> {
        self.default_stylesheet.as_deref()
    }

    /// The application stylesheet, if any.
    pub fn application_stylesheet(&self) -> Option<&Path> {
        self.application_stylesheet.as_deref()
    }

    /// Custom stylesheets in load order.
    pub fn custom_stylesheets(&self) -> &[PathBuf] {
        &self.custom_stylesheets
    }

    /// Returns true if `path` is one of the custom stylesheets.
    pub fn has_stylesheet(&self, path: &Path) -> bool {
        self.custom_stylesheets.iter().any(|p| p == path)
    }

    /// Load a custom stylesheet into this theme.
    ///
    /// Loading a stylesheet that is already present is a no-op.
    pub fn load_stylesheet(&mut self, path: &Path) -> ThemeResult<()> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {},
            Ok(_) => return Err(ThemeError::not_found(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ThemeError::not_found(path));
            },
            Err(e) => return Err(ThemeError::load_error(path, e)),
        }

        if !self.has_stylesheet(path) {
            self.custom_stylesheets.push(path.to_path_buf());
        }
        Ok(())
    }

    /// Unload a custom stylesheet. Returns false if it was not loaded.
    pub fn unload_stylesheet(&mut self, path: &Path) -> bool {
        let before = self.custom_stylesheets.len();
        self.custom_stylesheets.retain(|p| p != path);
        before != self.custom_stylesheets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_keeps_order_and_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.css");
        let b = dir.path().join("b.css");
        std::fs::write(&a, "a {}").unwrap();
        std::fs::write(&b, "b {}").unwrap();

        let mut theme = ShellTheme::new(None);
        theme.load_stylesheet(&a).unwrap();
        theme.load_stylesheet(&b).unwrap();
        theme.load_stylesheet(&a).unwrap();

        assert_eq!(theme.custom_stylesheets(), &[a, b]);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let mut theme = ShellTheme::new(None);
        let err = theme
            .load_stylesheet(Path::new("/nonexistent/themex/missing.css"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(theme.custom_stylesheets().is_empty());
    }

    #[test]
    fn test_unload_is_idempotent() {
        let mut theme = ShellTheme::new(None);
        assert!(!theme.unload_stylesheet(Path::new("/never/loaded.css")));
    }

    #[test]
    fn test_derive_drops_custom_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.css");
        std::fs::write(&a, "a {}").unwrap();

        let mut theme = ShellTheme::new(Some(PathBuf::from("/usr/share/gnome-shell/default.css")))
            .with_theme_stylesheet(Some(PathBuf::from("/themes/Foo/gnome-shell.css")));
        theme.load_stylesheet(&a).unwrap();

        let derived = theme.derive();
        assert_eq!(derived.theme_stylesheet(), theme.theme_stylesheet());
        assert_eq!(derived.default_stylesheet(), theme.default_stylesheet());
        assert!(derived.custom_stylesheets().is_empty());
    }
}
