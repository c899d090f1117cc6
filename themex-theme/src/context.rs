use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{ThemeError, ThemeResult};
use crate::shell::ShellTheme;

/// Identifies a handler connected to a [ThemeEngine] signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// The UI theme engine that owns the currently active [ShellTheme].
///
/// All methods are called from the single UI thread. Replacing the current
/// theme is last-writer-wins.
pub trait ThemeEngine {
    /// The currently active theme, if one is set.
    fn current_theme(&self) -> Option<ShellTheme>;

    /// Atomically replace the active theme.
    fn set_theme(&self, theme: ShellTheme);

    /// Load a custom stylesheet into the active theme.
    fn load_stylesheet(&self, path: &Path) -> ThemeResult<()>;

    /// Unload a custom stylesheet from the active theme.
    ///
    /// Unloading a stylesheet that was never loaded is not an error.
    fn unload_stylesheet(&self, path: &Path) -> bool;

    /// Custom stylesheets of the active theme, in load order.
    fn custom_stylesheets(&self) -> Vec<PathBuf> {
        self.current_theme()
            .map(|theme| theme.custom_stylesheets().to_vec())
            .unwrap_or_default()
    }

    /// The session default stylesheet every theme is built on.
    fn default_stylesheet(&self) -> Option<PathBuf>;

    /// The active theme, or a fresh theme over the session stylesheets when
    /// none is set yet.
    fn current_or_base_theme(&self) -> ShellTheme {
        self.current_theme().unwrap_or_else(|| {
            ShellTheme::new(self.default_stylesheet()).with_theme_stylesheet(self.theme_stylesheet())
        })
    }

    /// The user theme stylesheet the next [ThemeEngine::load_theme] will use.
    fn theme_stylesheet(&self) -> Option<PathBuf>;

    /// Select the user theme stylesheet. Takes effect on [ThemeEngine::load_theme].
    fn set_theme_stylesheet(&self, path: Option<PathBuf>);

    /// Rebuild the active theme from the selected theme stylesheet, keeping custom stylesheets.
    fn load_theme(&self) -> ThemeResult<()>;

    /// Connect to the "custom stylesheets changed" signal.
    fn connect_stylesheets_changed(&self, handler: Rc<dyn Fn()>) -> HandlerId;

    /// Disconnect a handler.
    fn disconnect(&self, id: HandlerId);
}

/// In-process theme engine holding the active theme of a stage.
///
/// Emits "custom stylesheets changed" whenever the custom stylesheet list of
/// the active theme changes, including when a whole new theme is set.
pub struct ThemeContext {
    current: RefCell<Option<ShellTheme>>,
    theme_stylesheet: RefCell<Option<PathBuf>>,
    default_stylesheet: Option<PathBuf>,
    mode: String,
    handlers: RefCell<Vec<(HandlerId, Rc<dyn Fn()>)>>,
    next_handler: Cell<u64>,
    replacements: Cell<usize>,
}

impl ThemeContext {
    /// Create a context for `mode` whose themes fall back on `default_stylesheet`.
    pub fn new(mode: impl Into<String>, default_stylesheet: Option<PathBuf>) -> Self {
        Self {
            current: RefCell::new(None),
            theme_stylesheet: RefCell::new(None),
            default_stylesheet,
            mode: mode.into(),
            handlers: RefCell::new(Vec::new()),
            next_handler: Cell::new(1),
            replacements: Cell::new(0),
        }
    }

    /// Create a context with an already active theme.
    pub fn with_theme(mode: impl Into<String>, theme: ShellTheme) -> Self {
        let context = Self::new(mode, theme.default_stylesheet().map(Path::to_path_buf));
        *context.theme_stylesheet.borrow_mut() = theme.theme_stylesheet().map(Path::to_path_buf);
        *context.current.borrow_mut() = Some(theme);
        context
    }

    /// Number of times the active theme was replaced.
    pub fn replacements(&self) -> usize {
        self.replacements.get()
    }

    fn emit_stylesheets_changed(&self) {
        let handlers: Vec<Rc<dyn Fn()>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler();
        }
    }
}

impl ThemeEngine for ThemeContext {
    fn current_theme(&self) -> Option<ShellTheme> {
        self.current.borrow().clone()
    }

    fn set_theme(&self, theme: ShellTheme) {
        let changed = {
            let mut current = self.current.borrow_mut();
            let changed = current
                .as_ref()
                .map_or(true, |old| old.custom_stylesheets() != theme.custom_stylesheets());
            *current = Some(theme);
            changed
        };
        self.replacements.set(self.replacements.get() + 1);
        log::debug!("Theme replaced ({} replacements)", self.replacements.get());

        if changed {
            self.emit_stylesheets_changed();
        }
    }

    fn load_stylesheet(&self, path: &Path) -> ThemeResult<()> {
        let changed = {
            let mut current = self.current.borrow_mut();
            let theme = current.get_or_insert_with(|| ShellTheme::new(self.default_stylesheet.clone()));
            let had = theme.has_stylesheet(path);
            theme.load_stylesheet(path)?;
            !had
        };
        if changed {
            self.emit_stylesheets_changed();
        }
        Ok(())
    }

    fn unload_stylesheet(&self, path: &Path) -> bool {
        let removed = self
            .current
            .borrow_mut()
            .as_mut()
            .map_or(false, |theme| theme.unload_stylesheet(path));
        if removed {
            self.emit_stylesheets_changed();
        }
        removed
    }

    fn default_stylesheet(&self) -> Option<PathBuf> {
        self.default_stylesheet.clone()
    }

    fn theme_stylesheet(&self) -> Option<PathBuf> {
        self.theme_stylesheet.borrow().clone()
    }

    fn set_theme_stylesheet(&self, path: Option<PathBuf>) {
        *self.theme_stylesheet.borrow_mut() = path;
    }

    fn load_theme(&self) -> ThemeResult<()> {
        if self.default_stylesheet.is_none() {
            return Err(ThemeError::missing_default(&self.mode));
        }

        let mut theme = ShellTheme::new(self.default_stylesheet.clone())
            .with_theme_stylesheet(self.theme_stylesheet());
        if let Some(previous) = self.current_theme() {
            theme = theme.with_application_stylesheet(
                previous.application_stylesheet().map(Path::to_path_buf),
            );
            for sheet in previous.custom_stylesheets() {
                if let Err(e) = theme.load_stylesheet(sheet) {
                    log::warn!("Dropping custom stylesheet {:?}: {}", sheet, e);
                }
            }
        }

        self.set_theme(theme);
        Ok(())
    }

    fn connect_stylesheets_changed(&self, handler: Rc<dyn Fn()>) -> HandlerId {
        let id = HandlerId(self.next_handler.get());
        self.next_handler.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    fn disconnect(&self, id: HandlerId) {
        self.handlers.borrow_mut().retain(|(handler_id, _)| *handler_id != id);
    }
}
