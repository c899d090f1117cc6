// SPDX-License-Identifier: LGPL-3.0-only
//! Installed theme discovery.
//!
//! Themes live in `~/.themes`, `$XDG_DATA_HOME/themes` and
//! `$XDG_DATA_DIRS/themes` (icons and cursors in the matching `icons`
//! directories). Shell mode themes are single stylesheets under
//! `$XDG_DATA_DIRS/gnome-shell/theme`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Kind of installed theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeCategory {
    /// GTK application themes.
    Gtk,
    /// GNOME Shell themes.
    Shell,
    /// Icon themes.
    Icons,
    /// Cursor themes.
    Cursor,
}

/// Names of the installed themes per [ThemeCategory], sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableThemes {
    /// GTK themes, including the built-in ones.
    pub gtk: Vec<String>,
    /// Shell themes; the empty name stands for the default theme.
    pub shell: Vec<String>,
    /// Icon themes.
    pub icons: Vec<String>,
    /// Cursor themes.
    pub cursor: Vec<String>,
}

impl AvailableThemes {
    /// Themes of one category.
    pub fn get(&self, category: ThemeCategory) -> &[String] {
        match category {
            ThemeCategory::Gtk => &self.gtk,
            ThemeCategory::Shell => &self.shell,
            ThemeCategory::Icons => &self.icons,
            ThemeCategory::Cursor => &self.cursor,
        }
    }
}

/// Finds installed themes.
#[async_trait(?Send)]
pub trait ThemeLocator {
    /// List the installed themes.
    async fn available_themes(&self) -> AvailableThemes;

    /// Resolve a shell theme name to its stylesheet.
    ///
    /// Returns [None] for the empty name and for names that are not installed,
    /// meaning the default shell theme.
    async fn shell_theme_path(&self, name: &str) -> Option<PathBuf>;
}

/// Base directories searched for themes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeDirectories {
    home: PathBuf,
    data_home: PathBuf,
    data_dirs: Vec<PathBuf>,
}

impl ThemeDirectories {
    /// Use explicit base directories.
    pub fn new(home: impl Into<PathBuf>, data_home: impl Into<PathBuf>, data_dirs: Vec<PathBuf>) -> Self {
        Self {
            home: home.into(),
            data_home: data_home.into(),
            data_dirs,
        }
    }

    /// Resolve the base directories of the current user.
    pub fn from_env() -> anyhow::Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::new()?;
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        Ok(Self::new(home, xdg_dirs.get_data_home(), xdg_dirs.get_data_dirs()))
    }

    /// Directories holding themes of `kind` (`themes` or `icons`), most specific first.
    pub fn search_dirs(&self, kind: &str) -> Vec<PathBuf> {
        let mut dirs = vec![self.home.join(format!(".{}", kind)), self.data_home.join(kind)];
        dirs.extend(self.data_dirs.iter().map(|dir| dir.join(kind)));
        dirs
    }

    /// Directories holding shell mode stylesheets.
    pub fn mode_theme_dirs(&self) -> Vec<PathBuf> {
        self.data_dirs
            .iter()
            .map(|dir| dir.join("gnome-shell").join("theme"))
            .collect()
    }

    fn shell_theme_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        self.search_dirs("themes")
            .into_iter()
            .map(|dir| dir.join(name).join("gnome-shell").join("gnome-shell.css"))
            .chain(
                self.mode_theme_dirs()
                    .into_iter()
                    .map(|dir| dir.join(format!("{}.css", name))),
            )
            .find(|path| path.is_file())
    }

    fn scan(&self) -> AvailableThemes {
        let themes = entries(&self.search_dirs("themes"));
        let icons = entries(&self.search_dirs("icons"));
        let modes = self
            .mode_theme_dirs()
            .into_iter()
            .flat_map(|dir| list_dir(&dir))
            .filter_map(|(_, name)| name.strip_suffix(".css").map(str::to_string));

        let gtk = themes
            .iter()
            .filter(|(path, _)| {
                path.join("gtk-3.0").join("gtk.css").is_file() || path.join("gtk-4.0").join("gtk.css").is_file()
            })
            .map(|(_, name)| name.clone())
            .chain(["Adwaita", "HighContrast", "HighContrastInverse"].map(String::from));

        let shell = themes
            .iter()
            .filter(|(path, _)| path.join("gnome-shell").join("gnome-shell.css").is_file())
            .map(|(_, name)| name.clone())
            .chain(modes)
            .chain(std::iter::once(String::new()));

        let icon = icons
            .iter()
            .filter(|(path, _)| path.join("index.theme").is_file())
            .map(|(_, name)| name.clone());

        let cursor = icons
            .iter()
            .filter(|(path, _)| path.join("cursors").is_dir())
            .map(|(_, name)| name.clone());

        AvailableThemes {
            gtk: normalize(gtk),
            shell: normalize(shell),
            icons: normalize(icon),
            cursor: normalize(cursor),
        }
    }
}

fn list_dir(dir: &Path) -> Vec<(PathBuf, String)> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    read_dir
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            Some((entry.path(), name))
        })
        .collect()
}

fn entries(dirs: &[PathBuf]) -> Vec<(PathBuf, String)> {
    dirs.iter().flat_map(|dir| list_dir(dir)).collect()
}

fn normalize(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.filter(|name| !name.eq_ignore_ascii_case("default")).collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names.dedup();
    names
}

/// [ThemeLocator] scanning the XDG data directories.
#[derive(Debug, Clone)]
pub struct XdgThemeLocator {
    dirs: ThemeDirectories,
}

impl XdgThemeLocator {
    /// Create a locator over `dirs`.
    pub fn new(dirs: ThemeDirectories) -> Self {
        Self { dirs }
    }

    /// Create a locator over the current user's directories.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(ThemeDirectories::from_env()?))
    }
}

#[async_trait(?Send)]
impl ThemeLocator for XdgThemeLocator {
    async fn available_themes(&self) -> AvailableThemes {
        let dirs = self.dirs.clone();
        smol::unblock(move || dirs.scan()).await
    }

    async fn shell_theme_path(&self, name: &str) -> Option<PathBuf> {
        let dirs = self.dirs.clone();
        let name = name.to_string();
        smol::unblock(move || dirs.shell_theme_path(&name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn layout() -> (tempfile::TempDir, XdgThemeLocator) {
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("home");
        let data_home = home.join(".local/share");
        let system = root.path().join("usr/share");

        touch(home.join(".themes/Foo/gnome-shell/gnome-shell.css"));
        touch(data_home.join("themes/Foo/gtk-3.0/gtk.css"));
        touch(system.join("themes/Bar/gnome-shell/gnome-shell.css"));
        touch(system.join("themes/Default/gtk-3.0/gtk.css"));
        touch(system.join("gnome-shell/theme/classic.css"));
        touch(system.join("icons/Papirus/index.theme"));
        fs::create_dir_all(system.join("icons/Bibata/cursors")).unwrap();
        touch(system.join("icons/default/index.theme"));

        let locator = XdgThemeLocator::new(ThemeDirectories::new(home, data_home, vec![system]));
        (root, locator)
    }

    #[test]
    fn test_available_themes() {
        let (_root, locator) = layout();
        let themes = smol::block_on(locator.available_themes());

        assert_eq!(themes.gtk, vec!["Adwaita", "Foo", "HighContrast", "HighContrastInverse"]);
        assert_eq!(themes.shell, vec!["", "Bar", "classic", "Foo"]);
        assert_eq!(themes.get(ThemeCategory::Icons), &["Papirus".to_string()]);
        assert_eq!(themes.cursor, vec!["Bibata"]);
    }

    #[test]
    fn test_shell_theme_path_prefers_home() {
        let (root, locator) = layout();

        let foo = smol::block_on(locator.shell_theme_path("Foo"));
        assert_eq!(foo, Some(root.path().join("home/.themes/Foo/gnome-shell/gnome-shell.css")));

        let classic = smol::block_on(locator.shell_theme_path("classic"));
        assert_eq!(classic, Some(root.path().join("usr/share/gnome-shell/theme/classic.css")));

        assert_eq!(smol::block_on(locator.shell_theme_path("")), None);
        assert_eq!(smol::block_on(locator.shell_theme_path("Missing")), None);
    }
}
