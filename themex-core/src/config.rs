use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::{default_rules, SyncRule};

/// themex Configuration Structure.
#[derive(Debug, Clone)]
pub struct ThemexConfig {
    /// Custom stylesheet configuration.
    pub stylesheets: StylesheetConfig,
    /// Wallpaper descriptor configuration.
    pub wallpaper: WallpaperConfig,
    /// Preferences kept in sync between the extension and system stores.
    pub rules: Vec<SyncRule>,
}

impl ThemexConfig {
    /// Configuration rooted at the current user's XDG directories.
    pub fn from_env() -> anyhow::Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::new()?;
        Ok(Self::with_dirs(xdg_dirs.get_config_home(), xdg_dirs.get_data_home()))
    }

    /// Configuration rooted at explicit config and data directories.
    pub fn with_dirs(config_home: impl AsRef<Path>, data_home: impl AsRef<Path>) -> Self {
        Self {
            stylesheets: StylesheetConfig::new(config_home.as_ref().join("gnome-shell")),
            wallpaper: WallpaperConfig::new(
                data_home
                    .as_ref()
                    .join("gnome-background-properties")
                    .join("themex.xml"),
            ),
            rules: default_rules(),
        }
    }
}

/// Custom stylesheet configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetConfig {
    /// Directory holding the custom stylesheets. It is watched for changes.
    pub directory: PathBuf,
    /// File name of the stylesheet used by day.
    pub light: String,
    /// File name of the stylesheet used at night.
    pub dark: String,
    /// Quiet period before reacting to a burst of file changes.
    pub debounce: Duration,
}

impl StylesheetConfig {
    /// The default file names in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            light: "gnome-shell.css".to_string(),
            dark: "gnome-shell-dark.css".to_string(),
            debounce: Duration::from_millis(100),
        }
    }

    /// Full path of the day stylesheet.
    pub fn light_path(&self) -> PathBuf {
        self.directory.join(&self.light)
    }

    /// Full path of the night stylesheet.
    pub fn dark_path(&self) -> PathBuf {
        self.directory.join(&self.dark)
    }
}

/// Wallpaper descriptor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperConfig {
    /// Where the descriptor is written.
    pub output: PathBuf,
    /// Name shown for the wallpaper pair.
    pub name: String,
}

impl WallpaperConfig {
    /// Write the descriptor to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            name: "themex".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_dirs_layout() {
        let config = ThemexConfig::with_dirs("/home/me/.config", "/home/me/.local/share");

        assert_eq!(
            config.stylesheets.light_path(),
            PathBuf::from("/home/me/.config/gnome-shell/gnome-shell.css")
        );
        assert_eq!(
            config.stylesheets.dark_path(),
            PathBuf::from("/home/me/.config/gnome-shell/gnome-shell-dark.css")
        );
        assert_eq!(config.stylesheets.debounce, Duration::from_millis(100));
        assert_eq!(
            config.wallpaper.output,
            PathBuf::from("/home/me/.local/share/gnome-background-properties/themex.xml")
        );
        assert_eq!(config.rules.len(), 6);
    }
}
