// SPDX-License-Identifier: LGPL-3.0-only
//! Wallpaper descriptor for the desktop's background picker.
//!
//! The descriptor lists one light/dark wallpaper pair in the
//! `gnome-wp-list` format read from `$XDG_DATA_HOME/gnome-background-properties`.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use crate::io_helpers;

/// Light and dark wallpaper URIs. [None] means not known yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WallpaperPair {
    /// Wallpaper shown in light mode.
    pub light: Option<String>,
    /// Wallpaper shown in dark mode.
    pub dark: Option<String>,
}

impl WallpaperPair {
    /// Build a pair from raw setting values; empty strings are unknown.
    pub fn new(light: &str, dark: &str) -> Self {
        Self {
            light: known(light),
            dark: known(dark),
        }
    }

    /// Only the light wallpaper.
    pub fn light(uri: &str) -> Self {
        Self {
            light: known(uri),
            dark: None,
        }
    }

    /// Only the dark wallpaper.
    pub fn dark(uri: &str) -> Self {
        Self {
            light: None,
            dark: known(uri),
        }
    }

    /// Both URIs, if both are known.
    pub fn complete(&self) -> Option<(&str, &str)> {
        Some((self.light.as_deref()?, self.dark.as_deref()?))
    }
}

fn known(uri: &str) -> Option<String> {
    (!uri.is_empty()).then(|| uri.to_string())
}

/// Writes the wallpaper descriptor once both wallpapers are known.
pub struct WallpaperWriter {
    name: String,
    output: PathBuf,
    pair: RefCell<WallpaperPair>,
    written: RefCell<Option<String>>,
    writes: Cell<usize>,
}

impl WallpaperWriter {
    /// Create a writer for the descriptor at `output`, listing the pair as `name`.
    pub fn new(name: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            pair: RefCell::new(WallpaperPair::default()),
            written: RefCell::new(None),
            writes: Cell::new(0),
        }
    }

    /// Merge `update` into the known pair and write the descriptor if both
    /// wallpapers are known.
    ///
    /// Unchanged content is not rewritten. Write failures are logged.
    pub async fn save(&self, update: WallpaperPair) {
        let content = {
            let mut pair = self.pair.borrow_mut();
            if update.light.is_some() {
                pair.light = update.light;
            }
            if update.dark.is_some() {
                pair.dark = update.dark;
            }
            match pair.complete() {
                Some((light, dark)) => descriptor(&self.name, light, dark),
                None => {
                    log::debug!("Wallpaper pair incomplete, not writing {:?}", self.output);
                    return;
                },
            }
        };

        if self.written.borrow().as_deref() == Some(content.as_str()) {
            log::trace!("Wallpaper descriptor unchanged");
            return;
        }

        match io_helpers::write_file(&self.output, content.as_bytes()).await {
            Ok(()) => {
                log::debug!("Wrote wallpaper descriptor {:?}", self.output);
                *self.written.borrow_mut() = Some(content);
                self.writes.set(self.writes.get() + 1);
            },
            Err(e) => log::warn!("Failed to write wallpaper descriptor {:?}: {}", self.output, e),
        }
    }

    /// The known pair.
    pub fn pair(&self) -> WallpaperPair {
        self.pair.borrow().clone()
    }

    /// Number of times the descriptor was written.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Path of the descriptor.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

fn descriptor(name: &str, light: &str, dark: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<!DOCTYPE wallpapers SYSTEM "gnome-wp-list.dtd">
<wallpapers>
  <wallpaper deleted="false">
    <name>{}</name>
    <filename>{}</filename>
    <filename-dark>{}</filename-dark>
    <options>zoom</options>
    <shade_type>solid</shade_type>
    <pcolor>#3071AE</pcolor>
    <scolor>#000000</scolor>
  </wallpaper>
</wallpapers>
"#,
        escape(name),
        escape(light),
        escape(dark)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_treats_empty_as_unknown() {
        assert_eq!(WallpaperPair::new("", "b").complete(), None);
        assert_eq!(WallpaperPair::new("a", "b").complete(), Some(("a", "b")));
    }

    #[test]
    fn test_descriptor_escapes_markup() {
        let xml = descriptor("themex", "file:///a&b.png", "file:///<dark>.png");
        assert!(xml.contains("<filename>file:///a&amp;b.png</filename>"));
        assert!(xml.contains("<filename-dark>file:///&lt;dark&gt;.png</filename-dark>"));
        assert!(xml.contains("<options>zoom</options>"));
    }
}
