//! Key names of the extension and system stores.

use themex_services::keystore::gsettings::SchemaKeys;
use themex_services::{Value, ValueKind};

use crate::sync::Preference;

/// Keys of the extension store.
pub mod extension {
    /// Follow Night Light when picking day or night values.
    pub const NIGHT: &str = "night";
    /// Keep the themes in sync.
    pub const THEME: &str = "theme";
    /// Load the custom stylesheet.
    pub const STYLESHEET: &str = "stylesheet";
    /// Write the wallpaper descriptor.
    pub const WALLPAPER: &str = "wallpaper";
    /// Every boolean toggle.
    pub const TOGGLES: [&str; 4] = [NIGHT, THEME, STYLESHEET, WALLPAPER];
}

/// Keys of the system store.
pub mod system {
    /// Shell theme name.
    pub const SHELL: &str = "name";
    /// GTK theme name.
    pub const GTK: &str = "gtk-theme";
    /// Icon theme name.
    pub const ICONS: &str = "icon-theme";
    /// Cursor theme name.
    pub const CURSOR: &str = "cursor-theme";
    /// Accent color.
    pub const COLOR: &str = "accent-color";
    /// Color scheme.
    pub const STYLE: &str = "color-scheme";
    /// Light wallpaper URI.
    pub const PICTURE_URI: &str = "picture-uri";
    /// Dark wallpaper URI.
    pub const PICTURE_URI_DARK: &str = "picture-uri-dark";
}

const USER_THEME: &[(&str, ValueKind)] = &[(system::SHELL, ValueKind::String)];
const INTERFACE: &[(&str, ValueKind)] = &[
    (system::GTK, ValueKind::String),
    (system::ICONS, ValueKind::String),
    (system::CURSOR, ValueKind::String),
    (system::COLOR, ValueKind::String),
    (system::STYLE, ValueKind::String),
];
const BACKGROUND: &[(&str, ValueKind)] = &[
    (system::PICTURE_URI, ValueKind::String),
    (system::PICTURE_URI_DARK, ValueKind::String),
];

/// GSettings schemas holding the system keys.
pub const SYSTEM_LAYOUT: &[SchemaKeys<'static>] = &[
    ("org.gnome.shell.extensions.user-theme", USER_THEME),
    ("org.gnome.desktop.interface", INTERFACE),
    ("org.gnome.desktop.background", BACKGROUND),
];

/// Every extension key with its default value.
pub fn extension_schema() -> Vec<(&'static str, Value)> {
    let mut schema: Vec<(&'static str, Value)> = Preference::ALL
        .iter()
        .flat_map(|preference| {
            [
                (preference.day_key(), Value::from("")),
                (preference.night_key(), Value::from("")),
            ]
        })
        .collect();
    schema.extend(extension::TOGGLES.iter().map(|key| (*key, Value::from(false))));
    schema
}

/// Every system key with its zero value.
pub fn system_schema() -> Vec<(&'static str, Value)> {
    SYSTEM_LAYOUT
        .iter()
        .flat_map(|(_, keys)| keys.iter())
        .map(|(key, kind)| (*key, Value::zero(*kind)))
        .collect()
}
