//! The table of synchronized preferences.

use crate::keys::system;

/// A themed attribute with a day value, a night value and one live value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preference {
    /// GNOME Shell theme.
    Shell,
    /// GTK theme.
    Gtk,
    /// Icon theme.
    Icons,
    /// Cursor theme.
    Cursor,
    /// Accent color.
    Color,
    /// Color scheme (light or dark application style).
    Style,
}

impl Preference {
    /// Every preference, in the order they are synchronized.
    pub const ALL: [Preference; 6] = [
        Preference::Shell,
        Preference::Gtk,
        Preference::Icons,
        Preference::Cursor,
        Preference::Color,
        Preference::Style,
    ];

    /// Extension key holding the day value.
    pub fn day_key(self) -> &'static str {
        match self {
            Preference::Shell => "shell",
            Preference::Gtk => "gtk",
            Preference::Icons => "icons",
            Preference::Cursor => "cursor",
            Preference::Color => "color",
            Preference::Style => "style",
        }
    }

    /// Extension key holding the night value.
    pub fn night_key(self) -> &'static str {
        match self {
            Preference::Shell => "shell-night",
            Preference::Gtk => "gtk-night",
            Preference::Icons => "icons-night",
            Preference::Cursor => "cursor-night",
            Preference::Color => "color-night",
            Preference::Style => "style-night",
        }
    }

    /// System key holding the live value.
    pub fn system_key(self) -> &'static str {
        match self {
            Preference::Shell => system::SHELL,
            Preference::Gtk => system::GTK,
            Preference::Icons => system::ICONS,
            Preference::Cursor => system::CURSOR,
            Preference::Color => system::COLOR,
            Preference::Style => system::STYLE,
        }
    }
}

/// One row of the sync table: two local keys mirrored into one remote key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRule {
    /// Local key used by day.
    pub day: String,
    /// Local key used at night.
    pub night: String,
    /// Remote key holding the live value.
    pub remote: String,
}

impl SyncRule {
    /// Build a rule from explicit key names.
    pub fn new(day: impl Into<String>, night: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            night: night.into(),
            remote: remote.into(),
        }
    }

    /// The local key selected by `is_night`.
    pub fn local(&self, is_night: bool) -> &str {
        if is_night {
            &self.night
        } else {
            &self.day
        }
    }
}

impl From<Preference> for SyncRule {
    fn from(preference: Preference) -> Self {
        Self::new(preference.day_key(), preference.night_key(), preference.system_key())
    }
}

/// A rule for every [Preference].
pub fn default_rules() -> Vec<SyncRule> {
    Preference::ALL.into_iter().map(SyncRule::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_key_selection() {
        let rule = SyncRule::from(Preference::Gtk);
        assert_eq!(rule.local(false), "gtk");
        assert_eq!(rule.local(true), "gtk-night");
        assert_eq!(rule.remote, "gtk-theme");
    }

    #[test]
    fn test_default_rules_follow_preference_order() {
        let rules = default_rules();
        assert_eq!(rules.first().map(|rule| rule.remote.as_str()), Some("name"));
        assert_eq!(rules.last().map(|rule| rule.day.as_str()), Some("style"));
    }
}
