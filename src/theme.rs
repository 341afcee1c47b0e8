//! Colour themes
//!
//! The built-in table is parsed once from the embedded `themes.toml`; callers
//! receive resolved [`ThemeSpec`] values and never see the raw file.

use std::collections::BTreeMap;

use crossterm::style::Color;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

const BUILTIN_THEMES: &str = include_str!("../assets/themes.toml");

/// Basic colour names accepted anywhere a colour is expected.
pub const COLOR_NAMES: [(&str, Color); 16] = [
    ("black", Color::Black),
    ("blue", Color::DarkBlue),
    ("cyan", Color::DarkCyan),
    ("green", Color::DarkGreen),
    ("magenta", Color::DarkMagenta),
    ("red", Color::DarkRed),
    ("white", Color::Grey),
    ("yellow", Color::DarkYellow),
    ("lightblack", Color::DarkGrey),
    ("lightblue", Color::Blue),
    ("lightcyan", Color::Cyan),
    ("lightgreen", Color::Green),
    ("lightmagenta", Color::Magenta),
    ("lightred", Color::Red),
    ("lightwhite", Color::White),
    ("lightyellow", Color::Yellow),
];

/// Colour per semantic role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeSpec {
    pub title: Color,
    pub label: Color,
    pub value: Color,
    pub border: Color,
    pub accent: Color,
    pub palette: Vec<Color>,
}

impl Default for ThemeSpec {
    fn default() -> Self {
        Self {
            title: Color::DarkBlue,
            label: Color::DarkCyan,
            value: Color::Reset,
            border: Color::DarkBlue,
            accent: Color::DarkBlue,
            palette: vec![Color::DarkBlue, Color::Blue, Color::DarkCyan, Color::Cyan],
        }
    }
}

impl ThemeSpec {
    /// Every role in one colour except values, which keep the terminal default.
    pub fn single(color: Color) -> Self {
        Self {
            title: color,
            label: color,
            value: Color::Reset,
            border: color,
            accent: color,
            palette: vec![color],
        }
    }

    /// Palette entry `n` (1-based), or the accent when there is none.
    pub fn palette_color(&self, n: usize) -> Color {
        n.checked_sub(1)
            .and_then(|i| self.palette.get(i))
            .copied()
            .unwrap_or(self.accent)
    }
}

/// `#RRGGBB`, a basic colour name, or `reset`.
pub fn parse_color(text: &str) -> Option<Color> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        if hex.len() == 6 {
            if let Ok(rgb) = u32::from_str_radix(hex, 16) {
                let r = ((rgb >> 16) & 0xFF) as u8;
                let g = ((rgb >> 8) & 0xFF) as u8;
                let b = (rgb & 0xFF) as u8;
                return Some(Color::Rgb { r, g, b });
            }
        }
        return None;
    }
    let lower = text.to_ascii_lowercase();
    if lower == "reset" {
        return Some(Color::Reset);
    }
    COLOR_NAMES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, color)| *color)
}

#[derive(Deserialize)]
struct ThemeDef {
    title: String,
    label: String,
    value: String,
    border: Option<String>,
    accent: String,
    #[serde(default)]
    palette: Vec<String>,
}

impl ThemeDef {
    fn resolve(&self, name: &str) -> Result<ThemeSpec> {
        let color = |text: &str| {
            parse_color(text).ok_or_else(|| Error::Config(format!("theme '{}': unknown colour '{}'", name, text)))
        };
        let title = color(self.title.as_str())?;
        Ok(ThemeSpec {
            title,
            label: color(self.label.as_str())?,
            value: color(self.value.as_str())?,
            border: self.border.as_deref().map(color).transpose()?.unwrap_or(title),
            accent: color(self.accent.as_str())?,
            palette: self.palette.iter().map(|c| color(c.as_str())).collect::<Result<_>>()?,
        })
    }
}

/// Named themes, immutable once loaded.
#[derive(Debug, Clone)]
pub struct ThemeTable {
    themes: BTreeMap<String, ThemeSpec>,
}

impl ThemeTable {
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_THEMES)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let defs: BTreeMap<String, ThemeDef> =
            toml::from_str(source).map_err(|e| Error::Config(format!("theme table: {}", e)))?;
        let themes = defs
            .iter()
            .map(|(name, def)| Ok((name.clone(), def.resolve(name)?)))
            .collect::<Result<_>>()?;
        Ok(Self { themes })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&ThemeSpec> {
        self.themes.get(&name.to_ascii_lowercase())
    }

    /// Named theme, else a single-colour theme for a colour name or hex
    /// value, else `default`.
    pub fn resolve(&self, name: &str) -> ThemeSpec {
        if let Some(theme) = self.get(name) {
            return theme.clone();
        }
        if let Some(color) = parse_color(name).filter(|c| *c != Color::Reset) {
            return ThemeSpec::single(color);
        }
        warn!(theme = name, "unknown theme, using default");
        self.get("default").cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses() {
        let table = ThemeTable::builtin().unwrap();
        let names: Vec<&str> = table.names().collect();
        for expected in ["blue", "default", "green", "magenta", "powershell", "red", "windows"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        assert_eq!(table.resolve("default"), ThemeSpec::default());
    }

    #[test]
    fn colour_names_become_single_colour_themes() {
        let table = ThemeTable::builtin().unwrap();
        let theme = table.resolve("lightgreen");
        assert_eq!(theme.label, Color::Green);
        assert_eq!(theme.value, Color::Reset);

        let theme = table.resolve("#102030");
        assert_eq!(theme.accent, Color::Rgb { r: 0x10, g: 0x20, b: 0x30 });
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        let table = ThemeTable::builtin().unwrap();
        assert_eq!(table.resolve("no-such-theme"), ThemeSpec::default());
    }

    #[test]
    fn bad_colour_in_table_is_a_config_error() {
        let result = ThemeTable::from_toml("[x]\ntitle = \"mauve\"\nlabel = \"red\"\nvalue = \"reset\"\naccent = \"red\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn hex_parsing_rejects_garbage() {
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#GGGGGG"), None);
        assert_eq!(parse_color("RED"), Some(Color::DarkRed));
    }
}
