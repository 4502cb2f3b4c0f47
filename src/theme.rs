//! Colours for tiles and chrome. Optional btop-style `theme[key]="#hex"` file.

use crate::Palette;
use crate::game::TileKind;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub good: Color,
    pub bad: Color,
    pub bonus: Color,
    /// Playfield background (the original's dark gray).
    pub bg: Color,
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            good: Color::Rgb(50, 205, 50),
            bad: Color::Rgb(255, 99, 71),
            bonus: Color::Rgb(255, 215, 0),
            bg: Color::Rgb(30, 30, 30),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(255, 255, 255),
            title: Color::Rgb(173, 216, 230),
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }
}

impl Theme {
    /// Load from a theme file, then apply `palette`. A missing path gives the defaults.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))?
            }
            _ => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.good = Color::Rgb(0x00, 0xFF, 0x00);
                self.bad = Color::Rgb(0xFF, 0x00, 0x00);
                self.bonus = Color::Rgb(0xFF, 0xFF, 0x00);
                self.bg = Color::Black;
            }
            Palette::Colorblind => {
                // Blue / vermillion / yellow stay apart for red-green deficiency.
                self.good = Color::Rgb(0x00, 0x77, 0xBB);
                self.bad = Color::Rgb(0xCC, 0x33, 0x11);
                self.bonus = Color::Rgb(0xEE, 0xCC, 0x66);
            }
        }
    }

    /// Keys not present keep their default. Present-but-malformed values are an error.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut theme = Self::default();
        let slots: [(&str, &mut Color); 8] = [
            ("good", &mut theme.good),
            ("bad", &mut theme.bad),
            ("bonus", &mut theme.bonus),
            ("main_bg", &mut theme.bg),
            ("div_line", &mut theme.div_line),
            ("main_fg", &mut theme.main_fg),
            ("title", &mut theme.title),
            ("inactive_fg", &mut theme.inactive_fg),
        ];
        for (key, slot) in slots {
            if let Some(v) = map.get(key) {
                *slot = parse_hex(v)?;
            }
        }
        Ok(theme)
    }

    #[inline]
    pub fn tile_color(&self, kind: TileKind) -> Color {
        match kind {
            TileKind::Good => self.good,
            TileKind::Bad => self.bad,
            TileKind::Bonus => self.bonus,
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(bad)
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(bad()),
    }
}
