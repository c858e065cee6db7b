//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::field::BlockColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Block colours and UI colours, One Dark unless a theme file says otherwise.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Indexed like [`BlockColor`]: blue, green, red, yellow.
    pub blocks: [Color; 4],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    pub inactive_fg: Color,
    /// Overlay on cells of the armed bomb's colour.
    pub target: Color,
    /// Flash left behind by a removed cell.
    pub explosion: Color,
    /// Bomb charge icons.
    pub bomb: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const ONEDARK_BLUE: Color = Color::Rgb(0x61, 0xAF, 0xEF);
const ONEDARK_GREEN: Color = Color::Rgb(0x98, 0xC3, 0x79);
const ONEDARK_RED: Color = Color::Rgb(0xE0, 0x6C, 0x75);
const ONEDARK_YELLOW: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ONEDARK_CYAN: Color = Color::Rgb(0x56, 0xB6, 0xC2);
const ONEDARK_ORANGE: Color = Color::Rgb(0xD1, 0x9A, 0x66);

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            blocks: [ONEDARK_BLUE, ONEDARK_GREEN, ONEDARK_RED, ONEDARK_YELLOW],
            bg: Color::Rgb(0x31, 0x35, 0x3F),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: ONEDARK_YELLOW,
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
            target: ONEDARK_CYAN,
            explosion: Color::Rgb(0xFF, 0xFF, 0xFF),
            bomb: ONEDARK_ORANGE,
        }
    }

    /// Load a btop-style theme file, then apply `palette`.
    /// No path, or a path that doesn't exist, gives the defaults.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Replace the block colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = [
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                ];
                self.target = Color::Rgb(0x00, 0xFF, 0xFF);
            }
            crate::Palette::Colorblind => {
                // Paul Tol's vibrant set; no red/green pair.
                self.blocks = [
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0xBB, 0xBB, 0x00),
                ];
                self.target = Color::Rgb(0xEE, 0x33, 0x77);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::onedark_default();
        let get = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|key| map.get(*key).and_then(|v| parse_hex(v).ok()))
                .unwrap_or(fallback)
        };
        let [blue, green, red, yellow] = defaults.blocks;
        Self {
            blocks: [
                get(&["cpu_box"], blue),
                get(&["mem_box", "cpu_start"], green),
                get(&["cpu_end", "temp_end"], red),
                get(&["title", "cpu_mid"], yellow),
            ],
            bg: get(&["meter_bg"], defaults.bg),
            div_line: get(&["div_line"], defaults.div_line),
            main_fg: get(&["main_fg"], defaults.main_fg),
            title: get(&["title"], defaults.title),
            inactive_fg: get(&["inactive_fg"], defaults.inactive_fg),
            target: get(&["hi_fg", "proc_misc"], defaults.target),
            explosion: get(&["selected_fg"], defaults.explosion),
            bomb: get(&["temp_mid", "download_mid"], defaults.bomb),
        }
    }

    #[inline]
    pub fn block(&self, color: BlockColor) -> Color {
        self.blocks[usize::from(color.index())]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(hex.to_string());
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .ok_or_else(invalid)
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17)),
        _ => Err(invalid()),
    }
}
