//! Visual themes for the printed program
//!
//! A theme is produced by the model from a free-form style description
//! ("Christmas red and green", "modern minimalist"). The model's JSON arrives
//! as a [`ThemeDraft`] where every field is optional; [`ThemeDraft::resolve`]
//! fills gaps and rejects nonsense field by field so one bad value never
//! discards the rest of the design.

pub mod color;
pub mod designer;

use serde::{Deserialize, Serialize};

pub use color::HexColor;
pub use designer::ThemeDesigner;

/// Decoration used when none is given or none survives sanitizing
pub const DEFAULT_DECORATION: &str = "*  *  *";

const MAX_DECORATION_CHARS: usize = 20;
const TITLE_SIZE_RANGE: (f32, f32) = (16.0, 48.0);

/// How the performance list is laid out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Centered piece-by-piece list with thin separators
    #[default]
    List,
    /// Grid with an accent rule under the header
    Table,
    /// Grid with a plain rule under every row
    Minimal,
}

impl Layout {
    /// Anything that is not "list" or "table" gets the minimal grid.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "list" => Layout::List,
            "table" => Layout::Table,
            _ => Layout::Minimal,
        }
    }
}

/// Font family used for every text role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    #[default]
    Serif,
    SansSerif,
}

impl FontStyle {
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        if name.starts_with("sans") {
            FontStyle::SansSerif
        } else {
            FontStyle::Serif
        }
    }
}

/// A fully resolved theme
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    pub name: String,
    /// Table header background (white text is drawn on top)
    pub bg_color: HexColor,
    pub accent_color: HexColor,
    pub text_color: HexColor,
    pub subtitle_color: HexColor,
    pub header_decoration: String,
    pub footer_decoration: String,
    pub layout: Layout,
    pub font_style: FontStyle,
    pub title_size: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            bg_color: HexColor::rgb(0x1a, 0x1a, 0x2e),
            accent_color: HexColor::rgb(0xc9, 0xa8, 0x4c),
            text_color: HexColor::rgb(0x2d, 0x2d, 0x2d),
            subtitle_color: HexColor::rgb(0x66, 0x66, 0x66),
            header_decoration: DEFAULT_DECORATION.to_string(),
            footer_decoration: DEFAULT_DECORATION.to_string(),
            layout: Layout::List,
            font_style: FontStyle::Serif,
            title_size: 28.0,
        }
    }
}

/// Theme JSON as the model wrote it. Every field is optional and loosely typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeDraft {
    #[serde(default, deserialize_with = "text_or_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub bg_color: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub accent_color: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub text_color: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub subtitle_color: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub header_decoration: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub footer_decoration: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub layout: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub font_style: Option<String>,
    #[serde(default)]
    pub title_size: Option<serde_json::Value>,
}

impl ThemeDraft {
    /// Resolve against the default theme, field by field.
    pub fn resolve(self) -> Theme {
        let fallback = Theme::default();
        let color = |value: Option<String>, default: HexColor| {
            value.as_deref().and_then(HexColor::parse).unwrap_or(default)
        };

        let title_size = self
            .title_size
            .as_ref()
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|size| size.is_finite())
            .map(|size| (size as f32).clamp(TITLE_SIZE_RANGE.0, TITLE_SIZE_RANGE.1))
            .unwrap_or(fallback.title_size);

        Theme {
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or(fallback.name),
            bg_color: color(self.bg_color, fallback.bg_color),
            accent_color: color(self.accent_color, fallback.accent_color),
            text_color: color(self.text_color, fallback.text_color),
            subtitle_color: color(self.subtitle_color, fallback.subtitle_color),
            header_decoration: decoration(self.header_decoration),
            footer_decoration: decoration(self.footer_decoration),
            layout: self.layout.as_deref().map(Layout::from_name).unwrap_or(fallback.layout),
            font_style: self
                .font_style
                .as_deref()
                .map(FontStyle::from_name)
                .unwrap_or(fallback.font_style),
            title_size,
        }
    }
}

/// A string field; any other JSON type reads as absent
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

fn decoration(value: Option<String>) -> String {
    match value {
        Some(text) => text.chars().take(MAX_DECORATION_CHARS).collect(),
        None => DEFAULT_DECORATION.to_string(),
    }
}
