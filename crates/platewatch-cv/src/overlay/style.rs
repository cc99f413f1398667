//! Overlay style configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ColorParseError(String);

/// RGBA color, written as `#rrggbb` or `#rrggbbaa` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(ColorParseError(s.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorParseError(s.to_string()))
        };

        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// Rectangle outline style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}

/// Label style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub color: Color,
    /// Font size in pixels
    pub size: f32,
}

/// How plates, characters and labels are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub plate_stroke: StrokeStyle,
    pub char_stroke: StrokeStyle,
    pub label: TextStyle,
    /// Distance between the label baseline and the top edge of the plate box
    pub label_offset: f64,
    pub draw_labels: bool,
    pub draw_char_boxes: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            plate_stroke: StrokeStyle {
                color: Color::rgb(0xe9, 0xe9, 0xe9),
                width: 3.0,
            },
            char_stroke: StrokeStyle {
                color: Color::rgb(0xc0, 0xc0, 0xc0),
                width: 1.5,
            },
            label: TextStyle {
                color: Color::rgb(0x00, 0xff, 0x88),
                size: 14.0,
            },
            label_offset: 6.0,
            draw_labels: true,
            draw_char_boxes: true,
        }
    }
}
