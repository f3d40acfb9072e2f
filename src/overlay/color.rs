//! RGB colors with `#RGB` / `#RRGGBB` parsing.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("color must start with '#': {0:?}")]
    MissingHash(String),
    #[error("color must be #RGB or #RRGGBB, got {0:?}")]
    BadLength(String),
    #[error("invalid hex digit in {0:?}")]
    BadDigit(String),
}

/// An opaque RGB color. Serialized as `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// This color with the given alpha.
    pub fn with_alpha(self, a: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, a])
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ColorError::MissingHash(s.to_string()))?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::BadDigit(s.to_string()));
        }
        let digit = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorError::BadDigit(s.to_string()))
        };
        match hex.len() {
            // #RGB: each digit doubled, 0xF -> 0xFF
            3 => Ok(Color::new(digit(0..1)? * 17, digit(1..2)? * 17, digit(2..3)? * 17)),
            6 => Ok(Color::new(digit(0..2)?, digit(2..4)?, digit(4..6)?)),
            _ => Err(ColorError::BadLength(s.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_form() {
        assert_eq!("#FF8000".parse::<Color>().unwrap(), Color::new(255, 128, 0));
    }

    #[test]
    fn parse_short_form_doubles_digits() {
        assert_eq!("#fa0".parse::<Color>().unwrap(), Color::new(255, 170, 0));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            "ff0000".parse::<Color>(),
            Err(ColorError::MissingHash(_))
        ));
        assert!(matches!(
            "#ff00".parse::<Color>(),
            Err(ColorError::BadLength(_))
        ));
        assert!(matches!(
            "#gg0000".parse::<Color>(),
            Err(ColorError::BadDigit(_))
        ));
        assert!("#ééé".parse::<Color>().is_err());
    }

    #[test]
    fn parse_rejects_sign_characters() {
        assert!(matches!(
            "#+f+f+f".parse::<Color>(),
            Err(ColorError::BadDigit(_))
        ));
        assert!(matches!("#-1f".parse::<Color>(), Err(ColorError::BadDigit(_))));
    }

    #[test]
    fn display_is_lowercase_hex() {
        assert_eq!(Color::new(255, 0, 171).to_string(), "#ff00ab");
    }

    #[test]
    fn serde_as_string() {
        #[derive(Serialize, Deserialize)]
        struct W {
            c: Color,
        }
        let w: W = toml::from_str(r##"c = "#123456""##).unwrap();
        assert_eq!(w.c, Color::new(0x12, 0x34, 0x56));
        assert!(toml::to_string(&w).unwrap().contains("\"#123456\""));
    }
}
