//! RGBA colours used by settings, filters and render plans.
//!
//! Colours are written as `#RRGGBB` or `#RRGGBBAA` in settings files.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when parsing a colour string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("Colour must start with '#': {0}")]
    MissingHash(String),

    #[error("Colour must have 6 or 8 hex digits: {0}")]
    BadLength(String),

    #[error("Invalid hex digit in colour: {0}")]
    BadDigit(String),
}

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const RED: Rgba = Rgba::rgb(220, 40, 40);
    pub const GREEN: Rgba = Rgba::rgb(40, 170, 60);
    pub const BLUE: Rgba = Rgba::rgb(40, 80, 220);
    pub const YELLOW: Rgba = Rgba::rgb(230, 190, 30);
    pub const GRAY: Rgba = Rgba::rgb(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Returns true if the colour is fully transparent.
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Returns the same colour with a different alpha.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`.
    pub fn parse(text: &str) -> Result<Self, ColorError> {
        let trimmed = text.trim();
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ColorError::MissingHash(trimmed.to_string()))?;
        if hex.len() != 6 && hex.len() != 8 {
            return Err(ColorError::BadLength(trimmed.to_string()));
        }
        let byte = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorError::BadDigit(trimmed.to_string()))
        };
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, a))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgba::parse(&value)
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_string()
    }
}

/// Palette used for region types that have no configured colour.
const TYPE_PALETTE: [Rgba; 8] = [
    Rgba::rgb(228, 26, 28),
    Rgba::rgb(55, 126, 184),
    Rgba::rgb(77, 175, 74),
    Rgba::rgb(152, 78, 163),
    Rgba::rgb(255, 127, 0),
    Rgba::rgb(166, 86, 40),
    Rgba::rgb(247, 129, 191),
    Rgba::rgb(0, 160, 160),
];

/// Picks a stable palette colour for a region type name.
pub fn palette_color(name: &str) -> Rgba {
    let hash = name
        .bytes()
        .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
    TYPE_PALETTE[hash as usize % TYPE_PALETTE.len()]
}

/// Default colour of a nucleotide in motif logos and sequence tracks.
pub fn base_color(base: char) -> Rgba {
    match base.to_ascii_uppercase() {
        'A' => Rgba::GREEN,
        'C' => Rgba::BLUE,
        'G' => Rgba::YELLOW,
        'T' | 'U' => Rgba::RED,
        _ => Rgba::GRAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_and_rgba() {
        assert_eq!(Rgba::parse("#ff0000").unwrap(), Rgba::new(255, 0, 0, 255));
        assert_eq!(Rgba::parse(" #00ff0080 ").unwrap(), Rgba::new(0, 255, 0, 128));
        assert!(Rgba::parse("#00000000").unwrap().is_transparent());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Rgba::parse("ff0000"), Err(ColorError::MissingHash(_))));
        assert!(matches!(Rgba::parse("#ff00"), Err(ColorError::BadLength(_))));
        assert!(matches!(Rgba::parse("#gg0000"), Err(ColorError::BadDigit(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(Rgba::rgb(1, 2, 255).to_string(), "#0102ff");
        assert_eq!(Rgba::new(1, 2, 3, 4).to_string(), "#01020304");
    }

    #[test]
    fn test_palette_is_stable() {
        assert_eq!(palette_color("MA0001"), palette_color("MA0001"));
    }
}
