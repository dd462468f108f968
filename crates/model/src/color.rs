//! Color values.
//!
//! Every accepted syntax (named, `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
//! `rgb()`, `rgba()`) normalizes to one RGBA tuple, emitted to ffmpeg as
//! `0xRRGGBBAA`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::value::ValueParseError;

/// sRGB color with 8-bit channels (alpha 255 = opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// ffmpeg color literal (`0xRRGGBBAA`).
    pub fn ffmpeg_code(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// ffmpeg color literal for an optional color; absent means transparent.
    pub fn code_or_transparent(color: Option<Color>) -> String {
        color.unwrap_or(Color::TRANSPARENT).ffmpeg_code()
    }

    /// Rewrite an integer alpha in `rgba(r, g, b, A)` from the 0-255 scale
    /// to the fraction CSS expects. Fractions and percentages pass through.
    fn byte_alpha_as_fraction(text: String) -> Result<String, ValueParseError> {
        let Some(args) = text.strip_prefix("rgba(").and_then(|t| t.strip_suffix(')')) else {
            return Ok(text);
        };
        let Some((channels, alpha)) = args.rsplit_once(',') else {
            return Ok(text);
        };
        let alpha = alpha.trim();
        if alpha.is_empty() || !alpha.chars().all(|c| c.is_ascii_digit()) {
            return Ok(text);
        }
        match alpha.parse::<u16>() {
            Ok(byte) if byte <= 255 => Ok(format!("rgba({channels}, {})", f64::from(byte) / 255.0)),
            _ => Err(ValueParseError::Color(text.clone())),
        }
    }
}

impl FromStr for Color {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = Color::byte_alpha_as_fraction(s.trim().to_ascii_lowercase())?;
        let parsed: csscolorparser::Color = text
            .parse()
            .map_err(|_| ValueParseError::Color(s.to_string()))?;
        let [r, g, b, a] = parsed.to_rgba8();
        Ok(Color::rgba(r, g, b, a))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hex_expands_by_replication() {
        let short: Color = "#abc".parse().unwrap();
        let long: Color = "#aabbcc".parse().unwrap();
        assert_eq!(short, long);
        assert_eq!(short.a, 255);
    }

    #[test]
    fn test_rgb_function_matches_hex() {
        let from_fn: Color = "rgb(10, 20, 30)".parse().unwrap();
        let from_hex: Color = "#0a141eff".parse().unwrap();
        assert_eq!(from_fn, from_hex);
    }

    #[test]
    fn test_rgba_alpha_forms() {
        let int_alpha: Color = "rgba(255,0,0,128)".parse().unwrap();
        assert_eq!(int_alpha.a, 128);
        let frac_alpha: Color = "rgba(255, 0, 0, 0.5)".parse().unwrap();
        assert_eq!(frac_alpha.a, 128);
        let percent_alpha: Color = "rgba(255, 0, 0, 50%)".parse().unwrap();
        assert_eq!(percent_alpha.a, 128);
        assert!("rgba(255,0,0,300)".parse::<Color>().is_err());
    }

    #[test]
    fn test_named_colors() {
        assert_eq!("white".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(
            "RebeccaPurple".parse::<Color>().unwrap(),
            Color::rgba(0x66, 0x33, 0x99, 255)
        );
        assert_eq!("transparent".parse::<Color>().unwrap(), Color::TRANSPARENT);
        assert!("notacolor".parse::<Color>().is_err());
    }

    #[test]
    fn test_ffmpeg_code() {
        let c: Color = "#ff8000".parse().unwrap();
        assert_eq!(c.ffmpeg_code(), "0xFF8000FF");
        assert_eq!(Color::code_or_transparent(None), "0x00000000");
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!("#12".parse::<Color>().is_err());
        assert!("#ggg".parse::<Color>().is_err());
    }
}
