//! RGB color normalization and perceived-brightness helpers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// HSP brightness below which a color counts as dark.
const DARK_BRIGHTNESS_THRESHOLD: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
/// Color normalized to the lowercase `#rrggbb` form the host protocol expects.
pub struct RgbColor(String);

impl RgbColor {
    /// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)` into `#rrggbb`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let value = raw.trim().to_ascii_lowercase();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::from_hex(hex).ok_or_else(|| format!("`{raw}` is not a hex color"));
        }
        if let Some(body) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::from_functional(body)
                .ok_or_else(|| format!("`{raw}` is not an rgb() color"));
        }
        Err(format!("`{raw}` has an unsupported color format"))
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => Some(Self(format!("#{hex}"))),
            3 => {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                Some(Self(format!("#{expanded}")))
            }
            _ => None,
        }
    }

    fn from_functional(body: &str) -> Option<Self> {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if !(3..=4).contains(&parts.len()) {
            return None;
        }
        let mut channels = [0u8; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            *slot = part.parse().ok()?;
        }
        let [r, g, b] = channels;
        Some(Self::from_rgb(r, g, b))
    }

    /// Builds a color from its channels.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{r:02x}{g:02x}{b:02x}"))
    }

    /// Returns the normalized `#rrggbb` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the red, green and blue channels.
    pub fn channels(&self) -> (u8, u8, u8) {
        let channel = |range: std::ops::Range<usize>| {
            self.0
                .get(range)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .unwrap_or(0)
        };
        (channel(1..3), channel(3..5), channel(5..7))
    }

    /// Whether the color is perceptually dark.
    ///
    /// Uses HSP brightness `sqrt(0.299 r² + 0.587 g² + 0.114 b²)` against a threshold of 120.
    pub fn is_dark(&self) -> bool {
        let (r, g, b) = self.channels();
        let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
        (0.299 * r * r + 0.587 * g * g + 0.114 * b * b).sqrt() < DARK_BRIGHTNESS_THRESHOLD
    }
}

impl TryFrom<String> for RgbColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RgbColor> for String {
    fn from(value: RgbColor) -> Self {
        value.0
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_supported_formats() {
        assert_eq!(RgbColor::parse("#ABCDEF").unwrap().as_str(), "#abcdef");
        assert_eq!(RgbColor::parse("#fa0").unwrap().as_str(), "#ffaa00");
        assert_eq!(RgbColor::parse(" rgb(36, 129, 204) ").unwrap().as_str(), "#2481cc");
        assert_eq!(RgbColor::parse("rgba(255,255,255,0.5)").unwrap().as_str(), "#ffffff");
    }

    #[test]
    fn parse_rejects_garbage() {
        for raw in ["", "#12", "#gggggg", "rgb(1,2)", "rgb(300,0,0)", "blue"] {
            assert!(RgbColor::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn brightness_classifies_black_and_white() {
        assert!(RgbColor::parse("#000000").unwrap().is_dark());
        assert!(!RgbColor::parse("#ffffff").unwrap().is_dark());
        assert!(RgbColor::parse("#17212b").unwrap().is_dark());
        assert!(!RgbColor::parse("#f1f1f1").unwrap().is_dark());
    }

    #[test]
    fn serde_uses_normalized_string_form() {
        let color: RgbColor = serde_json::from_str("\"#FFF\"").unwrap();
        assert_eq!(serde_json::to_string(&color).unwrap(), "\"#ffffff\"");
        assert!(serde_json::from_str::<RgbColor>("\"nope\"").is_err());
    }
}
