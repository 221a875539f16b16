//! Highlight colors.

use serde::{Deserialize, Serialize};

/// Foreground used for syllables that have not been sung yet.
pub const UNPLAYED_HEX: &str = "#666666";

/// RGB color with each channel in `[0.0, 1.0]`.
///
/// Owned by the display consumer; the playback engine only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Default for DisplayColor {
    /// Red, the stock highlight color.
    fn default() -> Self {
        Self {
            red: 1.0,
            green: 0.0,
            blue: 0.0,
        }
    }
}

impl DisplayColor {
    /// Create a color, clamping each channel into `[0.0, 1.0]`.
    #[must_use]
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red: clamp_channel(red),
            green: clamp_channel(green),
            blue: clamp_channel(blue),
        }
    }

    /// Same color with every channel clamped.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(self.red, self.green, self.blue)
    }

    /// Format as `#rrggbb`, truncating `channel * 255`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Channels scaled to bytes.
    #[must_use]
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        (
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
        )
    }

    /// Parse a `#RRGGBB` (or `RRGGBB`) hex string.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let (r, g, b) = parse_hex_rgb(hex)?;
        Some(Self {
            red: f64::from(r) / 255.0,
            green: f64::from(g) / 255.0,
            blue: f64::from(b) / 255.0,
        })
    }
}

/// Parse a `#RRGGBB` hex string into byte channels.
#[must_use]
pub fn parse_hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn clamp_channel(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_to_u8(value: f64) -> u8 {
    // Clamped to [0, 255] first, so the cast only drops the fraction
    (clamp_channel(value) * 255.0) as u8
}
