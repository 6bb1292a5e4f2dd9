//! 24-bit color values and their hex key encoding.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque RGB color, the value behind a hex color key such as `"FF0000"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Rgb {
    /// Black (`000000`), the default background.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White (`FFFFFF`), the default foreground.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a color from its components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a 6-digit hex key (e.g. `"ff0000"` or `"#FF0000"`).
    ///
    /// Digits are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not exactly six hex digits.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return Err(ColorParseError::InvalidLength(hex.len()));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidHex);
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorParseError::InvalidHex)
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Uppercase hex key without a leading `#`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Error parsing a hex color key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ColorParseError {
    /// Key contains characters outside `[0-9A-Fa-f]`.
    #[error("invalid hex characters")]
    InvalidHex,
    /// Key is not six digits long.
    #[error("invalid hex key length {0} (expected 6)")]
    InvalidLength(usize),
}
