//! Mapping color keys onto what the terminal can display.

use crossterm::style::Color as CrosstermColor;
use gridcast_core::Rgb;
use serde::{Deserialize, Serialize};

/// Terminal color capability mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// 24-bit SGR sequences (COLORTERM=truecolor or 24bit).
    #[default]
    TrueColor,
    /// xterm 256-color palette.
    #[serde(rename = "256")]
    Color256,
    /// 16 ANSI colors.
    #[serde(rename = "16")]
    Color16,
    /// No color; the terminal's own defaults are used.
    Mono,
}

impl ColorMode {
    /// Detect capabilities from `COLORTERM` and `TERM`.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_with_env(
            std::env::var("COLORTERM").ok().as_deref(),
            std::env::var("TERM").ok().as_deref(),
        )
    }

    /// Detection from explicit variable values.
    #[must_use]
    pub fn detect_with_env(colorterm: Option<&str>, term: Option<&str>) -> Self {
        if matches!(colorterm, Some("truecolor" | "24bit")) {
            return Self::TrueColor;
        }
        match term {
            Some(t) if t.contains("256color") => Self::Color256,
            Some("dumb") | None => Self::Mono,
            Some(_) => Self::Color16,
        }
    }

    /// Convert a color key for this mode.
    #[must_use]
    pub fn to_crossterm(self, color: Rgb) -> CrosstermColor {
        let Rgb { r, g, b } = color;
        match self {
            Self::TrueColor => CrosstermColor::Rgb { r, g, b },
            Self::Color256 => CrosstermColor::AnsiValue(rgb_to_256(r, g, b)),
            Self::Color16 => rgb_to_16(r, g, b),
            Self::Mono => CrosstermColor::Reset,
        }
    }
}

/// Nearest xterm-256 index: grayscale ramp for neutral colors, 6×6×6 cube otherwise.
fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        return match r {
            0..=7 => 16,
            249..=255 => 231,
            v => 232 + ((v - 8) / 10).min(23),
        };
    }
    let level = |c: u8| (u16::from(c) * 5 / 255) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

/// Nearest of the 16 ANSI colors by dominant channels and luminance.
fn rgb_to_16(r: u8, g: u8, b: u8) -> CrosstermColor {
    let luminance = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
    let bright = luminance > 127;
    let threshold = r.max(g).max(b) / 2;

    match (r > threshold, g > threshold, b > threshold, bright) {
        (false, false, false, false) => CrosstermColor::Black,
        (false, false, false, true) => CrosstermColor::DarkGrey,
        (true, false, false, false) => CrosstermColor::DarkRed,
        (true, false, false, true) => CrosstermColor::Red,
        (false, true, false, false) => CrosstermColor::DarkGreen,
        (false, true, false, true) => CrosstermColor::Green,
        (true, true, false, false) => CrosstermColor::DarkYellow,
        (true, true, false, true) => CrosstermColor::Yellow,
        (false, false, true, false) => CrosstermColor::DarkBlue,
        (false, false, true, true) => CrosstermColor::Blue,
        (true, false, true, false) => CrosstermColor::DarkMagenta,
        (true, false, true, true) => CrosstermColor::Magenta,
        (false, true, true, false) => CrosstermColor::DarkCyan,
        (false, true, true, true) => CrosstermColor::Cyan,
        (true, true, true, false) => CrosstermColor::Grey,
        (true, true, true, true) => CrosstermColor::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_truecolor() {
        assert_eq!(ColorMode::default(), ColorMode::TrueColor);
    }

    #[test]
    fn test_detect_colorterm() {
        assert_eq!(
            ColorMode::detect_with_env(Some("truecolor"), Some("xterm")),
            ColorMode::TrueColor
        );
        assert_eq!(
            ColorMode::detect_with_env(Some("24bit"), None),
            ColorMode::TrueColor
        );
    }

    #[test]
    fn test_detect_term() {
        assert_eq!(
            ColorMode::detect_with_env(None, Some("xterm-256color")),
            ColorMode::Color256
        );
        assert_eq!(
            ColorMode::detect_with_env(None, Some("xterm")),
            ColorMode::Color16
        );
        assert_eq!(
            ColorMode::detect_with_env(None, Some("dumb")),
            ColorMode::Mono
        );
        assert_eq!(ColorMode::detect_with_env(None, None), ColorMode::Mono);
    }

    #[test]
    fn test_truecolor_conversion() {
        assert_eq!(
            ColorMode::TrueColor.to_crossterm(Rgb::new(128, 64, 191)),
            CrosstermColor::Rgb {
                r: 128,
                g: 64,
                b: 191
            }
        );
    }

    #[test]
    fn test_256_grayscale() {
        assert_eq!(rgb_to_256(0, 0, 0), 16);
        assert_eq!(rgb_to_256(255, 255, 255), 231);
        assert!(rgb_to_256(128, 128, 128) >= 232);
    }

    #[test]
    fn test_256_cube() {
        assert_eq!(rgb_to_256(255, 0, 0), 196);
        assert_eq!(rgb_to_256(0, 0, 255), 21);
    }

    #[test]
    fn test_16_primaries() {
        assert_eq!(rgb_to_16(0, 0, 0), CrosstermColor::Black);
        assert_eq!(rgb_to_16(255, 255, 255), CrosstermColor::White);
        assert!(matches!(
            rgb_to_16(255, 0, 0),
            CrosstermColor::Red | CrosstermColor::DarkRed
        ));
        assert!(matches!(
            rgb_to_16(0, 255, 0),
            CrosstermColor::Green | CrosstermColor::DarkGreen
        ));
    }

    #[test]
    fn test_mono_resets() {
        assert_eq!(
            ColorMode::Mono.to_crossterm(Rgb::new(255, 0, 0)),
            CrosstermColor::Reset
        );
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrap {
            mode: ColorMode,
        }
        let parsed: Wrap = toml::from_str("mode = \"256\"").unwrap();
        assert_eq!(parsed.mode, ColorMode::Color256);
        let parsed: Wrap = toml::from_str("mode = \"truecolor\"").unwrap();
        assert_eq!(parsed.mode, ColorMode::TrueColor);
    }
}
