//! Renderer configuration.

use crate::color::ColorMode;
use crate::error::RenderError;
use gridcast_core::{DEFAULT_CAPACITY, MIN_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a [`Renderer`](crate::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Present loop period in milliseconds.
    pub frame_period_ms: u64,
    /// Color table capacity, including the two default slots.
    pub color_capacity: usize,
    /// Write and compare color ids.
    pub use_color: bool,
    /// Start with the background draw pipeline running.
    pub async_drawing: bool,
    /// Color mode (auto-detected if not specified).
    pub color_mode: Option<ColorMode>,
    /// Override for the largest accepted window size.
    pub max_size: Option<(u16, u16)>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frame_period_ms: 30,
            color_capacity: DEFAULT_CAPACITY,
            use_color: true,
            async_drawing: true,
            color_mode: None,
            max_size: None,
        }
    }
}

impl RendererConfig {
    /// Default config file name.
    pub const CONFIG_FILE: &'static str = "gridcast.toml";

    /// Create a high-refresh config (about 60 presents per second).
    #[must_use]
    pub fn high_refresh() -> Self {
        Self {
            frame_period_ms: 16,
            ..Default::default()
        }
    }

    /// Create a low-power config (10 presents per second).
    #[must_use]
    pub fn low_power() -> Self {
        Self {
            frame_period_ms: 100,
            ..Default::default()
        }
    }

    /// Synchronous config: draws apply immediately and nothing auto-presents.
    #[must_use]
    pub fn synchronous() -> Self {
        Self {
            async_drawing: false,
            ..Default::default()
        }
    }

    /// Present loop period.
    #[must_use]
    pub const fn frame_period(&self) -> Duration {
        Duration::from_millis(self.frame_period_ms)
    }

    /// Parse and validate a config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if TOML is invalid or values are out of range.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, RenderError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Load a config from a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns error if the color capacity is below the minimum or the
    /// maximum size has a zero dimension.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.color_capacity < MIN_CAPACITY {
            return Err(RenderError::Config(format!(
                "color_capacity {} is below the minimum of {MIN_CAPACITY}",
                self.color_capacity
            )));
        }
        if let Some((width, height)) = self.max_size {
            if width == 0 || height == 0 {
                return Err(RenderError::Config(format!(
                    "max_size {width}x{height} must be at least 1x1"
                )));
            }
        }
        Ok(())
    }
}
