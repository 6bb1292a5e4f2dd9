//! Error types for gridcast-terminal.

use gridcast_core::{CapacityError, ColorParseError, FormatError};
use thiserror::Error;

/// Errors returned by the renderer's public operations.
///
/// Output failures inside a present cycle are never returned; they are
/// logged and retried by the next cycle.
#[derive(Debug, Error)]
pub enum RenderError {
    /// IO error from terminal operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested size is outside `1×1` and the terminal maximum.
    #[error("window size {width}x{height} is outside 1x1..={max_width}x{max_height}")]
    InvalidWindowSize {
        width: u16,
        height: u16,
        max_width: u16,
        max_height: u16,
    },

    /// Color capacity below the minimum.
    #[error(transparent)]
    ColorCapacity(#[from] CapacityError),

    /// Bad hex color key.
    #[error("invalid color key: {0}")]
    Color(#[from] ColorParseError),

    /// Malformed inline color tag.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A background loop thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    WorkerSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl From<toml::de::Error> for RenderError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
