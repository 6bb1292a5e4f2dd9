//! Terminal rendering engine for gridcast.
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::uninlined_format_args)] // "variables can be used directly in format!"
#![allow(clippy::doc_markdown)]
//!
//! Callers draw text at `(x, y)` positions on a virtual screen; the engine
//! periodically emits the minimal set of terminal writes that makes the real
//! terminal match it.
//!
//! # Architecture
//!
//! ```text
//! draw ──▶ queue ──consumer──▶ frame ──presenter──▶ canvas ──▶ PatchEncoder ──▶ backend
//! ```
//!
//! - [`Renderer`] is the engine: draw API, present, resize, mode switches
//! - [`pipeline`] runs the consumer and presenter threads
//! - [`PatchEncoder`] turns compacted rows into crossterm escape sequences
//! - [`TerminalBackend`] abstracts the physical terminal; [`MemoryBackend`]
//!   records output for tests
//!
//! The pure grid, diff and color-table logic lives in `gridcast_core`.
//!
//! # Example
//!
//! ```no_run
//! use gridcast_terminal::{Renderer, RendererConfig};
//!
//! let renderer = Renderer::stdout(RendererConfig::default())?;
//! renderer.draw_formatted("<cfFF0000>error</cf>: disk full", 0, 0)?;
//! # Ok::<(), gridcast_terminal::RenderError>(())
//! ```

mod backend;
mod color;
mod config;
mod encoder;
mod error;
pub mod gate;
pub mod pipeline;
mod renderer;

pub use backend::{CrosstermBackend, MemoryBackend, TerminalBackend, DEFAULT_MAX_SIZE};
pub use color::ColorMode;
pub use config::RendererConfig;
pub use encoder::{PatchEncoder, SCRATCH_CAPACITY};
pub use error::RenderError;
pub use gate::SpinGate;
pub use pipeline::DrawRequest;
pub use renderer::{PresentReport, Renderer};

// Re-export the core types callers need alongside the engine.
pub use gridcast_core::{strip_escapes, Cell, ColorId, Rgb};
