//! Core types for the gridcast terminal rendering engine.
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::doc_markdown)]
//!
//! Everything here is pure and I/O-free:
//!
//! - [`Rgb`] color keys and their hex encoding
//! - [`ColorTable`], the bounded round-robin id cache
//! - [`Cell`] and [`Grid`]
//! - [`DirtyTracker`] row and cell flags
//! - [`Surface`], the frame/canvas pair with promotion and compaction
//! - [`TaggedText`], the inline color-tag tokenizer
//!
//! `gridcast-terminal` puts these behind a threaded draw pipeline and a
//! crossterm backend.

pub mod cell;
pub mod color;
pub mod dirty;
mod escape;
pub mod palette;
pub mod surface;
pub mod tag;

pub use cell::{Cell, Grid};
pub use color::{ColorParseError, Rgb};
pub use dirty::DirtyTracker;
pub use escape::strip_escapes;
pub use palette::{
    CapacityError, ColorId, ColorTable, DEFAULT_BG, DEFAULT_BG_ID, DEFAULT_CAPACITY, DEFAULT_FG,
    DEFAULT_FG_ID, MIN_CAPACITY,
};
pub use surface::{FlushSummary, RowPatch, Run, Surface};
pub use tag::{FormatError, FormatErrorKind, TaggedText, Token, Tokens};
