//! Escape-sequence encoding of compacted row patches.
//!
//! Every patch becomes one contiguous byte sequence: a cursor move to the
//! span start, then each run's colors and glyphs, then a color reset. The
//! sequence is handed to the backend in a single write so a row is either
//! emitted whole or not at all.

use crate::color::ColorMode;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use gridcast_core::{ColorId, Rgb, RowPatch, DEFAULT_BG, DEFAULT_FG};
use std::io;

/// Scratch capacity kept after housekeeping.
pub const SCRATCH_CAPACITY: usize = 8192;

/// Encodes row patches into terminal escape sequences.
///
/// Keeps a reusable scratch buffer and counts what it emitted since the
/// last [`reset_stats`](Self::reset_stats).
#[derive(Debug)]
pub struct PatchEncoder {
    color_mode: ColorMode,
    scratch: Vec<u8>,
    runs_encoded: usize,
    style_changes: usize,
    bytes_encoded: usize,
}

impl Default for PatchEncoder {
    fn default() -> Self {
        Self::new(ColorMode::detect())
    }
}

impl PatchEncoder {
    /// Create an encoder for the given color mode.
    #[must_use]
    pub fn new(color_mode: ColorMode) -> Self {
        Self {
            color_mode,
            scratch: Vec::with_capacity(SCRATCH_CAPACITY),
            runs_encoded: 0,
            style_changes: 0,
            bytes_encoded: 0,
        }
    }

    /// Set the color mode.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
    }

    /// Get the color mode.
    #[must_use]
    pub const fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Runs encoded since the last reset.
    #[must_use]
    pub const fn runs_encoded(&self) -> usize {
        self.runs_encoded
    }

    /// Color changes emitted since the last reset.
    #[must_use]
    pub const fn style_changes(&self) -> usize {
        self.style_changes
    }

    /// Bytes produced since the last reset.
    #[must_use]
    pub const fn bytes_encoded(&self) -> usize {
        self.bytes_encoded
    }

    /// Current scratch buffer capacity.
    #[must_use]
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Zero the statistics.
    pub fn reset_stats(&mut self) {
        self.runs_encoded = 0;
        self.style_changes = 0;
        self.bytes_encoded = 0;
    }

    /// Give back memory a large repaint made the scratch buffer grow to.
    pub fn shrink_scratch(&mut self) {
        self.scratch.clear();
        self.scratch.shrink_to(SCRATCH_CAPACITY);
    }

    /// Encode one patch.
    ///
    /// `palette` maps color ids to colors; ids without a color fall back to
    /// the default foreground or background. With `use_color` false the
    /// whole span is printed once in the fixed default colors, ignoring
    /// run ids and the palette.
    ///
    /// # Errors
    ///
    /// Returns an error if an escape sequence cannot be formatted.
    pub fn encode_patch(
        &mut self,
        patch: &RowPatch,
        palette: &[Option<Rgb>],
        use_color: bool,
    ) -> io::Result<&[u8]> {
        self.scratch.clear();
        queue!(self.scratch, MoveTo(patch.start, patch.y))?;

        if use_color {
            let mode = self.color_mode;
            let mut last: Option<(ColorId, ColorId)> = None;
            for run in &patch.runs {
                if last != Some((run.fg, run.bg)) {
                    let fg = mode.to_crossterm(resolve(palette, run.fg, DEFAULT_FG));
                    let bg = mode.to_crossterm(resolve(palette, run.bg, DEFAULT_BG));
                    queue!(self.scratch, SetForegroundColor(fg), SetBackgroundColor(bg))?;
                    last = Some((run.fg, run.bg));
                    self.style_changes += 1;
                }
                queue!(self.scratch, Print(run.text.as_str()))?;
            }
        } else {
            let fg = self.color_mode.to_crossterm(DEFAULT_FG);
            let bg = self.color_mode.to_crossterm(DEFAULT_BG);
            queue!(self.scratch, SetForegroundColor(fg), SetBackgroundColor(bg))?;
            self.style_changes += 1;
            for run in &patch.runs {
                queue!(self.scratch, Print(run.text.as_str()))?;
            }
        }
        queue!(self.scratch, ResetColor)?;

        self.runs_encoded += patch.runs.len();
        self.bytes_encoded += self.scratch.len();
        Ok(self.scratch.as_slice())
    }

    /// Encode text placed at `(x, y)` without touching any grid.
    ///
    /// # Errors
    ///
    /// Returns an error if an escape sequence cannot be formatted.
    pub fn encode_raw(&mut self, text: &str, x: u16, y: u16) -> io::Result<&[u8]> {
        self.scratch.clear();
        queue!(self.scratch, MoveTo(x, y), Print(text))?;
        self.bytes_encoded += self.scratch.len();
        Ok(self.scratch.as_slice())
    }
}

fn resolve(palette: &[Option<Rgb>], id: ColorId, fallback: Rgb) -> Rgb {
    palette.get(id).copied().flatten().unwrap_or(fallback)
}
