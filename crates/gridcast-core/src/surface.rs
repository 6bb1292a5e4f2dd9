//! Double-buffered drawing surface with two-level dirty diffing.
//!
//! Writes land in the *frame* grid and only flag their row. A present cycle
//! then runs in two steps:
//!
//! ```text
//! frame ──promote──▶ canvas + cell flags ──compact──▶ RowPatch (colored runs)
//! ```
//!
//! 1. **Promotion** rescans every flagged row, copies cells that differ into
//!    the canvas and flags them.
//! 2. **Compaction** finds the minimal flagged column span per row and splits
//!    it into runs of constant `(fg, bg)`.
//!
//! Untouched rows are never scanned.

use crate::cell::{Cell, Grid};
use crate::dirty::DirtyTracker;
use crate::palette::{ColorId, DEFAULT_BG_ID, DEFAULT_FG_ID};
use compact_str::CompactString;

/// A run of glyphs sharing one color pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Concatenated glyphs.
    pub text: CompactString,
    /// Foreground color id.
    pub fg: ColorId,
    /// Background color id.
    pub bg: ColorId,
}

/// Compacted output for one row: the span `[start, end]` split into runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPatch {
    /// Row index.
    pub y: u16,
    /// First column of the span.
    pub start: u16,
    /// Last column of the span (inclusive).
    pub end: u16,
    /// Runs in left-to-right order; their glyphs cover the span exactly.
    pub runs: Vec<Run>,
}

impl RowPatch {
    /// Number of columns the patch covers.
    #[must_use]
    pub fn span_len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    /// The patch text without colors.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

/// Outcome of [`Surface::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Rows successfully emitted and cleared.
    pub rows_written: usize,
    /// Runs contained in the emitted rows.
    pub chunks_written: usize,
    /// Rows whose emission failed; their flags stay set.
    pub rows_failed: usize,
}

/// Frame grid, canvas grid and the dirty tracker between them.
#[derive(Debug, Clone)]
pub struct Surface {
    frame: Grid,
    canvas: Grid,
    dirty: DirtyTracker,
    use_color: bool,
}

impl Surface {
    /// Create a blank surface.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            frame: Grid::new(width, height),
            canvas: Grid::new(width, height),
            dirty: DirtyTracker::new(width, height),
            use_color: true,
        }
    }

    /// Surface width.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.frame.width()
    }

    /// Surface height.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.frame.height()
    }

    /// Grid callers write into.
    #[must_use]
    pub const fn frame(&self) -> &Grid {
        &self.frame
    }

    /// Grid mirroring the terminal.
    #[must_use]
    pub const fn canvas(&self) -> &Grid {
        &self.canvas
    }

    /// Dirty flags.
    #[must_use]
    pub const fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Whether color ids are written and compared.
    #[must_use]
    pub const fn uses_color(&self) -> bool {
        self.use_color
    }

    /// Toggle color handling for later writes and presents.
    pub fn set_use_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Write `text` into the frame starting at `(x, y)` and flag the row.
    ///
    /// Rows outside the surface are ignored. Characters falling left of
    /// column 0 or past the right edge are clipped one by one. Without
    /// color, only glyphs are written.
    pub fn write(&mut self, text: &str, fg: ColorId, bg: ColorId, x: i32, y: i32) {
        let Ok(row) = u16::try_from(y) else {
            return;
        };
        if row >= self.height() {
            return;
        }

        let width = i32::from(self.width());
        let use_color = self.use_color;
        let cells = self.frame.row_mut(row);
        let mut col = x;
        for glyph in text.chars() {
            if col >= width {
                break;
            }
            if col >= 0 {
                let cell = &mut cells[col as usize];
                cell.glyph = glyph;
                if use_color {
                    cell.fg = fg;
                    cell.bg = bg;
                }
            }
            col += 1;
        }
        self.dirty.mark_row(row);
    }

    /// Copy changed cells of every flagged row into the canvas.
    ///
    /// The whole row is rescanned even if a single cell was written. A row
    /// stays flagged while any of its cells is flagged, so rows whose emit
    /// failed are retried. Returns the number of cells that changed.
    pub fn promote(&mut self) -> usize {
        let use_color = self.use_color;
        let rows: Vec<u16> = self.dirty.dirty_rows().collect();
        let mut changed = 0;

        for y in rows {
            self.dirty.clear_row(y);
            for x in 0..self.width() {
                let next = self.frame.row(y)[x as usize];
                let Some(current) = self.canvas.get_mut(x, y) else {
                    continue;
                };
                if current.same_as(&next, use_color) {
                    continue;
                }
                if use_color {
                    *current = next;
                } else {
                    current.glyph = next.glyph;
                }
                self.dirty.mark_cell(x, y);
                changed += 1;
            }
            // Cells left flagged by a failed emit keep the row pending.
            if self.dirty.row_span(y).is_some() {
                self.dirty.mark_row(y);
            }
        }
        changed
    }

    /// Compact row `y` into a patch, or `None` if it has nothing to emit.
    ///
    /// With `force_full` the whole row is emitted regardless of flags.
    #[must_use]
    pub fn compact_row(&self, y: u16, force_full: bool) -> Option<RowPatch> {
        if y >= self.height() || self.width() == 0 {
            return None;
        }
        let (start, end) = if force_full {
            (0, self.width() - 1)
        } else {
            if !self.dirty.is_row_dirty(y) {
                return None;
            }
            self.dirty.row_span(y)?
        };

        let cells = &self.canvas.row(y)[start as usize..=end as usize];
        let runs = if self.use_color {
            split_runs(cells)
        } else {
            vec![Run {
                text: cells.iter().map(|cell| cell.glyph).collect(),
                fg: DEFAULT_FG_ID,
                bg: DEFAULT_BG_ID,
            }]
        };

        Some(RowPatch { y, start, end, runs })
    }

    /// Compact every row with something to emit.
    #[must_use]
    pub fn compact(&self, force_full: bool) -> Vec<RowPatch> {
        (0..self.height())
            .filter_map(|y| self.compact_row(y, force_full))
            .collect()
    }

    /// Clear the flags a patch covered.
    pub fn acknowledge(&mut self, patch: &RowPatch) {
        self.dirty.clear_span(patch.y, patch.start, patch.end);
    }

    /// Compact each row, hand it to `emit`, and clear its flags on success.
    ///
    /// A failed row keeps its flags so a later flush retries it. Stale row
    /// flags with no flagged cell are dropped.
    pub fn flush<E>(
        &mut self,
        force_full: bool,
        mut emit: impl FnMut(&RowPatch) -> Result<(), E>,
    ) -> FlushSummary {
        let mut summary = FlushSummary::default();
        for y in 0..self.height() {
            match self.compact_row(y, force_full) {
                Some(patch) => {
                    if emit(&patch).is_ok() {
                        self.acknowledge(&patch);
                        summary.rows_written += 1;
                        summary.chunks_written += patch.runs.len();
                    } else {
                        summary.rows_failed += 1;
                    }
                }
                None => self.dirty.clear_row(y),
            }
        }
        summary
    }

    /// Check that the canvas shows exactly what the frame holds.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        let use_color = self.use_color;
        (0..self.height()).all(|y| {
            self.frame
                .row(y)
                .iter()
                .zip(self.canvas.row(y))
                .all(|(f, c)| f.same_as(c, use_color))
        })
    }

    /// Rebuild all three structures at a new size, keeping the overlap.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width == self.width() && height == self.height() {
            return;
        }
        self.frame = self.frame.resized(width, height);
        self.canvas = self.canvas.resized(width, height);
        self.dirty = self.dirty.resized(width, height);
    }

    /// Frame cell at `(x, y)`.
    #[must_use]
    pub fn frame_cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.frame.get(x, y).copied()
    }

    /// Canvas cell at `(x, y)`.
    #[must_use]
    pub fn canvas_cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.canvas.get(x, y).copied()
    }
}

/// Split cells into maximal runs of constant `(fg, bg)`.
fn split_runs(cells: &[Cell]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for cell in cells {
        if let Some(run) = runs
            .last_mut()
            .filter(|run| run.fg == cell.fg && run.bg == cell.bg)
        {
            run.text.push(cell.glyph);
            continue;
        }
        let mut text = CompactString::default();
        text.push(cell.glyph);
        runs.push(Run {
            text,
            fg: cell.fg,
            bg: cell.bg,
        });
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presented(surface: &mut Surface) -> Vec<RowPatch> {
        surface.promote();
        let mut out = Vec::new();
        surface.flush(false, |patch| {
            out.push(patch.clone());
            Ok::<(), ()>(())
        });
        out
    }

    #[test]
    fn test_write_marks_row_only() {
        let mut surface = Surface::new(10, 3);
        surface.write("hi", 0, 1, 2, 1);
        assert!(surface.dirty().is_row_dirty(1));
        assert_eq!(surface.dirty().dirty_cell_count(), 0);
        assert_eq!(surface.frame_cell(2, 1).unwrap().glyph, 'h');
        assert_eq!(surface.canvas_cell(2, 1).unwrap().glyph, ' ');
    }

    #[test]
    fn test_write_out_of_range_rows_ignored() {
        let mut surface = Surface::new(10, 3);
        surface.write("x", 0, 1, 0, -1);
        surface.write("x", 0, 1, 0, 3);
        assert!(surface.dirty().is_clean());
    }

    #[test]
    fn test_write_clips_left_and_right() {
        let mut surface = Surface::new(5, 1);
        surface.write("abcdefg", 0, 1, -2, 0);
        let row: String = surface.frame().row(0).iter().map(|c| c.glyph).collect();
        assert_eq!(row, "cdefg");

        surface.write("XYZ", 0, 1, 3, 0);
        let row: String = surface.frame().row(0).iter().map(|c| c.glyph).collect();
        assert_eq!(row, "cdeXY");
    }

    #[test]
    fn test_write_without_color_keeps_ids() {
        let mut surface = Surface::new(5, 1);
        surface.write("a", 4, 5, 0, 0);
        surface.set_use_color(false);
        surface.write("b", 7, 7, 0, 0);
        assert_eq!(surface.frame_cell(0, 0), Some(Cell::new('b', 4, 5)));
    }

    #[test]
    fn test_promote_copies_and_flags() {
        let mut surface = Surface::new(10, 2);
        surface.write("ab", 2, 1, 4, 0);
        assert_eq!(surface.promote(), 2);
        assert_eq!(surface.canvas_cell(4, 0), Some(Cell::new('a', 2, 1)));
        assert!(surface.dirty().is_cell_dirty(4, 0));
        assert!(surface.dirty().is_cell_dirty(5, 0));
        assert!(surface.dirty().is_row_dirty(0));
    }

    #[test]
    fn test_promote_unchanged_row_is_wasted_scan() {
        let mut surface = Surface::new(10, 1);
        surface.write(" ", 0, 1, 0, 0);
        assert_eq!(surface.promote(), 0);
        assert!(surface.dirty().is_clean());
        assert!(presented(&mut surface).is_empty());
    }

    #[test]
    fn test_single_cell_span_one_chunk() {
        let mut surface = Surface::new(10, 1);
        surface.write("Q", 0, 1, 7, 0);
        let patches = presented(&mut surface);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].start, 7);
        assert_eq!(patches[0].end, 7);
        assert_eq!(patches[0].runs.len(), 1);
        assert_eq!(patches[0].runs[0].text, "Q");
    }

    #[test]
    fn test_compaction_spans_gap_and_splits_on_color() {
        let mut surface = Surface::new(20, 1);
        surface.write("A", 2, 1, 3, 0);
        surface.write("B", 3, 1, 10, 0);
        let patches = presented(&mut surface);

        assert_eq!(patches.len(), 1);
        let patch = &patches[0];
        assert_eq!((patch.start, patch.end), (3, 10));
        assert_eq!(patch.span_len(), 8);
        let shape: Vec<(&str, ColorId)> =
            patch.runs.iter().map(|r| (r.text.as_str(), r.fg)).collect();
        assert_eq!(shape, vec![("A", 2), ("      ", 0), ("B", 3)]);
    }

    #[test]
    fn test_compaction_without_color_single_chunk() {
        let mut surface = Surface::new(20, 1);
        surface.write("A", 2, 1, 3, 0);
        surface.write("B", 3, 1, 10, 0);
        surface.set_use_color(false);
        surface.promote();
        let patch = surface.compact_row(0, false).unwrap();
        assert_eq!(patch.runs.len(), 1);
        assert_eq!(patch.runs[0].fg, DEFAULT_FG_ID);
        assert_eq!(patch.runs[0].bg, DEFAULT_BG_ID);
        assert_eq!(patch.plain_text(), "A      B");
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut surface = Surface::new(10, 3);
        surface.write("hello", 2, 1, 0, 0);
        surface.write("bye", 0, 1, 4, 2);
        assert_eq!(presented(&mut surface).len(), 2);
        assert!(surface.dirty().is_clean());
        assert!(presented(&mut surface).is_empty());
        assert!(surface.is_synced());
    }

    #[test]
    fn test_failed_emit_keeps_flags() {
        let mut surface = Surface::new(10, 1);
        surface.write("x", 0, 1, 1, 0);
        surface.promote();
        let summary = surface.flush(false, |_| Err("broken pipe"));
        assert_eq!(summary.rows_failed, 1);
        assert!(surface.dirty().is_cell_dirty(1, 0));

        let retried = presented(&mut surface);
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].plain_text(), "x");
    }

    #[test]
    fn test_retry_does_not_widen_later_spans() {
        let mut surface = Surface::new(10, 1);
        surface.write("x", 0, 1, 1, 0);
        surface.promote();
        surface.flush(false, |_| Err("broken pipe"));

        assert_eq!(presented(&mut surface).len(), 1);
        assert!(surface.dirty().is_clean());

        surface.write("y", 0, 1, 8, 0);
        let patches = presented(&mut surface);
        assert_eq!(patches.len(), 1);
        assert_eq!((patches[0].start, patches[0].end), (8, 8));
    }

    #[test]
    fn test_force_full_emits_every_row() {
        let mut surface = Surface::new(4, 3);
        surface.promote();
        let mut rows = Vec::new();
        let summary = surface.flush(true, |patch| {
            rows.push((patch.y, patch.start, patch.end));
            Ok::<(), ()>(())
        });
        assert_eq!(summary.rows_written, 3);
        assert_eq!(rows, vec![(0, 0, 3), (1, 0, 3), (2, 0, 3)]);
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let mut surface = Surface::new(10, 10);
        surface.write("X", 0, 1, 2, 2);
        surface.resize(5, 5);
        assert_eq!(surface.frame_cell(2, 2).unwrap().glyph, 'X');
        assert!(surface.dirty().is_row_dirty(2));

        surface.resize(3, 3);
        assert_eq!(surface.frame_cell(2, 2).unwrap().glyph, 'X');
        surface.resize(2, 2);
        assert_eq!(surface.frame_cell(2, 2), None);
    }

    #[test]
    fn test_split_runs() {
        let cells = [
            Cell::new('a', 2, 1),
            Cell::new('b', 2, 1),
            Cell::new('c', 2, 3),
            Cell::new('d', 0, 1),
        ];
        let runs = split_runs(&cells);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text, "ab");
        assert_eq!(runs[1].text, "c");
        assert_eq!(runs[2].text, "d");
    }
}
