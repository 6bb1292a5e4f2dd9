//! Row and cell change flags bridging the frame and canvas grids.
//!
//! A row flag means "something was written here since the last present".
//! A cell flag means "this cell differs from what the terminal shows" and is
//! only set by promotion.

use bitvec::prelude::*;

/// Per-row and per-cell dirty bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyTracker {
    rows: BitVec,
    cells: BitVec,
    width: u16,
    height: u16,
}

impl DirtyTracker {
    /// Create a clean tracker.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            rows: bitvec![0; height as usize],
            cells: bitvec![0; size],
            width,
            height,
        }
    }

    /// Tracked width.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Tracked height.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    fn index(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    fn row_range(&self, y: u16) -> std::ops::Range<usize> {
        let start = self.index(0, y);
        start..start + self.width as usize
    }

    /// Flag row `y` as touched.
    pub fn mark_row(&mut self, y: u16) {
        if y < self.height {
            self.rows.set(y as usize, true);
        }
    }

    /// Check the row flag.
    #[must_use]
    pub fn is_row_dirty(&self, y: u16) -> bool {
        y < self.height && self.rows[y as usize]
    }

    /// Clear the row flag only.
    pub fn clear_row(&mut self, y: u16) {
        if y < self.height {
            self.rows.set(y as usize, false);
        }
    }

    /// Flag a single cell as changed.
    pub fn mark_cell(&mut self, x: u16, y: u16) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.cells.set(idx, true);
        }
    }

    /// Check a cell flag.
    #[must_use]
    pub fn is_cell_dirty(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)]
    }

    /// Minimal inclusive column span holding a set cell flag in row `y`.
    #[must_use]
    pub fn row_span(&self, y: u16) -> Option<(u16, u16)> {
        if y >= self.height {
            return None;
        }
        let row = &self.cells[self.row_range(y)];
        let start = row.first_one()?;
        let end = row.last_one()?;
        Some((start as u16, end as u16))
    }

    /// Clear cell flags in `[start, end]` of row `y`, and the row flag.
    pub fn clear_span(&mut self, y: u16, start: u16, end: u16) {
        if y >= self.height || self.width == 0 {
            return;
        }
        let end = end.min(self.width - 1);
        if start <= end {
            let base = self.index(0, y);
            self.cells[base + start as usize..=base + end as usize].fill(false);
        }
        self.rows.set(y as usize, false);
    }

    /// Iterate over flagged rows.
    pub fn dirty_rows(&self) -> impl Iterator<Item = u16> + '_ {
        self.rows.iter_ones().map(|y| y as u16)
    }

    /// Count flagged rows.
    #[must_use]
    pub fn dirty_row_count(&self) -> usize {
        self.rows.count_ones()
    }

    /// Count flagged cells.
    #[must_use]
    pub fn dirty_cell_count(&self) -> usize {
        self.cells.count_ones()
    }

    /// Check that no flag of either kind is set.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rows.not_any() && self.cells.not_any()
    }

    /// Copy of this tracker at a new size, keeping flags in the overlap.
    #[must_use]
    pub fn resized(&self, width: u16, height: u16) -> Self {
        let mut next = Self::new(width, height);
        let keep_w = width.min(self.width) as usize;
        for y in 0..height.min(self.height) {
            next.rows.set(y as usize, self.rows[y as usize]);
            let src = self.index(0, y);
            let dst = next.index(0, y);
            next.cells[dst..dst + keep_w].copy_from_bitslice(&self.cells[src..src + keep_w]);
        }
        next
    }
}
