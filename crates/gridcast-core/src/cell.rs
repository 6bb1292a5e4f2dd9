//! Character cells and the rectangular grid that holds them.

use crate::palette::{ColorId, DEFAULT_BG_ID, DEFAULT_FG_ID};

/// A single terminal cell: one glyph plus its color ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Displayed character.
    pub glyph: char,
    /// Foreground color id.
    pub fg: ColorId,
    /// Background color id.
    pub bg: ColorId,
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl Cell {
    /// A space in the default colors.
    pub const BLANK: Self = Self {
        glyph: ' ',
        fg: DEFAULT_FG_ID,
        bg: DEFAULT_BG_ID,
    };

    /// Create a cell.
    #[must_use]
    pub const fn new(glyph: char, fg: ColorId, bg: ColorId) -> Self {
        Self { glyph, fg, bg }
    }

    /// Compare two cells, ignoring colors unless `with_color` is set.
    #[must_use]
    pub fn same_as(&self, other: &Self, with_color: bool) -> bool {
        self.glyph == other.glyph && (!with_color || (self.fg == other.fg && self.bg == other.bg))
    }
}

/// Row-major grid of cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
    width: u16,
    height: u16,
}

impl Grid {
    /// Create a blank grid.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            cells: vec![Cell::BLANK; size],
            width,
            height,
        }
    }

    /// Grid width in columns.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Grid height in rows.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Total cell count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the grid has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Convert (x, y) to linear index.
    #[must_use]
    pub fn index(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Get a cell.
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x < self.width && y < self.height {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Get a mutable cell.
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// Cells of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of range.
    #[must_use]
    pub fn row(&self, y: u16) -> &[Cell] {
        let start = self.index(0, y);
        &self.cells[start..start + self.width as usize]
    }

    /// Mutable cells of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of range.
    pub fn row_mut(&mut self, y: u16) -> &mut [Cell] {
        let start = self.index(0, y);
        let width = self.width as usize;
        &mut self.cells[start..start + width]
    }

    /// Copy of this grid at a new size.
    ///
    /// The top-left overlap is kept; new cells are blank.
    #[must_use]
    pub fn resized(&self, width: u16, height: u16) -> Self {
        let mut grid = Self::new(width, height);
        let keep_w = width.min(self.width) as usize;
        for y in 0..height.min(self.height) {
            grid.row_mut(y)[..keep_w].copy_from_slice(&self.row(y)[..keep_w]);
        }
        grid
    }
}
