//! Bounded color-id cache with round-robin eviction.
//!
//! Cells store a small [`ColorId`] instead of a full color. The table maps
//! ids back to colors. It has no notion of recency: once more distinct
//! colors are registered than there are free slots, the cursor wraps and
//! hands out ids that cells may still reference. Those cells render with
//! the new color until they are redrawn.

use crate::color::Rgb;
use thiserror::Error;

/// Index into a [`ColorTable`].
pub type ColorId = usize;

/// Slot reserved for the default foreground.
pub const DEFAULT_FG_ID: ColorId = 0;
/// Slot reserved for the default background.
pub const DEFAULT_BG_ID: ColorId = 1;
/// First slot the round-robin cursor may hand out.
pub const FIRST_FREE_ID: ColorId = 2;
/// Smallest permitted capacity (two reserved plus two free slots).
pub const MIN_CAPACITY: usize = 4;
/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 256;

/// Default foreground key.
pub const DEFAULT_FG: Rgb = Rgb::WHITE;
/// Default background key.
pub const DEFAULT_BG: Rgb = Rgb::BLACK;

/// Requested capacity is below [`MIN_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("color capacity {requested} is below the minimum of 4")]
pub struct CapacityError {
    /// The rejected capacity.
    pub requested: usize,
}

/// Fixed-capacity color table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    slots: Vec<Option<Rgb>>,
    /// Last id handed out by the round-robin cursor.
    cursor: ColorId,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self {
            slots: Self::fresh_slots(DEFAULT_CAPACITY),
            cursor: DEFAULT_BG_ID,
        }
    }
}

impl ColorTable {
    /// Create a table with `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `capacity < 4`.
    pub fn with_capacity(capacity: usize) -> Result<Self, CapacityError> {
        if capacity < MIN_CAPACITY {
            return Err(CapacityError {
                requested: capacity,
            });
        }
        Ok(Self {
            slots: Self::fresh_slots(capacity),
            cursor: DEFAULT_BG_ID,
        })
    }

    fn fresh_slots(capacity: usize) -> Vec<Option<Rgb>> {
        let mut slots = vec![None; capacity];
        slots[DEFAULT_FG_ID] = Some(DEFAULT_FG);
        slots[DEFAULT_BG_ID] = Some(DEFAULT_BG);
        slots
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Color stored at `id`, if the slot exists and is occupied.
    #[must_use]
    pub fn get(&self, id: ColorId) -> Option<Rgb> {
        self.slots.get(id).copied().flatten()
    }

    /// Color stored at `id`, falling back to the given default when the slot
    /// is empty or was discarded by a shrink.
    #[must_use]
    pub fn resolve(&self, id: ColorId, fallback: Rgb) -> Rgb {
        self.get(id).unwrap_or(fallback)
    }

    /// Return the id holding `color`, registering it if absent.
    ///
    /// The scan covers every slot. A miss advances the cursor, wrapping to
    /// the first free slot, and overwrites whatever that slot held.
    pub fn lookup_or_insert(&mut self, color: Rgb) -> ColorId {
        if let Some(id) = self.slots.iter().position(|slot| *slot == Some(color)) {
            return id;
        }

        self.cursor += 1;
        if self.cursor >= self.slots.len() {
            self.cursor = FIRST_FREE_ID;
        }
        self.slots[self.cursor] = Some(color);
        self.cursor
    }

    /// Change the number of slots, keeping low ids intact.
    ///
    /// Growing appends empty slots. Shrinking discards ids at or above the
    /// new capacity; cells still referencing them fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `capacity < 4`; the table is unchanged.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), CapacityError> {
        if capacity < MIN_CAPACITY {
            return Err(CapacityError {
                requested: capacity,
            });
        }
        self.slots.resize(capacity, None);
        Ok(())
    }

    /// Force the reserved slots back to the fixed defaults.
    pub fn reset_defaults(&mut self) {
        self.slots[DEFAULT_FG_ID] = Some(DEFAULT_FG);
        self.slots[DEFAULT_BG_ID] = Some(DEFAULT_BG);
    }

    /// Copy of every slot, for resolving ids without holding the table.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Option<Rgb>> {
        self.slots.clone()
    }
}
