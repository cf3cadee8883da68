//! Memory tape models.
//!
//! Cells are `u8` and wrap on overflow. The data cursor is always stored as
//! an offset into the tape's own storage, so cloning a tape (or the machine
//! holding it) keeps the cursor on the same cell of the copy.

use std::collections::VecDeque;

/// Default capacity of a [`FixedTape`].
pub const DEFAULT_FIXED_CAPACITY: usize = 4096;

/// A memory tape with a single data cursor.
pub trait Tape {
    /// Offset of the cursor from the first cell currently stored.
    fn cursor(&self) -> usize;

    /// Cursor position relative to the cell execution started on.
    /// Negative once a growable tape has extended to the left.
    fn position(&self) -> isize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self) -> u8;

    fn set(&mut self, value: u8);

    fn move_right(&mut self);

    fn move_left(&mut self);

    /// Snapshot of every stored cell, leftmost first.
    fn cells(&self) -> Vec<u8>;

    fn increment(&mut self) {
        let v = self.get().wrapping_add(1);
        self.set(v);
    }

    fn decrement(&mut self) {
        let v = self.get().wrapping_sub(1);
        self.set(v);
    }
}

/// A tape that grows a zero cell in whichever direction the cursor walks off.
///
/// Starts as a single zero cell. This is the default tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowableTape {
    cells: VecDeque<u8>,
    cursor: usize,
    // Offset of the starting cell; shifts right each time we prepend.
    origin: usize,
}

impl GrowableTape {
    pub fn new() -> Self {
        Self {
            cells: VecDeque::from([0]),
            cursor: 0,
            origin: 0,
        }
    }
}

impl Default for GrowableTape {
    fn default() -> Self {
        Self::new()
    }
}

impl Tape for GrowableTape {
    fn cursor(&self) -> usize {
        self.cursor
    }

    fn position(&self) -> isize {
        self.cursor as isize - self.origin as isize
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn get(&self) -> u8 {
        self.cells[self.cursor]
    }

    #[inline]
    fn set(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    fn move_right(&mut self) {
        self.cursor += 1;
        if self.cursor == self.cells.len() {
            self.cells.push_back(0);
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            // New cell becomes offset 0; the cursor already points at it.
            self.cells.push_front(0);
            self.origin += 1;
        } else {
            self.cursor -= 1;
        }
    }

    fn cells(&self) -> Vec<u8> {
        self.cells.iter().copied().collect()
    }
}

/// A preallocated tape of fixed capacity.
///
/// Walking off either end is a contract violation and panics. Pick this only
/// when the program is known to stay inside `capacity` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTape {
    cells: Box<[u8]>,
    cursor: usize,
}

impl FixedTape {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "fixed tape needs at least one cell");
        Self {
            cells: vec![0; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }
}

impl Default for FixedTape {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_CAPACITY)
    }
}

impl Tape for FixedTape {
    fn cursor(&self) -> usize {
        self.cursor
    }

    fn position(&self) -> isize {
        self.cursor as isize
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn get(&self) -> u8 {
        self.cells[self.cursor]
    }

    #[inline]
    fn set(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    fn move_right(&mut self) {
        assert!(
            self.cursor + 1 < self.cells.len(),
            "data pointer moved past the right edge of a {}-cell fixed tape",
            self.cells.len()
        );
        self.cursor += 1;
    }

    fn move_left(&mut self) {
        assert!(self.cursor > 0, "data pointer moved past the left edge of a fixed tape");
        self.cursor -= 1;
    }

    fn cells(&self) -> Vec<u8> {
        self.cells.to_vec()
    }
}
