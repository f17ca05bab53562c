//! [`VisitGrid`] – bounded visit counters for Tremaux marking.
//!
//! The grid assumes the maze fits inside a fixed footprint.  Referencing a
//! cell outside it is a contract violation and is reported as
//! [`MazeError::GridBounds`], never silently clamped or treated as a wall.

use tremaux_types::{Cell, MazeError};

/// Default footprint, in cells.
pub const DEFAULT_WIDTH: usize = 20;
pub const DEFAULT_HEIGHT: usize = 20;

/// Non-negative visit counts for every cell of a `width × height` footprint.
///
/// # Example
///
/// ```
/// use tremaux_kernel::grid::VisitGrid;
/// use tremaux_types::Cell;
///
/// let mut grid = VisitGrid::default();
/// let start = grid.entrance();
/// assert_eq!(start, Cell::new(10, 0));
///
/// grid.mark(start).unwrap();
/// assert_eq!(grid.count(start).unwrap(), 1);
/// assert!(grid.count(Cell::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitGrid {
    width: usize,
    height: usize,
    counts: Vec<u8>,
}

impl VisitGrid {
    /// Create an all-zero grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            counts: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The conventional entrance: horizontally centred on the bottom row.
    pub fn entrance(&self) -> Cell {
        Cell::new(i32::try_from(self.width / 2).unwrap_or(i32::MAX), 0)
    }

    /// Whether `cell` lies inside the footprint.
    pub fn contains(&self, cell: Cell) -> bool {
        self.index(cell).is_ok()
    }

    /// Visit count of `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::GridBounds`] if `cell` is outside the footprint.
    pub fn count(&self, cell: Cell) -> Result<u8, MazeError> {
        Ok(self.counts[self.index(cell)?])
    }

    /// Record one more crossing of `cell` and return its new count.
    ///
    /// # Errors
    ///
    /// Returns [`MazeError::GridBounds`] if `cell` is outside the footprint.
    pub fn mark(&mut self, cell: Cell) -> Result<u8, MazeError> {
        let idx = self.index(cell)?;
        self.counts[idx] = self.counts[idx].saturating_add(1);
        Ok(self.counts[idx])
    }

    /// Number of cells crossed at least once.
    pub fn visited_cells(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    fn index(&self, cell: Cell) -> Result<usize, MazeError> {
        let out_of_bounds = || MazeError::GridBounds {
            cell,
            width: self.width,
            height: self.height,
        };
        let x = usize::try_from(cell.x).map_err(|_| out_of_bounds())?;
        let y = usize::try_from(cell.y).map_err(|_| out_of_bounds())?;
        if x >= self.width || y >= self.height {
            return Err(out_of_bounds());
        }
        Ok(y * self.width + x)
    }
}

impl Default for VisitGrid {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
