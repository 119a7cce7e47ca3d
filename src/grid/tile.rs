//! Two-dimensional worker groups.
//!
//! The tiled kernel variant assigns one group to a `x * y` block of cells
//! instead of a contiguous run of linear indices.

use super::dims::{CellIdx, GridDims};
use crate::error::ReduceError;

/// Cells (and workers) per tile along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileShape {
    x: usize,
    y: usize,
}

impl Default for TileShape {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TileShape {
    /// 32 columns by 8 rows.
    pub const DEFAULT: TileShape = TileShape { x: 32, y: 8 };

    /// The worker count `x * y` must be a non-zero power of two.
    pub fn new(x: usize, y: usize) -> Result<Self, ReduceError> {
        let workers = x.saturating_mul(y);
        if !workers.is_power_of_two() {
            return Err(ReduceError::InvalidGroupSize(workers));
        }
        Ok(Self { x, y })
    }

    #[inline]
    pub fn x(&self) -> usize {
        self.x
    }

    #[inline]
    pub fn y(&self) -> usize {
        self.y
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.x * self.y
    }

    /// Tiles needed to cover `dims`, as `(across, down)`.
    pub fn groups_for(&self, dims: GridDims) -> (usize, usize) {
        (dims.width().div_ceil(self.x), dims.height().div_ceil(self.y))
    }

    /// Cell handled by worker `local` of tile `group`, or `None` for workers
    /// hanging past the right or bottom edge. `local` is linear, row-major
    /// within the tile.
    #[inline]
    pub fn cell_for(&self, dims: GridDims, group: (usize, usize), local: usize) -> Option<CellIdx> {
        let (lx, ly) = (local % self.x, local / self.x);
        let col = group.0 * self.x + lx;
        let row = group.1 * self.y + ly;
        if row < dims.height() && col < dims.width() {
            Some(dims.encode(row, col))
        } else {
            None
        }
    }
}
