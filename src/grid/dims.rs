//! Row-major grid geometry.

use crate::error::GridError;

/// Linear row-major index of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIdx(pub u32);

impl CellIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Immutable `(width, height)` of a row-major 2D index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridDims {
    width: usize,
    height: usize,
}

impl GridDims {
    /// Grid of `width x height` cells; every cell needs a `u32` index.
    pub fn try_new(width: usize, height: usize) -> Result<Self, GridError> {
        match width.checked_mul(height) {
            Some(cells) if cells <= u32::MAX as usize => Ok(Self { width, height }),
            _ => Err(GridError::TooLarge { width, height }),
        }
    }

    /// # Panics
    /// If `width * height` does not fit a `u32` cell index; see
    /// [`try_new`](Self::try_new).
    pub fn new(width: usize, height: usize) -> Self {
        match Self::try_new(width, height) {
            Ok(dims) => dims,
            Err(err) => panic!("{err}"),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// `row * width + col`. The caller guarantees `row < height, col < width`.
    #[inline(always)]
    pub fn encode(&self, row: usize, col: usize) -> CellIdx {
        debug_assert!(
            row < self.height && col < self.width,
            "encode: ({row}, {col}) outside {}x{} grid",
            self.width,
            self.height
        );
        CellIdx((row * self.width + col) as u32)
    }

    /// Inverse of [`encode`](Self::encode): `(row, col)`.
    #[inline(always)]
    pub fn decode(&self, cell: CellIdx) -> (usize, usize) {
        debug_assert!(cell.index() < self.cell_count());
        let k = cell.index();
        (k / self.width, k % self.width)
    }

    /// Checked decode for host-side callers holding raw indices.
    pub fn try_decode(&self, index: usize) -> Result<(usize, usize), GridError> {
        if index >= self.cell_count() {
            return Err(GridError::CellOutOfRange {
                index,
                cell_count: self.cell_count(),
            });
        }
        Ok(self.decode(CellIdx(index as u32)))
    }

    /// Whether a signed `(row, col)` lies in `[0, height) x [0, width)`.
    #[inline(always)]
    pub fn contains(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellIdx> + use<> {
        (0..self.cell_count() as u32).map(CellIdx)
    }
}
