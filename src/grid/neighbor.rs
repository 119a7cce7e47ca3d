//! 4-connected stencil addressing.
//!
//! Adjacency is never stored: a neighbor is computed on demand from the
//! center cell and a slot. A slot's sign is `+1` when the slot is odd and
//! `-1` otherwise; `slot / 2` picks the perturbed axis (0 = row, 1 = column).

use super::dims::{CellIdx, GridDims};
use crate::error::GridError;

/// One of the 4 axis-aligned stencil directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NeighborSlot {
    RowPrev = 0, // (row-1, col)
    RowNext = 1, // (row+1, col)
    ColPrev = 2, // (row, col-1)
    ColNext = 3, // (row, col+1)
}

/// `(row_delta, col_delta)` per slot.
const SLOT_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

impl NeighborSlot {
    pub const ALL: [NeighborSlot; 4] = [
        NeighborSlot::RowPrev,
        NeighborSlot::RowNext,
        NeighborSlot::ColPrev,
        NeighborSlot::ColNext,
    ];

    #[inline]
    pub const fn from_index(slot: u8) -> Option<NeighborSlot> {
        match slot {
            0 => Some(NeighborSlot::RowPrev),
            1 => Some(NeighborSlot::RowNext),
            2 => Some(NeighborSlot::ColPrev),
            3 => Some(NeighborSlot::ColNext),
            _ => None,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn offset(self) -> (isize, isize) {
        SLOT_OFFSETS[self as usize]
    }

    /// The opposite direction; flips the sign bit of the slot.
    #[inline]
    pub const fn reverse(self) -> NeighborSlot {
        match self {
            NeighborSlot::RowPrev => NeighborSlot::RowNext,
            NeighborSlot::RowNext => NeighborSlot::RowPrev,
            NeighborSlot::ColPrev => NeighborSlot::ColNext,
            NeighborSlot::ColNext => NeighborSlot::ColPrev,
        }
    }
}

impl TryFrom<u8> for NeighborSlot {
    type Error = GridError;

    fn try_from(slot: u8) -> Result<Self, Self::Error> {
        NeighborSlot::from_index(slot).ok_or(GridError::InvalidSlot(slot))
    }
}

/// Neighbor of `center` in direction `slot`, or `None` when the offset cell
/// leaves the grid. `None` is a free boundary: callers add nothing for it.
#[inline(always)]
pub fn resolve_neighbor(dims: GridDims, center: CellIdx, slot: NeighborSlot) -> Option<CellIdx> {
    let (row, col) = dims.decode(center);
    let (dr, dc) = slot.offset();
    let row = row as isize + dr;
    let col = col as isize + dc;
    if !dims.contains(row, col) {
        return None;
    }
    Some(dims.encode(row as usize, col as usize))
}

/// Raw-integer form of [`resolve_neighbor`]. Slots outside `0..4` and
/// centers outside the grid resolve to `None`.
#[inline]
pub fn resolve_neighbor_index(dims: GridDims, center: usize, slot: u8) -> Option<usize> {
    if center >= dims.cell_count() {
        return None;
    }
    let slot = NeighborSlot::from_index(slot)?;
    resolve_neighbor(dims, CellIdx(center as u32), slot).map(CellIdx::index)
}

/// All four neighbors of `center`, indexed by slot.
#[inline]
pub fn resolve_all(dims: GridDims, center: CellIdx) -> [Option<CellIdx>; 4] {
    NeighborSlot::ALL.map(|slot| resolve_neighbor(dims, center, slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_count(dims: GridDims, cell: CellIdx) -> usize {
        resolve_all(dims, cell).iter().filter(|n| n.is_none()).count()
    }

    #[test]
    fn table_matches_sign_axis_encoding() {
        for slot in NeighborSlot::ALL {
            let s = slot.index() as isize;
            let sign = if s % 2 == 1 { 1 } else { -1 };
            let axis = s / 2;
            let expected = if axis == 0 { (sign, 0) } else { (0, sign) };
            assert_eq!(slot.offset(), expected, "slot {s}");
        }
    }

    #[test]
    fn offsets_are_distinct_unit_steps() {
        for (i, a) in NeighborSlot::ALL.iter().enumerate() {
            let (dr, dc) = a.offset();
            assert_eq!(dr.abs() + dc.abs(), 1);
            for b in &NeighborSlot::ALL[i + 1..] {
                assert_ne!(a.offset(), b.offset());
            }
        }
    }

    #[test]
    fn interior_cell_resolves_col_next() {
        let dims = GridDims::new(4, 4);
        assert_eq!(
            resolve_neighbor(dims, CellIdx(5), NeighborSlot::ColNext),
            Some(CellIdx(6))
        );
        assert_eq!(resolve_neighbor_index(dims, 5, 0), Some(1));
        assert_eq!(resolve_neighbor_index(dims, 5, 1), Some(9));
        assert_eq!(resolve_neighbor_index(dims, 5, 2), Some(4));
    }

    #[test]
    fn origin_has_no_prev_neighbors() {
        let dims = GridDims::new(4, 4);
        assert_eq!(resolve_neighbor(dims, CellIdx(0), NeighborSlot::RowPrev), None);
        assert_eq!(resolve_neighbor(dims, CellIdx(0), NeighborSlot::ColPrev), None);
        assert_eq!(
            resolve_neighbor(dims, CellIdx(0), NeighborSlot::RowNext),
            Some(CellIdx(4))
        );
    }

    #[test]
    fn boundary_missing_counts() {
        let dims = GridDims::new(5, 4);
        for cell in dims.cells() {
            let (row, col) = dims.decode(cell);
            let on_row_edge = row == 0 || row == dims.height() - 1;
            let on_col_edge = col == 0 || col == dims.width() - 1;
            let expected = on_row_edge as usize + on_col_edge as usize;
            assert_eq!(missing_count(dims, cell), expected, "cell ({row}, {col})");
        }
    }

    #[test]
    fn reverse_returns_to_center() {
        let dims = GridDims::new(6, 3);
        for cell in dims.cells() {
            for slot in NeighborSlot::ALL {
                if let Some(n) = resolve_neighbor(dims, cell, slot) {
                    assert_eq!(resolve_neighbor(dims, n, slot.reverse()), Some(cell));
                    assert_eq!(slot.reverse().index(), slot.index() ^ 1);
                }
            }
        }
    }

    #[test]
    fn raw_slot_out_of_range() {
        let dims = GridDims::new(4, 4);
        assert_eq!(resolve_neighbor_index(dims, 5, 4), None);
        assert_eq!(NeighborSlot::try_from(9), Err(GridError::InvalidSlot(9)));
        assert_eq!(NeighborSlot::try_from(3), Ok(NeighborSlot::ColNext));
    }

    #[test]
    fn raw_center_outside_grid() {
        let dims = GridDims::new(4, 4);
        for slot in 0..4 {
            assert_eq!(resolve_neighbor_index(dims, 16, slot), None);
            assert_eq!(resolve_neighbor_index(dims, usize::MAX, slot), None);
        }
        assert_eq!(resolve_neighbor_index(dims, 15, 0), Some(11));
    }

    #[test]
    fn single_cell_grid_is_isolated() {
        let dims = GridDims::new(1, 1);
        assert_eq!(resolve_all(dims, CellIdx(0)), [None; 4]);
    }
}
