//! Per-cell stencil terms for Laplacian smoothing.
//!
//! Missing neighbors (grid boundary) add nothing, which gives the operator a
//! free (Neumann) boundary.

use rayon::prelude::*;

use crate::error::{ReduceError, Result};
use crate::grid::{CellIdx, GridDims, NeighborSlot, resolve_neighbor};

fn check_len(dims: GridDims, len: usize) -> Result<()> {
    if len != dims.cell_count() {
        return Err(ReduceError::LengthMismatch {
            expected: dims.cell_count(),
            actual: len,
        });
    }
    Ok(())
}

/// `sum over neighbors n of (x[cell] - x[n])`.
#[inline]
pub fn laplacian_at(dims: GridDims, x: &[f32], cell: CellIdx) -> f32 {
    let center = x[cell.index()];
    NeighborSlot::ALL
        .iter()
        .filter_map(|&slot| resolve_neighbor(dims, cell, slot))
        .map(|n| center - x[n.index()])
        .sum()
}

/// Squared differences to the next row and next column. Summed over the
/// grid this counts every undirected edge exactly once.
#[inline]
pub fn smoothness_at(dims: GridDims, x: &[f32], cell: CellIdx) -> f32 {
    let center = x[cell.index()];
    [NeighborSlot::RowNext, NeighborSlot::ColNext]
        .iter()
        .filter_map(|&slot| resolve_neighbor(dims, cell, slot))
        .map(|n| {
            let d = center - x[n.index()];
            d * d
        })
        .sum()
}

/// Graph Laplacian of `x`, written to `out`.
pub fn apply_laplacian(dims: GridDims, x: &[f32], out: &mut [f32]) -> Result<()> {
    check_len(dims, x.len())?;
    check_len(dims, out.len())?;
    out.par_iter_mut()
        .enumerate()
        .for_each(|(i, o)| *o = laplacian_at(dims, x, CellIdx(i as u32)));
    Ok(())
}

/// Per-cell smoothness energy terms, written to `out`.
pub fn smoothness_contributions(dims: GridDims, x: &[f32], out: &mut [f32]) -> Result<()> {
    check_len(dims, x.len())?;
    check_len(dims, out.len())?;
    out.par_iter_mut()
        .enumerate()
        .for_each(|(i, o)| *o = smoothness_at(dims, x, CellIdx(i as u32)));
    Ok(())
}
