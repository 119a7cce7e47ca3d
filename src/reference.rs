//! Serial reference computations.
//!
//! Straight loops with `f64` accumulation; the parallel reductions are
//! checked against these.

use crate::grid::{CellIdx, GridDims};
use crate::stencil::{laplacian_at, smoothness_at};

pub fn serial_sum(values: &[f32]) -> f64 {
    values.iter().map(|&v| v as f64).sum()
}

pub fn serial_dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum()
}

/// Smoothness energy by walking rows and columns directly, without the
/// neighbor resolver.
pub fn serial_smoothness_energy(dims: GridDims, x: &[f32]) -> f64 {
    let (w, h) = (dims.width(), dims.height());
    let mut energy = 0.0f64;
    for row in 0..h {
        for col in 0..w {
            let center = x[row * w + col] as f64;
            if row + 1 < h {
                let d = center - x[(row + 1) * w + col] as f64;
                energy += d * d;
            }
            if col + 1 < w {
                let d = center - x[row * w + col + 1] as f64;
                energy += d * d;
            }
        }
    }
    energy
}

/// Per-cell Laplacian, one cell at a time.
pub fn serial_laplacian(dims: GridDims, x: &[f32]) -> Vec<f32> {
    dims.cells().map(|cell| laplacian_at(dims, x, cell)).collect()
}

/// Per-cell smoothness terms, one cell at a time.
pub fn serial_smoothness_terms(dims: GridDims, x: &[f32]) -> Vec<f32> {
    (0..dims.cell_count())
        .map(|i| smoothness_at(dims, x, CellIdx(i as u32)))
        .collect()
}
