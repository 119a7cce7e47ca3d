//! 4-neighbor grid stencil and barrier-synchronized two-phase sum reduction
//! for Laplacian smoothing solvers.

pub mod error;
pub mod grid;
pub mod reduce;
pub mod reference;
pub mod stencil;

pub use error::{GridError, ReduceError, Result};
pub use grid::{CellIdx, GridDims, NeighborSlot, TileShape, resolve_neighbor};
pub use reduce::{BlockReducer, ExecBackend, GridReducer, LaunchConfig, ReduceConfig};
