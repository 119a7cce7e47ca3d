//! Grid geometry and 4-neighbor stencil resolution.

mod dims;
mod neighbor;
mod tile;

pub use dims::{CellIdx, GridDims};
pub use neighbor::{NeighborSlot, resolve_all, resolve_neighbor, resolve_neighbor_index};
pub use tile::TileShape;
