//! Host-side error types.
//!
//! Kernel-level primitives never fail; these cover the checked entry points
//! (slot conversion, launch validation, buffer lengths, thread spawning).

use thiserror::Error;

/// Result type for reduction entry points.
pub type Result<T> = std::result::Result<T, ReduceError>;

/// Errors from checked grid addressing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// Neighbor slot outside `0..4`.
    #[error("invalid neighbor slot {0} (expected 0..=3)")]
    InvalidSlot(u8),

    /// Linear index outside the grid.
    #[error("cell index {index} out of range for {cell_count} cells")]
    CellOutOfRange { index: usize, cell_count: usize },

    /// Cell count does not fit a `u32` index.
    #[error("grid {width}x{height} exceeds u32 cell indexing")]
    TooLarge { width: usize, height: usize },
}

/// Errors from configuring or launching a reduction.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// Group size must be a non-zero power of two.
    #[error("group size {0} is not a non-zero power of two")]
    InvalidGroupSize(usize),

    /// A launch needs at least one group.
    #[error("launch has no groups")]
    EmptyLaunch,

    /// Paired buffers disagree in length.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A cooperative worker thread could not be started.
    #[error("failed to spawn group worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The engine's rayon pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
