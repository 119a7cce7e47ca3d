//! Launch geometry and engine configuration.

use crate::error::{ReduceError, Result};
use crate::grid::TileShape;

/// Workers per group unless configured otherwise. Host and kernel must agree.
pub const DEFAULT_GROUP_SIZE: usize = 1024;

/// How groups are executed on the CPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecBackend {
    /// Rounds run as data-parallel steps; the barrier is the end of a round.
    Lockstep,
    /// One OS thread per worker, synchronized on a real barrier.
    Cooperative,
}

impl ExecBackend {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lockstep" => Some(ExecBackend::Lockstep),
            "cooperative" | "threads" => Some(ExecBackend::Cooperative),
            _ => None,
        }
    }
}

/// Group size and group count fixed for one reduction call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    group_size: usize,
    num_groups: usize,
}

impl LaunchConfig {
    pub fn new(group_size: usize, num_groups: usize) -> Result<Self> {
        if !group_size.is_power_of_two() {
            return Err(ReduceError::InvalidGroupSize(group_size));
        }
        if num_groups == 0 {
            return Err(ReduceError::EmptyLaunch);
        }
        Ok(Self {
            group_size,
            num_groups,
        })
    }

    /// Enough groups to give every one of `len` values its own worker.
    /// An empty input still launches one (all-zero) group.
    pub fn for_len(group_size: usize, len: usize) -> Result<Self> {
        Self::new(group_size, len.div_ceil(group_size.max(1)).max(1))
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    #[inline]
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    #[inline]
    pub fn total_workers(&self) -> usize {
        self.group_size * self.num_groups
    }

    /// Whether Phase 2 can hold every partial sum in one group.
    #[inline]
    pub fn fits_single_pass(&self) -> bool {
        self.num_groups <= self.group_size
    }

    /// Partial sums Phase 2 will not see.
    #[inline]
    pub fn dropped_groups(&self) -> usize {
        self.num_groups.saturating_sub(self.group_size)
    }
}

/// Configuration for a [`GridReducer`](super::GridReducer).
///
/// `None` fields are resolved when the engine is built.
#[derive(Clone, Debug, Default)]
pub struct ReduceConfig {
    /// Workers per group. `None` means [`DEFAULT_GROUP_SIZE`].
    pub group_size: Option<usize>,
    /// Threads in the lockstep pool. `None` means one per physical core.
    pub thread_count: Option<usize>,
    /// Hard upper bound on pool threads regardless of auto-detection.
    pub max_threads: Option<usize>,
    /// Tile used by tiled reductions. `None` means [`TileShape::DEFAULT`].
    pub tile: Option<TileShape>,
    /// Execution backend. `None` reads `LAPLACE_GRID_BACKEND`, falling back
    /// to lockstep.
    pub backend: Option<ExecBackend>,
}

impl ReduceConfig {
    pub fn group_size(mut self, n: usize) -> Self {
        self.group_size = Some(n);
        self
    }

    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = Some(n.max(1));
        self
    }

    pub fn tile(mut self, shape: TileShape) -> Self {
        self.tile = Some(shape);
        self
    }

    pub fn backend(mut self, backend: ExecBackend) -> Self {
        self.backend = Some(backend);
        self
    }
}
