use std::sync::OnceLock;

use tracing::{debug, warn};

use super::block::BlockReducer;
use super::config::{DEFAULT_GROUP_SIZE, ExecBackend, LaunchConfig, ReduceConfig};
use super::phases::{
    check_len, phase1_cooperative, phase1_lockstep, phase2_cooperative, phase2_lockstep,
};
use super::workgroup::SharedScratch;
use crate::error::{ReduceError, Result};
use crate::grid::{CellIdx, GridDims, TileShape};
use crate::stencil::smoothness_at;

const BACKEND_ENV: &str = "LAPLACE_GRID_BACKEND";

static PHYSICAL_CORES: OnceLock<usize> = OnceLock::new();

fn physical_core_count() -> usize {
    *PHYSICAL_CORES.get_or_init(|| num_cpus::get_physical().max(1))
}

/// Resolve the pool size from a config, falling back to physical cores.
fn resolve_thread_count(config: &ReduceConfig) -> usize {
    let mut threads = config.thread_count.unwrap_or_else(physical_core_count);
    if let Some(cap) = config.max_threads {
        threads = threads.min(cap);
    }
    threads.max(1)
}

/// Resolve the backend from a config, then the environment, then lockstep.
fn resolve_backend(config: &ReduceConfig) -> ExecBackend {
    if let Some(backend) = config.backend {
        return backend;
    }
    match std::env::var(BACKEND_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            ExecBackend::parse(value.trim()).unwrap_or_else(|| {
                warn!(value = %value, "unknown {BACKEND_ENV}, using lockstep");
                ExecBackend::Lockstep
            })
        }
        _ => ExecBackend::Lockstep,
    }
}

/// Host-side driver for two-phase grid reductions.
///
/// Every call is a fresh Phase 1 followed by Phase 2; nothing is carried
/// between calls.
pub struct GridReducer {
    pool: rayon::ThreadPool,
    group_size: usize,
    tile: TileShape,
    backend: ExecBackend,
}

impl GridReducer {
    pub fn new() -> Result<Self> {
        Self::with_config(ReduceConfig::default())
    }

    pub fn with_config(config: ReduceConfig) -> Result<Self> {
        let group_size = config.group_size.unwrap_or(DEFAULT_GROUP_SIZE);
        BlockReducer::new(group_size)?;
        let threads = resolve_thread_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("laplace-grid-{i}"))
            .build()?;
        let backend = resolve_backend(&config);
        let tile = config.tile.unwrap_or_default();
        debug!(
            group_size,
            threads,
            ?backend,
            tile_x = tile.x(),
            tile_y = tile.y(),
            "grid reducer ready"
        );

        Ok(Self {
            pool,
            group_size,
            tile,
            backend,
        })
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    #[inline]
    pub fn backend(&self) -> ExecBackend {
        self.backend
    }

    #[inline]
    pub fn tile(&self) -> TileShape {
        self.tile
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Launch geometry this engine uses for `len` values.
    pub fn launch_for(&self, len: usize) -> Result<LaunchConfig> {
        LaunchConfig::for_len(self.group_size, len)
    }

    /// Final-group launch of the tiled variant: one partial per tile of
    /// `dims`, combined by a group of [`group_size`](Self::group_size)
    /// workers. Tiles only shape Phase 1.
    pub fn tiled_launch_for(&self, dims: GridDims) -> Result<LaunchConfig> {
        let (across, down) = self.tile.groups_for(dims);
        LaunchConfig::new(self.group_size, (across * down).max(1))
    }

    /// Phase 1 only: `partials[g]` receives the sum of the values owned by
    /// group `g`. `partials` must have one slot per group of
    /// [`launch_for(values.len())`](Self::launch_for).
    pub fn phase1(&self, values: &[f32], partials: &mut [f32]) -> Result<()> {
        let launch = self.launch_for(values.len())?;
        check_len(launch.num_groups(), partials.len())?;
        self.run_phase1(&launch, linear_loader(&launch, values.len(), |i| values[i]), partials)
    }

    /// Phase 2 only: combine one partial per group.
    ///
    /// Partials past the group size are not seen; the result is then short
    /// by exactly those groups.
    pub fn phase2(&self, partials: &[f32]) -> Result<f32> {
        let launch = LaunchConfig::new(self.group_size, partials.len())?;
        self.run_phase2(&launch, partials)
    }

    /// Sum of `values`.
    pub fn sum(&self, values: &[f32]) -> Result<f32> {
        self.sum_by(values.len(), |i| values[i])
    }

    /// Sum of squares, e.g. a squared residual norm.
    pub fn sum_squares(&self, values: &[f32]) -> Result<f32> {
        self.sum_by(values.len(), |i| values[i] * values[i])
    }

    /// Dot product of two equally long vectors.
    pub fn dot(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        check_len(a.len(), b.len())?;
        self.sum_by(a.len(), |i| a[i] * b[i])
    }

    /// Sum of a per-cell field with one group per tile of the grid.
    pub fn sum_tiled(&self, dims: GridDims, values: &[f32]) -> Result<f32> {
        check_len(dims.cell_count(), values.len())?;
        self.reduce_tiled(dims, |cell| values[cell.index()])
    }

    /// Smoothness energy `sum over edges of (x_i - x_j)^2` of a per-cell field.
    pub fn smoothness_energy(&self, dims: GridDims, x: &[f32]) -> Result<f32> {
        check_len(dims.cell_count(), x.len())?;
        self.reduce_tiled(dims, |cell| smoothness_at(dims, x, cell))
    }

    fn sum_by<F>(&self, len: usize, value: F) -> Result<f32>
    where
        F: Fn(usize) -> f32 + Sync,
    {
        let launch = self.launch_for(len)?;
        let mut partials = vec![0.0f32; launch.num_groups()];
        self.run_phase1(&launch, linear_loader(&launch, len, value), &mut partials)?;
        self.run_phase2(&launch, &partials)
    }

    fn reduce_tiled<F>(&self, dims: GridDims, value: F) -> Result<f32>
    where
        F: Fn(CellIdx) -> f32 + Sync,
    {
        let tile = self.tile;
        let (across, down) = tile.groups_for(dims);
        let finish = self.tiled_launch_for(dims)?;
        let tiles = LaunchConfig::new(tile.workers(), finish.num_groups())?;
        let mut partials = vec![0.0f32; tiles.num_groups()];
        let loader = |group: usize, lid: usize| {
            if across == 0 {
                return 0.0;
            }
            tile.cell_for(dims, (group % across, group / across), lid)
                .map_or(0.0, &value)
        };
        self.run_phase1(&tiles, loader, &mut partials)?;
        self.run_phase2(&finish, &partials)
    }

    fn run_phase1<F>(
        &self,
        launch: &LaunchConfig,
        contribution: F,
        partials: &mut [f32],
    ) -> Result<()>
    where
        F: Fn(usize, usize) -> f32 + Sync,
    {
        debug!(
            group_size = launch.group_size(),
            num_groups = launch.num_groups(),
            backend = ?self.backend,
            "phase 1"
        );
        match self.backend {
            ExecBackend::Lockstep => self
                .pool
                .install(|| phase1_lockstep(launch, &contribution, partials)),
            ExecBackend::Cooperative => phase1_cooperative(launch, contribution, partials),
        }
    }

    fn run_phase2(&self, launch: &LaunchConfig, partials: &[f32]) -> Result<f32> {
        if !launch.fits_single_pass() {
            warn!(
                num_groups = launch.num_groups(),
                group_size = launch.group_size(),
                dropped = launch.dropped_groups(),
                "partial sums exceed one group; dropped groups are missing from the total"
            );
        }
        match self.backend {
            ExecBackend::Lockstep => {
                let mut scratch = vec![0.0f32; launch.group_size()];
                self.pool
                    .install(|| phase2_lockstep(launch, partials, &mut scratch))
            }
            ExecBackend::Cooperative => {
                let scratch = SharedScratch::new(launch.group_size());
                phase2_cooperative(launch, partials, &scratch)
            }
        }
    }
}

/// Worker `lid` of group `g` owns value `g * group_size + lid`, or nothing.
fn linear_loader<F>(
    launch: &LaunchConfig,
    len: usize,
    value: F,
) -> impl Fn(usize, usize) -> f32 + Sync
where
    F: Fn(usize) -> f32 + Sync,
{
    let group_size = launch.group_size();
    move |group, lid| {
        let i = group * group_size + lid;
        if i < len { value(i) } else { 0.0 }
    }
}
