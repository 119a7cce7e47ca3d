//! Two-phase grid reduction.
//!
//! Phase 1 collapses every group to one partial sum; Phase 2 runs a single
//! final group over the partial sums. Phase 2 must not start before every
//! Phase 1 write has landed, so the two phases are separate calls: each one
//! returns only after all of its groups have joined.
//!
//! A worker's contribution comes from a `Fn(group, local_id) -> f32`; workers
//! with nothing to contribute return `0.0`.
//!
//! Phase 2 holds one partial per worker, so only the first `group_size`
//! partials are combined when `num_groups > group_size`.
//!
//! Buffer lengths are checked before any group starts: a cooperative worker
//! that panicked on a short buffer would leave its siblings at the barrier.

use rayon::prelude::*;

use super::block::BlockReducer;
use super::config::LaunchConfig;
use super::workgroup::{SharedScratch, dispatch_group};
use crate::error::{ReduceError, Result};

/// `partials` and similar per-group buffers must match exactly.
pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ReduceError::LengthMismatch { expected, actual });
    }
    Ok(())
}

/// Scratch must hold one slot per worker of the group.
fn check_scratch(group_size: usize, actual: usize) -> Result<()> {
    if actual < group_size {
        return Err(ReduceError::LengthMismatch {
            expected: group_size,
            actual,
        });
    }
    Ok(())
}

/// Phase 1 with lockstep groups on the current rayon pool.
///
/// `partials[g]` receives the sum of group `g`; it needs one slot per group.
pub fn phase1_lockstep<F>(
    launch: &LaunchConfig,
    contribution: F,
    partials: &mut [f32],
) -> Result<()>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    check_len(launch.num_groups(), partials.len())?;
    let reducer = BlockReducer::for_launch(launch);
    let group_size = launch.group_size();

    partials.par_iter_mut().enumerate().for_each_init(
        || vec![0.0f32; group_size],
        |scratch, (group, partial)| {
            for (lid, slot) in scratch.iter_mut().enumerate() {
                *slot = contribution(group, lid);
            }
            *partial = reducer.reduce(scratch);
        },
    );
    Ok(())
}

/// Phase 2 with a lockstep final group. `partials` holds one slot per group;
/// `scratch` must hold at least `group_size` slots and is overwritten.
pub fn phase2_lockstep(
    launch: &LaunchConfig,
    partials: &[f32],
    scratch: &mut [f32],
) -> Result<f32> {
    let group_size = launch.group_size();
    check_len(launch.num_groups(), partials.len())?;
    check_scratch(group_size, scratch.len())?;
    for (lid, slot) in scratch[..group_size].iter_mut().enumerate() {
        *slot = load_partial(launch, partials, lid);
    }
    Ok(BlockReducer::for_launch(launch).reduce(scratch))
}

/// Phase 1 with cooperative groups, one group at a time.
pub fn phase1_cooperative<F>(
    launch: &LaunchConfig,
    contribution: F,
    partials: &mut [f32],
) -> Result<()>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    check_len(launch.num_groups(), partials.len())?;
    let reducer = BlockReducer::for_launch(launch);
    let group_size = launch.group_size();
    let scratch = SharedScratch::new(group_size);
    let sums = SharedScratch::new(launch.num_groups());

    for group in 0..launch.num_groups() {
        dispatch_group(group, group_size, |w| {
            scratch.store(w.local_id(), contribution(group, w.local_id()));
            reducer.reduce_cooperative(w, &scratch);
            if w.local_id() == 0 {
                sums.store(group, scratch.load(0));
            }
        })?;
    }

    for (group, partial) in partials.iter_mut().enumerate() {
        *partial = sums.load(group);
    }
    Ok(())
}

/// Phase 2 with a cooperative final group.
///
/// Every worker of the final group sees the total in slot 0 of `scratch`
/// after the closing barrier; the host reads it once the group has joined.
pub fn phase2_cooperative(
    launch: &LaunchConfig,
    partials: &[f32],
    scratch: &SharedScratch,
) -> Result<f32> {
    check_len(launch.num_groups(), partials.len())?;
    check_scratch(launch.group_size(), scratch.len())?;
    let reducer = BlockReducer::for_launch(launch);
    dispatch_group(launch.num_groups(), launch.group_size(), |w| {
        let lid = w.local_id();
        scratch.store(lid, load_partial(launch, partials, lid));
        w.barrier();
        reducer.reduce_cooperative(w, scratch);
        w.barrier();
    })?;
    Ok(scratch.load(0))
}

/// Partial for worker `lid` of the final group; zero past the valid range.
#[inline]
fn load_partial(launch: &LaunchConfig, partials: &[f32], lid: usize) -> f32 {
    if lid < launch.num_groups() {
        partials[lid]
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(_group: usize, _lid: usize) -> f32 {
        1.0
    }

    #[test]
    fn lockstep_two_phase_sums_every_worker() {
        let launch = LaunchConfig::new(1024, 4).unwrap();
        let mut partials = vec![0.0; 4];
        phase1_lockstep(&launch, ones, &mut partials).unwrap();
        assert_eq!(partials, vec![1024.0; 4]);

        let mut scratch = vec![0.0; 1024];
        assert_eq!(phase2_lockstep(&launch, &partials, &mut scratch).unwrap(), 4096.0);
    }

    #[test]
    fn cooperative_two_phase_sums_every_worker() {
        let launch = LaunchConfig::new(1024, 4).unwrap();
        let mut partials = vec![0.0; 4];
        phase1_cooperative(&launch, ones, &mut partials).unwrap();
        assert_eq!(partials, vec![1024.0; 4]);

        let scratch = SharedScratch::new(1024);
        assert_eq!(
            phase2_cooperative(&launch, &partials, &scratch).unwrap(),
            4096.0
        );
    }

    #[test]
    fn partials_hold_per_group_sums() {
        let launch = LaunchConfig::new(8, 3).unwrap();
        let mut partials = vec![0.0; 3];
        phase1_lockstep(&launch, |g, lid| (g * 100 + lid) as f32, &mut partials).unwrap();
        // sum(0..8) = 28
        assert_eq!(partials, vec![28.0, 828.0, 1628.0]);
    }

    #[test]
    fn phase2_zero_pads_unused_workers() {
        let launch = LaunchConfig::new(8, 2).unwrap();
        let mut scratch = vec![99.0; 8];
        assert_eq!(
            phase2_lockstep(&launch, &[3.0, 4.0], &mut scratch).unwrap(),
            7.0
        );
    }

    #[test]
    fn one_group_past_capacity_is_dropped() {
        let launch = LaunchConfig::new(8, 9).unwrap();
        let mut partials = vec![0.0; 9];
        phase1_lockstep(&launch, ones, &mut partials).unwrap();
        let mut scratch = vec![0.0; 8];
        assert_eq!(phase2_lockstep(&launch, &partials, &mut scratch).unwrap(), 64.0);

        let shared = SharedScratch::new(8);
        assert_eq!(phase2_cooperative(&launch, &partials, &shared).unwrap(), 64.0);
    }

    #[test]
    fn short_partials_are_rejected_before_launch() {
        let launch = LaunchConfig::new(8, 4).unwrap();
        let shared = SharedScratch::new(8);
        assert!(matches!(
            phase2_cooperative(&launch, &[1.0, 2.0], &shared),
            Err(ReduceError::LengthMismatch {
                expected: 4,
                actual: 2
            })
        ));
        let mut scratch = vec![0.0; 8];
        assert!(matches!(
            phase2_lockstep(&launch, &[1.0, 2.0], &mut scratch),
            Err(ReduceError::LengthMismatch { .. })
        ));

        let mut short = vec![0.0; 3];
        assert!(matches!(
            phase1_cooperative(&launch, ones, &mut short),
            Err(ReduceError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(phase1_lockstep(&launch, ones, &mut short).is_err());
        assert_eq!(short, vec![0.0; 3]);
    }

    #[test]
    fn short_scratch_is_rejected() {
        let launch = LaunchConfig::new(8, 2).unwrap();
        let mut scratch = vec![0.0; 4];
        assert!(phase2_lockstep(&launch, &[1.0, 1.0], &mut scratch).is_err());
        let shared = SharedScratch::new(4);
        assert!(matches!(
            phase2_cooperative(&launch, &[1.0, 1.0], &shared),
            Err(ReduceError::LengthMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }
}
