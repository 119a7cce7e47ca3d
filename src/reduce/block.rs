//! In-place tree sum over one group's scratch buffer.
//!
//! Each round halves the active range: slot `i < h` absorbs slot `i + h`.
//! A round only reads slots written by the round before it, so a barrier is
//! needed before every round and nowhere else. After the `h = 1` round, slot 0
//! holds the sum of all `group_size` slots.
//!
//! Precondition for both forms: every one of the first `group_size` slots has
//! been written for this call. Stale or unwritten slots silently corrupt the
//! sum; this is only checked in debug builds.

use rayon::prelude::*;

use super::config::LaunchConfig;
use super::workgroup::{SharedScratch, Worker};
use crate::error::{ReduceError, Result};

/// Rounds at least this wide are split across the rayon pool.
const PARALLEL_ROUND_MIN: usize = 1 << 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockReducer {
    group_size: usize,
}

impl BlockReducer {
    pub fn new(group_size: usize) -> Result<Self> {
        if !group_size.is_power_of_two() {
            return Err(ReduceError::InvalidGroupSize(group_size));
        }
        Ok(Self { group_size })
    }

    pub fn for_launch(launch: &LaunchConfig) -> Self {
        Self {
            group_size: launch.group_size(),
        }
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Lockstep form: each round completes for every slot before the next
    /// begins. Returns slot 0.
    pub fn reduce(&self, scratch: &mut [f32]) -> f32 {
        debug_assert!(
            scratch.len() >= self.group_size,
            "scratch holds {} slots, group needs {}",
            scratch.len(),
            self.group_size
        );
        let mut half = self.group_size / 2;
        while half > 0 {
            let (lo, hi) = scratch[..2 * half].split_at_mut(half);
            if half >= PARALLEL_ROUND_MIN {
                lo.par_iter_mut().zip(hi.par_iter()).for_each(|(a, b)| *a += *b);
            } else {
                for (a, b) in lo.iter_mut().zip(hi.iter()) {
                    *a += *b;
                }
            }
            half /= 2;
        }
        scratch[0]
    }

    /// Cooperative form, called by every worker of the group.
    ///
    /// On return slot 0 holds the sum and is visible to all workers.
    pub fn reduce_cooperative(&self, worker: &Worker<'_>, scratch: &SharedScratch) {
        debug_assert_eq!(worker.group_size(), self.group_size);
        debug_assert!(scratch.len() >= self.group_size);
        let lid = worker.local_id();

        worker.barrier();
        let mut half = self.group_size / 2;
        while half > 0 {
            if lid < half {
                scratch.store(lid, scratch.load(lid) + scratch.load(lid + half));
            }
            worker.barrier();
            half /= 2;
        }
    }
}
