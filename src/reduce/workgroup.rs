//! Cooperative execution of one worker group on OS threads.
//!
//! Every worker runs the same kernel closure on its own scoped thread and
//! synchronizes with the rest of its group through a shared
//! `std::sync::Barrier`. The barrier also orders memory: slot writes made
//! before `barrier()` are visible to every worker after it, so slot accesses
//! themselves only need relaxed atomics.
//!
//! A kernel must reach the same sequence of barriers on every worker and must
//! not panic between barriers; a worker that stops early leaves the rest of
//! its group blocked.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Barrier, Condvar, Mutex, PoisonError};
use std::thread;

use crate::error::Result;

/// Workers only touch a handful of locals.
const WORKER_STACK_SIZE: usize = 64 * 1024;

/// An `f32` with atomic load/store, stored as its bit pattern.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline(always)]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Group-wide scratch buffer, one slot per worker.
///
/// Owned by the caller for a single reduction and shared by reference with
/// the workers of exactly one group.
#[derive(Debug)]
pub struct SharedScratch {
    slots: Box<[AtomicF32]>,
}

impl SharedScratch {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicF32::default()).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline(always)]
    pub fn load(&self, slot: usize) -> f32 {
        self.slots[slot].load()
    }

    #[inline(always)]
    pub fn store(&self, slot: usize, value: f32) {
        self.slots[slot].store(value);
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.slots.iter().map(AtomicF32::load).collect()
    }
}

/// Per-thread view of a running group.
pub struct Worker<'a> {
    local_id: usize,
    group_id: usize,
    group_size: usize,
    barrier: &'a Barrier,
}

impl Worker<'_> {
    #[inline]
    pub fn local_id(&self) -> usize {
        self.local_id
    }

    #[inline]
    pub fn group_id(&self) -> usize {
        self.group_id
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Block until every worker of the group has arrived.
    #[inline]
    pub fn barrier(&self) {
        self.barrier.wait();
    }
}

/// Holds workers back until the whole group has been spawned.
///
/// If spawning fails part way, the gate opens with `false` and the workers
/// already started return without entering the kernel, so none of them is
/// left waiting on a barrier that can never fill.
struct StartGate {
    state: Mutex<Option<bool>>,
    ready: Condvar,
}

impl StartGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(go) = *state {
                return go;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn open(&self, go: bool) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(go);
        self.ready.notify_all();
    }
}

/// Run `kernel` once for every worker of group `group_id`.
///
/// Returns after all `group_size` workers have finished.
pub fn dispatch_group<F>(group_id: usize, group_size: usize, kernel: F) -> Result<()>
where
    F: Fn(&Worker<'_>) + Sync,
{
    let barrier = Barrier::new(group_size);
    let gate = StartGate::new();

    thread::scope(|scope| -> Result<()> {
        for local_id in 0..group_size {
            let barrier = &barrier;
            let gate = &gate;
            let kernel = &kernel;
            let spawned = thread::Builder::new()
                .name(format!("group{group_id}-w{local_id}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn_scoped(scope, move || {
                    if !gate.wait() {
                        return;
                    }
                    let worker = Worker {
                        local_id,
                        group_id,
                        group_size,
                        barrier,
                    };
                    kernel(&worker);
                });
            if let Err(err) = spawned {
                gate.open(false);
                return Err(err.into());
            }
        }
        gate.open(true);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn every_worker_runs_once_with_its_ids() {
        let seen = SharedScratch::new(16);
        let runs = AtomicUsize::new(0);
        dispatch_group(3, 16, |w| {
            assert_eq!(w.group_id(), 3);
            assert_eq!(w.group_size(), 16);
            seen.store(w.local_id(), w.local_id() as f32);
            runs.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(runs.load(Ordering::Relaxed), 16);
        let expected: Vec<f32> = (0..16).map(|i| i as f32).collect();
        assert_eq!(seen.to_vec(), expected);
    }

    #[test]
    fn barrier_publishes_neighbor_writes() {
        // Each worker reads its right neighbor's slot after the barrier.
        const N: usize = 32;
        let slots = SharedScratch::new(N);
        let observed = SharedScratch::new(N);
        dispatch_group(0, N, |w| {
            let lid = w.local_id();
            slots.store(lid, (lid + 1) as f32);
            w.barrier();
            observed.store(lid, slots.load((lid + 1) % N));
        })
        .unwrap();
        let expected: Vec<f32> = (0..N).map(|i| ((i + 1) % N + 1) as f32).collect();
        assert_eq!(observed.to_vec(), expected);
    }

    #[test]
    fn atomic_f32_round_trips_bits() {
        let slot = AtomicF32::new(-0.0);
        assert!(slot.load().is_sign_negative());
        slot.store(f32::MAX);
        assert_eq!(slot.load(), f32::MAX);
    }
}
