//! Barrier-synchronized block and two-phase grid sum reductions.

mod block;
mod config;
mod engine;
mod phases;
mod workgroup;

pub use block::BlockReducer;
pub use config::{DEFAULT_GROUP_SIZE, ExecBackend, LaunchConfig, ReduceConfig};
pub use engine::GridReducer;
pub use phases::{phase1_cooperative, phase1_lockstep, phase2_cooperative, phase2_lockstep};
pub use workgroup::{AtomicF32, SharedScratch, Worker, dispatch_group};
