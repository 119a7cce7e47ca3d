use laplace_grid::reduce::{
    BlockReducer, LaunchConfig, SharedScratch, dispatch_group, phase1_cooperative,
    phase1_lockstep, phase2_cooperative, phase2_lockstep,
};
use laplace_grid::{ExecBackend, GridReducer, ReduceConfig};

fn ones(_group: usize, _lid: usize) -> f32 {
    1.0
}

#[test]
fn block_of_1024_ones() {
    let reducer = BlockReducer::new(1024).unwrap();
    let mut scratch = vec![1.0f32; 1024];
    assert_eq!(reducer.reduce(&mut scratch), 1024.0);
}

#[test]
fn every_worker_sees_the_block_total() {
    const GROUP: usize = 128;
    let reducer = BlockReducer::new(GROUP).unwrap();
    let scratch = SharedScratch::new(GROUP);
    let seen = SharedScratch::new(GROUP);
    dispatch_group(0, GROUP, |w| {
        scratch.store(w.local_id(), w.local_id() as f32);
        reducer.reduce_cooperative(w, &scratch);
        seen.store(w.local_id(), scratch.load(0));
    })
    .unwrap();
    // sum(0..128) = 8128
    assert!(seen.to_vec().iter().all(|&v| v == 8128.0));
}

#[test]
fn two_phase_four_groups_of_1024() {
    let launch = LaunchConfig::new(1024, 4).unwrap();

    let mut partials = vec![0.0f32; 4];
    phase1_lockstep(&launch, ones, &mut partials).unwrap();
    let mut scratch = vec![0.0f32; 1024];
    assert_eq!(
        phase2_lockstep(&launch, &partials, &mut scratch).unwrap(),
        4096.0
    );

    let mut partials = vec![0.0f32; 4];
    phase1_cooperative(&launch, ones, &mut partials).unwrap();
    let shared = SharedScratch::new(1024);
    assert_eq!(phase2_cooperative(&launch, &partials, &shared).unwrap(), 4096.0);
}

#[test]
fn group_count_one_past_capacity_drops_one_group() {
    // group_size + 1 groups of ones: Phase 2 sees only group_size partials.
    let engine = GridReducer::with_config(
        ReduceConfig::default()
            .group_size(1024)
            .backend(ExecBackend::Lockstep),
    )
    .unwrap();
    let values = vec![1.0f32; 1024 * 1025];
    let launch = engine.launch_for(values.len()).unwrap();
    assert_eq!(launch.num_groups(), 1025);
    assert_eq!(launch.dropped_groups(), 1);
    assert_eq!(engine.sum(&values).unwrap(), (1024 * 1024) as f32);
}

#[test]
fn dropped_group_is_the_last_one() {
    let engine = GridReducer::with_config(
        ReduceConfig::default()
            .group_size(4)
            .backend(ExecBackend::Lockstep),
    )
    .unwrap();
    // Five groups; the fifth holds the only non-zero value.
    let mut values = vec![0.0f32; 20];
    values[18] = 5.0;
    assert_eq!(engine.sum(&values).unwrap(), 0.0);
    values[2] = 1.0;
    assert_eq!(engine.sum(&values).unwrap(), 1.0);
}
