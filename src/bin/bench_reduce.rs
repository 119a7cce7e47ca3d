use laplace_grid::{ExecBackend, GridReducer, ReduceConfig};
use rand::RngCore;
use rand::SeedableRng;
use std::time::Instant;

/// Cooperative runs spawn one OS thread per worker; skip them above this.
const COOPERATIVE_MAX_GROUPS: usize = 64;

fn bench_sum(engine: &GridReducer, len: usize, iterations: u32) -> (f64, f32) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xA5A5_5EED_7788_1122);
    let values: Vec<f32> = (0..len)
        .map(|_| (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32)
        .collect();

    let mut total = 0.0f32;
    let start = Instant::now();
    for _ in 0..iterations {
        total = engine.sum(&values).expect("sum failed");
    }
    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    std::hint::black_box(total);
    (total_ms / iterations as f64, total)
}

fn main() {
    let lockstep = GridReducer::with_config(ReduceConfig::default().backend(ExecBackend::Lockstep))
        .expect("failed to build lockstep engine");
    let cooperative =
        GridReducer::with_config(ReduceConfig::default().backend(ExecBackend::Cooperative))
            .expect("failed to build cooperative engine");

    let sizes: &[(usize, u32)] = &[
        (1 << 10, 200), // one group
        (1 << 14, 100),
        (1 << 18, 50),
        (1 << 20, 20), // 1024 groups: the single-pass ceiling
    ];

    println!(
        "{:<10} {:>8} {:>14} {:>16}",
        "Values", "Groups", "Lockstep(ms)", "Cooperative(ms)"
    );
    println!("{}", "-".repeat(52));

    for &(len, iters) in sizes {
        let groups = len.div_ceil(lockstep.group_size());
        let (lock_ms, lock_sum) = bench_sum(&lockstep, len, iters);
        let coop = if groups <= COOPERATIVE_MAX_GROUPS {
            let (coop_ms, coop_sum) = bench_sum(&cooperative, len, 1);
            assert_eq!(lock_sum.to_bits(), coop_sum.to_bits(), "backends disagree at {len}");
            format!("{coop_ms:.4}")
        } else {
            "-".to_string()
        };
        println!("{:<10} {:>8} {:>14.4} {:>16}", len, groups, lock_ms, coop);
    }
}
