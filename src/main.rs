use laplace_grid::reference::{serial_dot, serial_smoothness_energy, serial_sum};
use laplace_grid::{ExecBackend, GridDims, GridReducer, ReduceConfig};
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_SIDE: usize = 512;
const SEED: u64 = 0x5EED_1234_ABCD_EF01;
/// Relative tolerance against the f64 serial reference.
const REL_TOLERANCE: f64 = 1e-4;

struct MainArgs {
    width: usize,
    height: usize,
    config: ReduceConfig,
}

fn parse_args() -> MainArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut width = DEFAULT_SIDE;
    let mut height = DEFAULT_SIDE;
    let mut config = ReduceConfig::default();
    let next_arg = |i: usize, flag: &str| -> &str {
        args.get(i)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("{flag} requires a value"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--width" => {
                i += 1;
                width = next_arg(i, "--width")
                    .parse()
                    .expect("--width requires a positive integer");
            }
            "--height" => {
                i += 1;
                height = next_arg(i, "--height")
                    .parse()
                    .expect("--height requires a positive integer");
            }
            "--group-size" => {
                i += 1;
                let n: usize = next_arg(i, "--group-size")
                    .parse()
                    .expect("--group-size requires a power of two");
                config = config.group_size(n);
            }
            "--threads" => {
                i += 1;
                let n: usize = next_arg(i, "--threads")
                    .parse()
                    .expect("--threads requires a positive integer");
                config = config.thread_count(n);
            }
            "--backend" => {
                i += 1;
                let name = next_arg(i, "--backend");
                let backend = ExecBackend::parse(name).unwrap_or_else(|| {
                    panic!("unknown backend: {name} (expected lockstep or cooperative)")
                });
                config = config.backend(backend);
            }
            other => panic!(
                "unknown argument: {other}\nusage: laplace-grid [--width N] [--height N] [--group-size N] [--threads N] [--backend lockstep|cooperative]"
            ),
        }
        i += 1;
    }
    MainArgs {
        width,
        height,
        config,
    }
}

fn seed_field(dims: GridDims) -> Vec<f32> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(SEED);
    (0..dims.cell_count())
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect()
}

fn check(label: &str, got: f32, expected: f64, start: Instant) {
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let err = (got as f64 - expected).abs() / expected.abs().max(1.0);
    let status = if err <= REL_TOLERANCE {
        "MATCH"
    } else {
        "MISMATCH"
    };
    println!(
        "{label:<18} {got:>16.6} ref {expected:>16.6}  rel {err:.2e}  {elapsed_ms:>9.3} ms [{status}]"
    );
}

fn main() -> laplace_grid::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = parse_args();
    let dims = GridDims::new(args.width, args.height);
    let engine = GridReducer::with_config(args.config)?;
    let field = seed_field(dims);

    let launch = engine.launch_for(field.len())?;
    println!(
        "grid {}x{} | backend {:?} | group {} x {} groups | {} threads",
        dims.width(),
        dims.height(),
        engine.backend(),
        launch.group_size(),
        launch.num_groups(),
        engine.thread_count()
    );
    let tiled = engine.tiled_launch_for(dims)?;
    println!(
        "tiles {}x{} | {} tile partials into a final group of {}",
        engine.tile().x(),
        engine.tile().y(),
        tiled.num_groups(),
        tiled.group_size()
    );
    for (name, launch) in [("linear", &launch), ("tiled", &tiled)] {
        if !launch.fits_single_pass() {
            println!(
                "note: {name}: {} groups exceed the single-pass ceiling; {} partial sums will be dropped",
                launch.num_groups(),
                launch.dropped_groups()
            );
        }
    }

    let start = Instant::now();
    let sum = engine.sum(&field)?;
    check("sum", sum, serial_sum(&field), start);

    let start = Instant::now();
    let norm2 = engine.sum_squares(&field)?;
    check("sum_squares", norm2, serial_dot(&field, &field), start);

    let start = Instant::now();
    let tiled = engine.sum_tiled(dims, &field)?;
    check("sum_tiled", tiled, serial_sum(&field), start);

    let start = Instant::now();
    let energy = engine.smoothness_energy(dims, &field)?;
    let expected = serial_smoothness_energy(dims, &field);
    check("smoothness_energy", energy, expected, start);

    Ok(())
}
