use std::time::{Duration, Instant};

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use shutter_core::{IntegratorCfg, MotionIntegrator};

// Full open move at the stock profile for several tick rates.
pub fn bench_open_move(c: &mut Criterion) {
    let mut g = c.benchmark_group("integrator");
    for tick_us in [20u64, 50, 200] {
        g.bench_function(format!("open_20k_steps_tick_{tick_us}us"), |b| {
            b.iter_batched(
                || {
                    let mut m =
                        MotionIntegrator::with_limits(IntegratorCfg::default(), 3200.0, 800.0);
                    m.set_target(20_000);
                    m
                },
                |mut m| {
                    let t0 = Instant::now();
                    let mut t = t0;
                    let mut steps = 0u32;
                    while m.is_moving() {
                        if m.tick(t).is_some() {
                            steps += 1;
                        }
                        t += Duration::from_micros(tick_us);
                    }
                    black_box(steps)
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

// Cost of a tick at rest, which dominates the idle loop.
pub fn bench_idle_tick(c: &mut Criterion) {
    let mut m = MotionIntegrator::with_limits(IntegratorCfg::default(), 3200.0, 800.0);
    let now = Instant::now();
    c.bench_function("integrator_idle_tick", |b| {
        b.iter(|| black_box(m.tick(black_box(now))));
    });
}

criterion_group!(tick, bench_open_move, bench_idle_tick);
criterion_main!(tick);
