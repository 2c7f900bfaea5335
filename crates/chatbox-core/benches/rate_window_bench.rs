//! Criterion benchmarks for the sliding-window admission counter.
//!
//! Run with:
//! ```bash
//! cargo bench --package chatbox-core --bench rate_window_bench
//! ```

use std::time::{Duration, Instant};

use chatbox_core::RateWindow;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_try_admit(c: &mut Criterion) {
    let mut group = c.benchmark_group("try_admit");
    for capacity in [1usize, 3, 64] {
        group.bench_with_input(BenchmarkId::new("capacity", capacity), &capacity, |b, &cap| {
            let mut window = RateWindow::new(cap, Duration::from_secs(5)).expect("non-zero");
            let t0 = Instant::now();
            let mut step = 0u64;
            b.iter(|| {
                step += 1;
                window.try_admit(black_box(t0 + Duration::from_millis(step)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_try_admit);
criterion_main!(benches);
