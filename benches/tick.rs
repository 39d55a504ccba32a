//! Interpreter tick-loop benchmarks.
//!
//! Measures the per-tick cost of the plan -> arbitrate -> commit ->
//! advance cycle for a population of organisms running a small
//! arithmetic program.
//!
//! ```bash
//! cargo bench --bench tick
//! ```

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use evochora_core::{Coord, EnvironmentProperties, Runtime, RuntimeConfig};
use evochora_core::asm::compile;

fn arithmetic_artifact(env: &EnvironmentProperties) -> evochora_core::ProgramArtifact {
    let mut sources = BTreeMap::new();
    sources.insert(
        "bench.s".to_string(),
        vec![
            "SETI %DR0 DATA:1".to_string(),
            "ADDI %DR0 DATA:1".to_string(),
            "SUBI %DR0 DATA:1".to_string(),
        ],
    );
    compile(&sources, "bench.s", env).expect("benchmark program compiles")
}

fn bench_tick_population(c: &mut Criterion) {
    let env = EnvironmentProperties { world_shape: vec![4096], toroidal: true };
    let artifact = arithmetic_artifact(&env);

    let mut group = c.benchmark_group("runtime/tick");
    for population in [1usize, 16, 64] {
        group.throughput(Throughput::Elements(population as u64));
        group.bench_function(format!("organisms_{population}"), |b| {
            b.iter(|| {
                let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
                for i in 0..population {
                    let start = (i * 8) as i64 % 4096;
                    rt.place(artifact.clone(), Coord(vec![start]), 10_000);
                }
                for _ in 0..100 {
                    rt.tick();
                }
                black_box(rt.tick_count())
            });
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let env = EnvironmentProperties { world_shape: vec![4096], toroidal: true };
    let mut sources = BTreeMap::new();
    sources.insert(
        "bench.s".to_string(),
        vec![
            "SETI %DR0 DATA:1".to_string(),
            "ADDI %DR0 DATA:1".to_string(),
            "SUBI %DR0 DATA:1".to_string(),
        ],
    );
    c.bench_function("asm/compile_small_program", |b| {
        b.iter(|| black_box(compile(&sources, "bench.s", &env).expect("compiles")))
    });
}

criterion_group!(benches, bench_tick_population, bench_compile);
criterion_main!(benches);
