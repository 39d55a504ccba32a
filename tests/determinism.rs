//! Determinism and compile-purity scenarios (§8 "Invariants").

use std::collections::BTreeMap;

use evochora_core::asm::compile;
use evochora_core::{Coord, EnvironmentProperties, Runtime, RuntimeConfig};

fn env() -> EnvironmentProperties {
    EnvironmentProperties { world_shape: vec![64], toroidal: true }
}

fn forking_sources() -> BTreeMap<String, Vec<String>> {
    let mut sources = BTreeMap::new();
    sources.insert(
        "main.s".to_string(),
        vec![
            "PUSI DATA:1".to_string(),
            "VBLD".to_string(),
            "PUSI DATA:20".to_string(),
            "FORK".to_string(),
        ],
    );
    sources
}

#[test]
fn identical_seed_and_artifacts_yield_identical_snapshot_streams() {
    let env = env();
    let artifact = compile(&forking_sources(), "main.s", &env).expect("compiles");

    let run = || {
        let mut rt = Runtime::new(&env, Some(42), RuntimeConfig::default());
        rt.place(artifact.clone(), Coord(vec![0]), 1000);
        let mut snapshots = Vec::new();
        for _ in 0..10 {
            rt.tick();
            snapshots.push(rt.snapshot());
        }
        snapshots
    };

    assert_eq!(run(), run(), "two independent runs from the same seed and artifact must match tick-for-tick");
}

#[test]
fn compile_purity_holds_across_runs() {
    let env = env();
    let sources = forking_sources();
    let a = compile(&sources, "main.s", &env).unwrap();
    let b = compile(&sources, "main.s", &env).unwrap();
    assert_eq!(a.program_id, b.program_id);
    assert_eq!(a, b);
}
