//! World-interaction scenarios: `POKE`/`PEEK` round-trip, `SEEK` wrap,
//! and `FORK` cost accounting (§8 "Round-trip/idempotence" and
//! "Boundary behavior").

use std::collections::BTreeMap;

use evochora_core::asm::compile;
use evochora_core::molecule::MoleculeType;
use evochora_core::{Coord, EnvironmentProperties, Runtime, RuntimeConfig};

fn compile_one(lines: &[&str], env: &EnvironmentProperties) -> evochora_core::ProgramArtifact {
    let mut sources = BTreeMap::new();
    sources.insert("main.s".to_string(), lines.iter().map(|l| l.to_string()).collect());
    compile(&sources, "main.s", env).expect("compiles")
}

#[test]
fn poke_then_peek_round_trips_the_value_and_clears_the_cell() {
    let env = EnvironmentProperties { world_shape: vec![64], toroidal: true };
    let artifact = compile_one(&["POKI DATA:42 1", "PEKI %DR0 1"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);

    rt.tick();
    let target = Coord(vec![1]);
    assert_eq!(rt.world().get(&target).value(), 42);
    assert_eq!(rt.world().get(&target).r#type(), MoleculeType::Data);

    rt.tick();
    let dr0 = rt.organism(id).unwrap().dr[0].as_scalar().unwrap();
    assert_eq!(dr0.value(), 42);
    assert!(rt.world().get(&target).is_empty(), "PEEK consumes the cell it reads");
}

#[test]
fn seek_wraps_across_the_toroidal_edge() {
    let env = EnvironmentProperties { world_shape: vec![4], toroidal: true };
    let artifact = compile_one(&["SEKI 3"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);

    rt.tick();
    assert_eq!(rt.organism(id).unwrap().active_dp().clone(), Coord(vec![3]));
}

#[test]
fn fork_debits_exactly_base_cost_plus_child_energy_and_funds_the_child_exactly() {
    let env = EnvironmentProperties { world_shape: vec![64], toroidal: true };
    let artifact = compile_one(&["PUSI DATA:-1", "VBLD", "PUSI DATA:20", "FORK"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);

    for _ in 0..3 {
        rt.tick();
    }
    let before = rt.organism(id).unwrap().er;
    rt.tick();
    let after = rt.organism(id).unwrap().er;

    let fork_base_cost = RuntimeConfig::default().fork_base_cost;
    assert_eq!(before - after, fork_base_cost + 20, "FORK debits the parent exactly fork_base_cost + child_energy");

    let child = rt.organism(2).expect("FORK spawns a second organism");
    assert_eq!(child.er, 20);
    assert_eq!(child.parent_id, id);
}
