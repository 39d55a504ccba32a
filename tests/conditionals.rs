//! Conditional skip-semantics scenarios (§4.3 "Conditionals").

use std::collections::BTreeMap;

use evochora_core::asm::compile;
use evochora_core::{Coord, EnvironmentProperties, Runtime, RuntimeConfig};

fn compile_one(lines: &[&str], env: &EnvironmentProperties) -> evochora_core::ProgramArtifact {
    let mut sources = BTreeMap::new();
    sources.insert("main.s".to_string(), lines.iter().map(|l| l.to_string()).collect());
    compile(&sources, "main.s", env).expect("compiles")
}

fn env() -> EnvironmentProperties {
    EnvironmentProperties { world_shape: vec![64], toroidal: true }
}

#[test]
fn true_condition_falls_through_to_the_next_instruction() {
    let env = env();
    let artifact = compile_one(&["SETI %DR0 DATA:5", "LTI %DR0 DATA:10", "ADDI %DR0 DATA:100"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);
    for _ in 0..3 {
        rt.tick();
    }
    assert_eq!(rt.organism(id).unwrap().dr[0].as_scalar().unwrap().value(), 105);
}

#[test]
fn false_condition_skips_the_next_instruction() {
    let env = env();
    let artifact = compile_one(&["SETI %DR0 DATA:5", "LTI %DR0 DATA:1", "ADDI %DR0 DATA:100"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);
    for _ in 0..2 {
        rt.tick();
    }
    assert_eq!(rt.organism(id).unwrap().dr[0].as_scalar().unwrap().value(), 5, "LTI false must skip ADDI entirely");
}

#[test]
fn negated_form_inverts_the_skip() {
    let env = env();
    // 5 is not less than 1, so INI (negated LTI-like "not equal") passes and falls through.
    let artifact = compile_one(&["SETI %DR0 DATA:5", "INI %DR0 DATA:1", "ADDI %DR0 DATA:100"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);
    for _ in 0..3 {
        rt.tick();
    }
    assert_eq!(rt.organism(id).unwrap().dr[0].as_scalar().unwrap().value(), 105);
}
