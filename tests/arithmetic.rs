//! Scalar/vector arithmetic and bitmask<->unit-vector round-trip
//! scenarios (§8 "Round-trip/idempotence").

use std::collections::BTreeMap;

use evochora_core::asm::compile;
use evochora_core::{Coord, EnvironmentProperties, Runtime, RuntimeConfig};

fn compile_one(lines: &[&str], env: &EnvironmentProperties) -> evochora_core::ProgramArtifact {
    let mut sources = BTreeMap::new();
    sources.insert("main.s".to_string(), lines.iter().map(|l| l.to_string()).collect());
    compile(&sources, "main.s", env).expect("compiles")
}

fn env_2d() -> EnvironmentProperties {
    EnvironmentProperties { world_shape: vec![32, 32], toroidal: true }
}

#[test]
fn basic_scalar_arithmetic_accumulates_in_order() {
    let env = env_2d();
    let artifact = compile_one(
        &["SETI %DR0 DATA:5", "ADDI %DR0 DATA:3", "SUBI %DR0 DATA:2", "MULI %DR0 DATA:4"],
        &env,
    );
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..4 {
        rt.tick();
    }
    assert_eq!(rt.organism(id).unwrap().dr[0].as_scalar().unwrap().value(), (5 + 3 - 2) * 4);
}

#[test]
fn b2v_then_v2b_recovers_the_original_bitmask() {
    let env = env_2d();
    // mask=2 is bit 1: axis 0, negative direction.
    let artifact = compile_one(&["B2VI %DR0 DATA:2", "V2BR %DR1 %DR0"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..2 {
        rt.tick();
    }
    assert_eq!(rt.organism(id).unwrap().dr[1].as_scalar().unwrap().value(), 2);
}

#[test]
fn v2b_then_b2v_recovers_the_original_unit_vector() {
    let env = env_2d();
    let artifact = compile_one(&["B2VI %DR0 DATA:1", "V2BR %DR1 %DR0", "B2VR %DR2 %DR1"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..3 {
        rt.tick();
    }
    let organism = rt.organism(id).unwrap();
    let original = organism.dr[0].as_vector().unwrap();
    let recovered = organism.dr[2].as_vector().unwrap();
    assert_eq!(original, recovered);
}

#[test]
fn four_applications_of_rtri_return_the_original_vector() {
    let env = env_2d();
    let artifact = compile_one(
        &[
            "B2VI %DR0 DATA:1",
            "RTRI %DR0 DATA:0 DATA:1",
            "RTRI %DR0 DATA:0 DATA:1",
            "RTRI %DR0 DATA:0 DATA:1",
            "RTRI %DR0 DATA:0 DATA:1",
        ],
        &env,
    );
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..5 {
        rt.tick();
    }
    let dr0 = rt.organism(id).unwrap().dr[0].as_vector().unwrap();
    assert_eq!(dr0, &Coord(vec![1, 0]), "a 90-degree rotation applied four times is the identity");
}

#[test]
fn pcni_counts_the_source_operand_not_the_destination_register() {
    let env = env_2d();
    // DR0 starts at a different value than the mask so a regression that
    // reads the count from the (stale) destination register instead of
    // the source operand would be caught.
    let artifact = compile_one(&["SETI %DR0 DATA:99", "PCNI %DR0 DATA:11"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..2 {
        rt.tick();
    }
    assert_eq!(rt.organism(id).unwrap().dr[0].as_scalar().unwrap().value(), 3, "11 = 0b1011 has 3 set bits");
}

#[test]
fn pcns_pops_the_mask_and_pushes_the_popcount_as_data() {
    let env = env_2d();
    let artifact = compile_one(&["PUSI DATA:7", "PCNS", "POP %DR0"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..3 {
        rt.tick();
    }
    let dr0 = rt.organism(id).unwrap().dr[0].as_scalar().unwrap();
    assert_eq!(dr0.value(), 3, "7 = 0b111 has 3 set bits");
    assert_eq!(dr0.r#type(), evochora_core::molecule::MoleculeType::Data);
}

#[test]
fn rbir_picks_a_bit_that_is_actually_set_in_the_source_mask() {
    let env = env_2d();
    // mask=5 (0b101) lives in DR0 (the source operand); DR1 is the
    // destination, seeded with a value that is NOT a subset of the mask
    // so a regression reading from the destination instead of the
    // source would be caught.
    let artifact = compile_one(&["SETI %DR0 DATA:5", "SETI %DR1 DATA:8", "RBIR %DR1 %DR0"], &env);
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0, 0]), 1000);
    for _ in 0..3 {
        rt.tick();
    }
    let picked = rt.organism(id).unwrap().dr[1].as_scalar().unwrap().value();
    assert!(picked == 0 || picked == 2, "RBIR must pick one of the mask's actually-set bits, got {picked}");
}
