//! Procedure-call scenarios: `CALL`/`RET` identity and copy-out binding
//! (§8 "Invariants": "CALL/RET identity", "Copy-out").

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
fn immediate_ret_leaves_caller_state_unchanged_except_cost_and_ip() {
    let env = env();
    let artifact = compile_one(
        &[
            ".PROC NOOP",
            "RET",
            ".ENDP",
            "SETI %DR0 DATA:5",
            "SETI %PR0 DATA:9",
            "CALL NOOP",
            "ADDI %DR0 DATA:1",
        ],
        &env,
    );
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);

    // SETI DR0, SETI PR0, CALL, RET, ADDI: five instructions.
    for _ in 0..6 {
        rt.tick();
    }

    let organism = rt.organism(id).unwrap();
    assert_eq!(organism.dr[0].as_scalar().unwrap().value(), 6, "ADDI after RET must still run against the caller's own DR0");
    assert_eq!(organism.pr[0].as_scalar().unwrap().value(), 9, "PR must be restored bit-for-bit across CALL/RET");
    assert!(!organism.instruction_failed);
}

#[test]
fn copy_out_reflects_the_callee_s_fpr0_mutation_into_the_bound_caller_register() {
    let env = env();
    let artifact = compile_one(
        &[
            ".PROC INC WITH A",
            "ADDI %FPR0 DATA:1",
            "RET",
            ".ENDP",
            "SETI %DR3 DATA:5",
            "CALL INC .WITH %DR3",
        ],
        &env,
    );
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    let id = rt.place(artifact, Coord(vec![0]), 1000);

    for _ in 0..6 {
        rt.tick();
    }

    let dr3 = rt.organism(id).unwrap().dr[3].as_scalar().unwrap();
    assert_eq!(dr3.value(), 6, "DRi after RET must equal old DRi + 1, type preserved");
    assert_eq!(dr3.r#type(), evochora_core::molecule::MoleculeType::Data);
}

#[test]
fn copy_out_still_works_when_placed_away_from_the_coordinate_origin() {
    let env = env();
    let artifact = compile_one(
        &[
            ".PROC INC WITH A",
            "ADDI %FPR0 DATA:1",
            "RET",
            ".ENDP",
            "SETI %DR3 DATA:5",
            "CALL INC .WITH %DR3",
        ],
        &env,
    );
    let mut rt = Runtime::new(&env, Some(1), RuntimeConfig::default());
    // A nonzero start_coord means every absolute IP the organism ever sees
    // (including the CALL site itself) sits far from the layout's own
    // relative coords. The `.WITH` binding lookup must still translate
    // back to a layout address via the placement origin, not assume the
    // organism starts at coord zero.
    let id = rt.place(artifact, Coord(vec![17]), 1000);

    for _ in 0..6 {
        rt.tick();
    }

    let dr3 = rt.organism(id).unwrap().dr[3].as_scalar().unwrap();
    assert_eq!(dr3.value(), 6, "the .WITH copy-in/copy-out contract must hold regardless of placement coord");
}
