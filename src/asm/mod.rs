//! The assembler pipeline (§4.5): a sequence of pure passes from source
//! text to an immutable [`ProgramArtifact`], each consuming the
//! previous pass's output without mutating it. [`compile`] is the
//! pipeline's external entry point (§6 Compiler API).

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod layout;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod resolve;

pub use diagnostics as error;

use std::collections::BTreeMap;

use tracing::debug;

use crate::asm::diagnostics::{Diagnostic, Diagnostics};
use crate::coord::Coord;
use crate::vm::program::{ProgramArtifact, SourceLocation};
use crate::world::EnvironmentProperties;

/// Compiles a source set into an immutable [`ProgramArtifact`] (§6).
///
/// Pure: re-running this on identical `sources`/`entry`/`env` yields a
/// byte-identical artifact, `program_id` included (§4.5, §8 "compile
/// purity"). Any pass raising an [`Diagnostic`] of [`diagnostics::Severity::Error`]
/// aborts the pipeline before codegen and no artifact is returned.
pub fn compile(
    sources: &BTreeMap<String, Vec<String>>,
    entry: &str,
    env: &EnvironmentProperties,
) -> Result<ProgramArtifact, Diagnostics> {
    let mut diagnostics = Diagnostics::default();

    let flat = preprocess::flatten(sources, entry, &mut diagnostics);
    debug!(pass = "preprocess", items = flat.len(), "assembler pass complete");
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let mut stmts = parser::parse(flat, &mut diagnostics);
    debug!(pass = "parse", statements = stmts.len(), "assembler pass complete");
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let decls = resolve::collect_declarations(&stmts);
    resolve::resolve(&mut stmts, &decls, &mut diagnostics);
    debug!(pass = "resolve", labels = decls.labels.len(), aliases = decls.aliases.len(), "assembler pass complete");
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let laid_out = layout::layout(&stmts, env, &decls, &mut diagnostics);
    debug!(pass = "layout", instructions = laid_out.instructions.len(), "assembler pass complete");
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let artifact = codegen::codegen(&laid_out, &decls, sources, &mut diagnostics);
    debug!(pass = "codegen", cells = artifact.machine_code_layout.len(), program_id = %artifact.program_id, "assembler pass complete");

    for coord in artifact.machine_code_layout.keys().chain(artifact.initial_world_objects.keys()) {
        if !coord_within_env(coord, env) {
            diagnostics.push(Diagnostic::error(
                SourceLocation { file: entry.to_string(), line: 0 },
                format!("placement at {coord:?} falls outside the bounded world shape {:?}", env.world_shape),
            ));
        }
    }

    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    Ok(artifact)
}

/// A toroidal world accepts any relative offset (it wraps at placement
/// time); a bounded world requires every emitted coord to already sit
/// inside the shape (§3.4 invariant).
fn coord_within_env(coord: &Coord, env: &EnvironmentProperties) -> bool {
    if env.toroidal {
        return true;
    }
    coord.0.iter().zip(&env.world_shape).all(|(&c, &s)| c >= 0 && c < s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::MoleculeType;
    use crate::vm::organism::RegisterId;

    fn src(lines: &[&str]) -> BTreeMap<String, Vec<String>> {
        let mut m = BTreeMap::new();
        m.insert("main.s".to_string(), lines.iter().map(|l| l.to_string()).collect());
        m
    }

    fn env() -> EnvironmentProperties {
        EnvironmentProperties { world_shape: vec![64], toroidal: true }
    }

    #[test]
    fn compiles_arithmetic_program() {
        let sources = src(&["SETI %DR0 DATA:10", "ADDI %DR0 DATA:5"]);
        let artifact = compile(&sources, "main.s", &env()).expect("compiles");
        assert_eq!(artifact.machine_code_layout.len(), 6);
        assert!(artifact.machine_code_layout.values().any(|m| m.r#type() == MoleculeType::Code));
    }

    #[test]
    fn compile_is_pure() {
        let sources = src(&["SETI %DR0 DATA:10", "ADDI %DR0 DATA:5"]);
        let a = compile(&sources, "main.s", &env()).unwrap();
        let b = compile(&sources, "main.s", &env()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.program_id, b.program_id);
    }

    #[test]
    fn unresolved_symbol_fails_compilation() {
        let sources = src(&["JMPI NOWHERE"]);
        let err = compile(&sources, "main.s", &env()).unwrap_err();
        assert!(err.has_errors());
    }

    #[test]
    fn label_reference_compiles_to_relative_vector() {
        let sources = src(&["JMPI LOOP", "LOOP: NOP"]);
        let artifact = compile(&sources, "main.s", &env()).expect("compiles");
        // JMPI's opcode cell is at coord [0]; its vector argument cell is at [1].
        let arg = artifact.machine_code_layout.get(&Coord(vec![1])).expect("argument cell");
        assert_eq!(arg.value(), 2, "LOOP sits 2 cells after JMPI's opcode cell");
    }

    #[test]
    fn place_range_fills_every_coord_in_the_span() {
        let sources = src(&[".PLACE ENERGY:1 3..5"]);
        let artifact = compile(&sources, "main.s", &env()).expect("compiles");
        for x in 3..=5 {
            assert_eq!(artifact.initial_world_objects.get(&Coord(vec![x])).map(|m| m.value()), Some(1));
        }
        assert_eq!(artifact.initial_world_objects.len(), 3);
    }

    #[test]
    fn place_stepped_range_skips_between_points() {
        let sources = src(&[".PLACE ENERGY:1 0:2:6"]);
        let artifact = compile(&sources, "main.s", &env()).expect("compiles");
        let placed: Vec<i64> = artifact.initial_world_objects.keys().map(|c| c.0[0]).collect();
        assert_eq!(placed, vec![0, 2, 4, 6]);
    }

    #[test]
    fn place_wildcard_spans_the_world_shape() {
        let sources = src(&[".PLACE ENERGY:1 *"]);
        let artifact = compile(&sources, "main.s", &env()).expect("compiles");
        assert_eq!(artifact.initial_world_objects.len(), 64);
    }

    #[test]
    fn spnr_beyond_dimension_limit_is_diagnosed() {
        let sources = src(&["SPNR %DR0"]);
        let env = EnvironmentProperties { world_shape: vec![8; 13], toroidal: true };
        let err = compile(&sources, "main.s", &env).unwrap_err();
        assert!(err.has_errors());
    }

    #[test]
    fn proc_with_with_binding_round_trips_registers() {
        let sources = src(&[
            ".PROC INC WITH A",
            "ADDI %FPR0 DATA:1",
            "RET",
            ".ENDP",
            "SETI %DR3 DATA:5",
            "CALL INC .WITH %DR3",
        ]);
        let artifact = compile(&sources, "main.s", &env()).expect("compiles");
        assert!(artifact
            .call_site_bindings
            .values()
            .any(|b| b == &vec![RegisterId::Dr(3)]));
        assert_eq!(artifact.proc_name_to_param_names.get("INC"), Some(&vec!["A".to_string()]));
    }
}
