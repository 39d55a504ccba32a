//! Codegen pass (§4.5 pass 8): resolves label references to
//! position-independent relative vectors, emits the opcode + operand
//! cells for every instruction along its `.DIR`, and assembles the
//! final immutable [`ProgramArtifact`].

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::asm::ast::Operand;
use crate::asm::diagnostics::{Diagnostic, Diagnostics};
use crate::asm::layout::{LaidOutInstruction, Layout};
use crate::asm::resolve::Declarations;
use crate::coord::Coord;
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::isa;
use crate::vm::program::ProgramArtifact;

pub fn codegen(
    layout: &Layout,
    decls: &Declarations,
    sources: &BTreeMap<String, Vec<String>>,
    diagnostics: &mut Diagnostics,
) -> ProgramArtifact {
    let mut machine_code_layout = BTreeMap::new();
    let mut call_site_bindings = BTreeMap::new();
    let mut linear_address_to_coord = BTreeMap::new();
    let mut source_map = BTreeMap::new();
    let mut label_address_to_name = BTreeMap::new();

    for (name, addr) in &layout.label_address {
        label_address_to_name.insert(*addr, name.clone());
    }

    for instr in &layout.instructions {
        linear_address_to_coord.insert(instr.address, instr.coord.clone());
        source_map.insert(instr.address, instr.loc.clone());

        let mut cells = vec![Molecule::new(MoleculeType::Code, i64::from(instr.op.id()))];
        cells.extend(encode_operands(instr, layout, diagnostics));

        let mut cursor = instr.coord.clone();
        for cell in cells {
            if machine_code_layout.insert(cursor.clone(), cell).is_some() {
                diagnostics.push(Diagnostic::error(instr.loc.clone(), "instruction cells overlap a previous instruction"));
            }
            cursor = &cursor + &instr.dir;
        }

        if instr.op == isa::Opcode::Call {
            call_site_bindings.insert(instr.address, instr.with_bindings.clone());
        }
    }

    let initial_world_objects = layout.initial_world_objects.clone();
    let program_id = compute_program_id(&machine_code_layout, &initial_world_objects, sources);

    ProgramArtifact {
        program_id,
        sources: sources.clone(),
        machine_code_layout,
        initial_world_objects,
        label_address_to_name,
        register_alias_map: decls.aliases.clone(),
        proc_name_to_param_names: decls.proc_params.clone(),
        call_site_bindings,
        linear_address_to_coord,
        source_map,
    }
}

/// Encodes one instruction's operands into argument cells. A
/// [`Operand::LabelRef`] becomes a relative vector from this
/// instruction's coord to the label's coord (§4.5 pass 8) — this is
/// what keeps the emitted code position-independent.
fn encode_operands(instr: &LaidOutInstruction, layout: &Layout, diagnostics: &mut Diagnostics) -> Vec<Molecule> {
    let mut cells = Vec::new();
    for operand in &instr.operands {
        match operand {
            Operand::Register(r) => cells.push(Molecule::new(MoleculeType::Data, isa::register_arg_value(*r))),
            Operand::Scalar(m) => cells.push(*m),
            Operand::Vector(v) => cells.extend(v.iter().map(|&c| Molecule::new(MoleculeType::Data, c))),
            Operand::LabelRef(name) => match layout.label_coord.get(name) {
                Some(target) => {
                    let rel = target - &instr.coord;
                    cells.extend(rel.0.iter().map(|&c| Molecule::new(MoleculeType::Data, c)));
                }
                None => diagnostics.push(Diagnostic::error(instr.loc.clone(), format!("undefined label `{name}`"))),
            },
            Operand::Ident(name) => {
                diagnostics.push(Diagnostic::error(instr.loc.clone(), format!("unresolved identifier `{name}`")));
            }
        }
    }
    cells
}

/// Content hash of everything that determines program behavior, so
/// that re-running `compile()` on identical sources/`EnvironmentProperties`
/// yields a byte-identical `program_id` (§4.5 invariant, §8 "compile purity").
fn compute_program_id(
    machine_code_layout: &BTreeMap<Coord, Molecule>,
    initial_world_objects: &BTreeMap<Coord, Molecule>,
    sources: &BTreeMap<String, Vec<String>>,
) -> String {
    let mut hasher = DefaultHasher::new();
    for (coord, molecule) in machine_code_layout {
        coord.0.hash(&mut hasher);
        molecule.to_int().hash(&mut hasher);
    }
    "code".hash(&mut hasher);
    for (coord, molecule) in initial_world_objects {
        coord.0.hash(&mut hasher);
        molecule.to_int().hash(&mut hasher);
    }
    "data".hash(&mut hasher);
    for (path, lines) in sources {
        path.hash(&mut hasher);
        lines.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}
