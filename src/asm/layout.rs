//! Layout pass (§4.5 pass 7) and the call-binding pass (pass 6): walks
//! the resolved statement stream, assigns each instruction a relative
//! coordinate and a linear address along the live `.DIR` vector
//! starting at the live `.ORG`, and records every label's position.

use std::collections::BTreeMap;

use crate::asm::ast::{Operand, PlaceAxis, Stmt};
use crate::asm::diagnostics::{Diagnostic, Diagnostics};
use crate::asm::resolve::Declarations;
use crate::coord::Coord;
use crate::molecule::{Molecule, VALUE_BITS};
use crate::vm::isa::{self, Opcode};
use crate::vm::organism::RegisterId;
use crate::vm::program::SourceLocation;
use crate::world::EnvironmentProperties;

pub struct LaidOutInstruction {
    pub address: i64,
    pub coord: Coord,
    pub dir: Coord,
    pub op: Opcode,
    pub operands: Vec<Operand>,
    pub with_bindings: Vec<RegisterId>,
    pub proc_name: String,
    pub loc: SourceLocation,
}

pub struct Layout {
    pub instructions: Vec<LaidOutInstruction>,
    pub label_coord: BTreeMap<String, Coord>,
    pub label_address: BTreeMap<String, i64>,
    pub initial_world_objects: BTreeMap<Coord, Molecule>,
}

/// Expands a `.PLACE` axis list into the cartesian product of concrete
/// relative coords (§4.5 pass 7). `Wildcard` spans the full extent of
/// the world's shape on that axis.
fn expand_place_axes(axes: &[PlaceAxis], env: &EnvironmentProperties, loc: &SourceLocation, diagnostics: &mut Diagnostics) -> Option<Vec<Coord>> {
    let mut per_axis: Vec<Vec<i64>> = Vec::with_capacity(axes.len());
    for (i, axis) in axes.iter().enumerate() {
        let values = match *axis {
            PlaceAxis::Single(v) => vec![v],
            PlaceAxis::Range(a, b) => {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                (lo..=hi).collect()
            }
            PlaceAxis::Stepped(a, s, b) => {
                if s == 0 {
                    diagnostics.push(Diagnostic::error(loc.clone(), "`.PLACE` stepped range needs a nonzero step"));
                    return None;
                }
                let mut values = Vec::new();
                let mut cur = a;
                while (s > 0 && cur <= b) || (s < 0 && cur >= b) {
                    values.push(cur);
                    cur += s;
                }
                values
            }
            PlaceAxis::Wildcard => {
                let Some(&extent) = env.world_shape.get(i) else {
                    diagnostics.push(Diagnostic::error(loc.clone(), "`.PLACE` wildcard has no matching world axis"));
                    return None;
                };
                (0..extent).collect()
            }
        };
        per_axis.push(values);
    }

    let mut coords = vec![Vec::new()];
    for values in per_axis {
        let mut next = Vec::with_capacity(coords.len() * values.len());
        for prefix in &coords {
            for &v in &values {
                let mut c = prefix.clone();
                c.push(v);
                next.push(c);
            }
        }
        coords = next;
    }
    Some(coords.into_iter().map(Coord).collect())
}

pub fn layout(stmts: &[Stmt], env: &EnvironmentProperties, decls: &Declarations, diagnostics: &mut Diagnostics) -> Layout {
    let dims = env.dims();
    let mut cur_org = Coord::zero(dims);
    let mut cur_dir = Coord::unit(dims, 0, true);
    let mut dir_stack = Vec::new();
    let mut org_stack: Vec<Coord> = Vec::new();

    let mut address_counter: i64 = 0;
    let mut instructions = Vec::new();
    let mut label_coord = BTreeMap::new();
    let mut label_address = BTreeMap::new();
    let mut initial_world_objects = BTreeMap::new();
    let mut current_proc = String::new();

    for stmt in stmts {
        match stmt {
            Stmt::Org(v, loc) => {
                let target = Coord(v.clone());
                if target.dims() != dims {
                    diagnostics.push(Diagnostic::error(loc.clone(), "`.ORG` vector has the wrong dimensionality"));
                    continue;
                }
                cur_org = match org_stack.last() {
                    Some(base) => base + &target,
                    None => target,
                };
            }
            Stmt::Dir(v, loc) => {
                let dir = Coord(v.clone());
                if dir.dims() != dims || !dir.is_unit() {
                    diagnostics.push(Diagnostic::error(loc.clone(), "`.DIR` must be a unit vector of the world's dimensionality"));
                    continue;
                }
                cur_dir = dir;
            }
            Stmt::IncludeBegin => {
                org_stack.push(cur_org.clone());
                dir_stack.push(cur_dir.clone());
            }
            Stmt::IncludeEnd => {
                org_stack.pop();
                if let Some(dir) = dir_stack.pop() {
                    cur_dir = dir;
                }
            }
            Stmt::Label(name, _loc) => {
                if label_coord.insert(name.clone(), cur_org.clone()).is_some() {
                    diagnostics.push(Diagnostic::error(_loc.clone(), format!("duplicate label `{name}`")));
                }
                label_address.insert(name.clone(), address_counter);
            }
            Stmt::Proc { name, loc, .. } => {
                if label_coord.insert(name.clone(), cur_org.clone()).is_some() {
                    diagnostics.push(Diagnostic::error(loc.clone(), format!("duplicate label `{name}`")));
                }
                label_address.insert(name.clone(), address_counter);
                current_proc = name.clone();
            }
            Stmt::EndProc => current_proc.clear(),
            Stmt::Place { molecule, axes, loc } => {
                if axes.len() != dims {
                    diagnostics.push(Diagnostic::error(loc.clone(), "`.PLACE` coord has the wrong dimensionality"));
                    continue;
                }
                match expand_place_axes(axes, env, loc, diagnostics) {
                    Some(coords) => {
                        for rel in coords {
                            let absolute = &cur_org + &rel;
                            if initial_world_objects.insert(absolute, *molecule).is_some() {
                                diagnostics.push(Diagnostic::error(loc.clone(), "`.PLACE` collides with a previous placement"));
                            }
                        }
                    }
                    None => continue,
                }
            }
            Stmt::Require(name, loc) => {
                if !decls.labels.contains(name) && !decls.aliases.contains_key(name) {
                    diagnostics.push(Diagnostic::error(loc.clone(), format!("`.REQUIRE {name}` is unreachable")));
                }
            }
            Stmt::Instruction(instr) => {
                let Some(op) = Opcode::from_mnemonic(&instr.mnemonic) else {
                    diagnostics.push(Diagnostic::error(instr.loc.clone(), format!("unknown opcode `{}`", instr.mnemonic)));
                    continue;
                };
                if matches!(op, Opcode::Spnr | Opcode::Sntr | Opcode::Snti | Opcode::Snts)
                    && dims > (VALUE_BITS / 2) as usize
                {
                    diagnostics.push(Diagnostic::error(
                        instr.loc.clone(),
                        format!(
                            "`{}` needs a bitmask bit per neighbor (2 per axis) and only fits {} dimensions in a {VALUE_BITS}-bit value",
                            instr.mnemonic,
                            VALUE_BITS / 2
                        ),
                    ));
                }

                let declared_arity = isa::arity(op, dims);
                let operand_cells: usize = instr.operands.iter().map(|o| o.cell_count(dims)).sum();
                if operand_cells != declared_arity {
                    diagnostics.push(Diagnostic::error(
                        instr.loc.clone(),
                        format!(
                            "`{}` takes {declared_arity} argument cell(s), found {operand_cells}",
                            instr.mnemonic
                        ),
                    ));
                }

                let mut with_bindings = Vec::with_capacity(instr.with_bindings.len());
                for binding in &instr.with_bindings {
                    match binding {
                        Operand::Register(r) => with_bindings.push(*r),
                        _ => diagnostics.push(Diagnostic::error(instr.loc.clone(), "`.WITH` bindings must be registers")),
                    }
                }
                if op == Opcode::Call {
                    if let Some(Operand::LabelRef(target)) = instr.operands.first() {
                        if let Some(expected) = decls.proc_params.get(target) {
                            if expected.len() != with_bindings.len() {
                                diagnostics.push(Diagnostic::error(
                                    instr.loc.clone(),
                                    format!(
                                        "`CALL {target}` passes {} argument(s), procedure declares {}",
                                        with_bindings.len(),
                                        expected.len()
                                    ),
                                ));
                            }
                        }
                    }
                }

                instructions.push(LaidOutInstruction {
                    address: address_counter,
                    coord: cur_org.clone(),
                    dir: cur_dir.clone(),
                    op,
                    operands: instr.operands.clone(),
                    with_bindings,
                    proc_name: current_proc.clone(),
                    loc: instr.loc.clone(),
                });

                address_counter += 1;
                cur_org = &cur_org + &cur_dir.scaled(1 + declared_arity as i64);
            }
            Stmt::RegAlias(..) | Stmt::Scope(_) | Stmt::EndScope => {}
        }
    }

    Layout {
        instructions,
        label_coord,
        label_address,
        initial_world_objects,
    }
}
