//! World-interaction family: `PEEK*`, `SCAN*`, `POKE*`, `SEEK*`. The
//! target cell is always `active_dp + vector`; the vector argument must
//! be a unit vector is NOT required here (any vector works as an
//! offset) — only `B2V*`/`V2B*`/`IFM*`/`TURN` enforce unit vectors.

use super::{decode_register_arg, fault, ok, read_vector, suffix_of, ExecContext, Opcode, WorldWrite};
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    let dims = ctx.world.shape().len();
    match op {
        Peek | Peki | Peks => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("PEEK* always has a suffix");
            let args = ctx.args;
            let vector = match read_vector(ctx, suffix, args, 1, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let target = ctx.world.wrap(&(ctx.organism.active_dp() + &vector));
            let molecule = ctx.world.get(&target);
            let actor = ctx.organism.id;
            let parent = ctx.organism.parent_id;
            let accessible = ctx.world.is_accessible(&target, actor, parent);

            let mut pre_conflict_cost = 0i64;
            match molecule.r#type() {
                MoleculeType::Energy => ctx.organism.er += molecule.value(),
                MoleculeType::Structure => {
                    if !accessible {
                        pre_conflict_cost += molecule.value().abs();
                    }
                }
                MoleculeType::Code | MoleculeType::Data => {
                    if ctx.world.get_owner(&target) != actor {
                        pre_conflict_cost += 5;
                    }
                }
            }

            let _ = ctx.organism.set_reg(dst, RegValue::Scalar(molecule));
            super::Effect {
                pre_conflict_cost,
                base_cost: super::base_cost(op),
                world_write: Some(WorldWrite {
                    coord: target,
                    molecule: Molecule::empty(),
                    owner: 0,
                    consumes: true,
                }),
                fork: None,
            }
        }
        Scan | Scni | Scns => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("SCAN* always has a suffix");
            let args = ctx.args;
            let vector = match read_vector(ctx, suffix, args, 1, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let target = ctx.world.wrap(&(ctx.organism.active_dp() + &vector));
            let molecule = ctx.world.get(&target);
            let _ = ctx.organism.set_reg(dst, RegValue::Scalar(molecule));
            ok(op)
        }
        Poke | Poki | Poks => {
            let value = ctx.args[0];
            let suffix = suffix_of(op).expect("POKE* always has a suffix");
            let args = ctx.args;
            let vector = match read_vector(ctx, suffix, args, 1, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let target = ctx.world.wrap(&(ctx.organism.active_dp() + &vector));
            let extra = match value.r#type() {
                MoleculeType::Energy | MoleculeType::Structure => value.value().abs(),
                MoleculeType::Code | MoleculeType::Data => 5,
            };
            if !ctx.world.get(&target).is_empty() {
                ctx.organism.fail(InstructionFault::PokeTargetOccupied);
                return super::Effect {
                    pre_conflict_cost: extra,
                    base_cost: super::base_cost(op) + ctx.penalty,
                    world_write: None,
                    fork: None,
                };
            }
            let actor = ctx.organism.id;
            super::Effect {
                pre_conflict_cost: extra,
                base_cost: super::base_cost(op),
                world_write: Some(WorldWrite {
                    coord: target,
                    molecule: value,
                    owner: actor,
                    consumes: false,
                }),
                fork: None,
            }
        }
        Seek | Seki | Seks => {
            let suffix = suffix_of(op).expect("SEEK* always has a suffix");
            let args = ctx.args;
            let vector = match read_vector(ctx, suffix, args, 0, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let target = ctx.world.wrap(&(ctx.organism.active_dp() + &vector));
            let actor = ctx.organism.id;
            let parent = ctx.organism.parent_id;
            let passable = ctx.world.get(&target).is_empty() || ctx.world.is_accessible(&target, actor, parent);
            if !passable {
                return fault(ctx, op, InstructionFault::SeekTargetInaccessible);
            }
            ctx.organism.set_active_dp(target);
            ok(op)
        }
        _ => unreachable!("world_ops::execute called with non-world opcode {op:?}"),
    }
}
