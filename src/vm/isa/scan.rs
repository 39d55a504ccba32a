//! Scan family: `SPN*` (passable-neighbor bitmask), `SNT*` (neighbors
//! matching a molecule type).

use super::{decode_register_arg, fault, ok, read_scalar, suffix_of, ExecContext, Opcode};
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    match op {
        Spnr => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let actor = ctx.organism.id;
            let parent = ctx.organism.parent_id;
            let mut mask: i64 = 0;
            for (axis, positive, coord) in ctx.world.neighbors_axis_aligned(ctx.organism.active_dp()) {
                let passable = ctx.world.get(&coord).is_empty() || ctx.world.is_accessible(&coord, actor, parent);
                if passable {
                    let bit = 2 * axis + if positive { 0 } else { 1 };
                    mask |= 1 << bit;
                }
            }
            let _ = ctx
                .organism
                .set_reg(dst, RegValue::Scalar(Molecule::new(MoleculeType::Data, mask)));
            ok(op)
        }
        Sntr | Snti | Snts => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("SNT* always has a suffix");
            let args = ctx.args;
            let type_literal = match read_scalar(ctx, suffix, args, 1) {
                Ok(m) => m,
                Err(reason) => return fault(ctx, op, reason),
            };
            let wanted = type_literal.r#type();
            let mut mask: i64 = 0;
            for (axis, positive, coord) in ctx.world.neighbors_axis_aligned(ctx.organism.active_dp()) {
                if ctx.world.get(&coord).r#type() == wanted {
                    let bit = 2 * axis + if positive { 0 } else { 1 };
                    mask |= 1 << bit;
                }
            }
            let _ = ctx
                .organism
                .set_reg(dst, RegValue::Scalar(Molecule::new(MoleculeType::Data, mask)));
            ok(op)
        }
        _ => unreachable!("scan::execute called with non-scan opcode {op:?}"),
    }
}
