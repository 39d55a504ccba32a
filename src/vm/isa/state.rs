//! State/location family: `SYNC|TURN|POS|DIFF|NRG|RAND*|FORK|ADP*`.
//!
//! `POS`/`DIFF`/`NRG` have no destination register argument, so their
//! result is pushed onto the matching stack (vectors onto LS, scalars
//! onto DS) rather than written to a register.

use super::{decode_register_arg, fault, ok, read_scalar, ExecContext, ForkRequest, Opcode};
use crate::coord::Coord;
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    match op {
        Sync => {
            let ip = ctx.organism.ip_before_fetch.clone();
            ctx.organism.set_active_dp(ip);
            ok(op)
        }
        Turn => {
            let dims = ctx.world.shape().len();
            let vector = Coord(ctx.args[..dims].iter().map(|m| m.value()).collect());
            if !vector.is_unit() {
                return fault(ctx, op, InstructionFault::NotAUnitVector);
            }
            ctx.organism.dv = vector;
            ok(op)
        }
        Pos => {
            let pos = ctx.organism.pos();
            if let Err(reason) = ctx.organism.ls.push(pos) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Diff => {
            let diff = ctx.organism.active_dp() - &ctx.organism.ip_before_fetch;
            if let Err(reason) = ctx.organism.ls.push(diff) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Nrg => {
            let er = ctx.organism.er;
            let value = RegValue::Scalar(Molecule::new(MoleculeType::Energy, er));
            if let Err(reason) = ctx.organism.ds.push(value) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Randr | Randi | Rands => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = super::suffix_of(op).expect("RAND* always has a suffix");
            let args = ctx.args;
            let bound = match read_scalar(ctx, suffix, args, 1) {
                Ok(m) => m,
                Err(reason) => return fault(ctx, op, reason),
            };
            let value = ctx.rng.uniform(bound.value());
            let _ = ctx
                .organism
                .set_reg(dst, RegValue::Scalar(Molecule::new(bound.r#type(), value)));
            ok(op)
        }
        Fork => {
            let child_dv = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            if !child_dv.is_unit() {
                return fault(ctx, op, InstructionFault::NotAUnitVector);
            }
            let child_energy = match ctx.organism.ds.pop() {
                Ok(v) => match v.as_scalar() {
                    Some(m) => m.value(),
                    None => return fault(ctx, op, InstructionFault::WrongRegisterKind),
                },
                Err(reason) => return fault(ctx, op, reason),
            };
            let cost = ctx.fork_base_cost + child_energy;
            if ctx.organism.er < cost {
                return fault(ctx, op, InstructionFault::InsufficientEnergyForFork);
            }
            let child_ip = ctx.world.wrap(&(ctx.organism.active_dp() + &child_dv));
            if !ctx.world.get(&child_ip).is_empty() {
                return fault(ctx, op, InstructionFault::ForkTargetOccupied);
            }
            ctx.organism.er -= cost;
            super::Effect {
                // The flat per-instruction cost is folded into `cost` above;
                // debiting `base_cost(op)` on top would make FORK cost
                // `fork_base_cost + child_energy + 1` instead of exactly
                // `fork_base_cost + child_energy` (§8 boundary behavior).
                base_cost: 0,
                fork: Some(ForkRequest {
                    child_energy,
                    child_ip,
                    child_dv,
                }),
                ..Default::default()
            }
        }
        Adpr | Adpi | Adps => {
            let suffix = super::suffix_of(op).expect("ADP* always has a suffix");
            let args = ctx.args;
            let idx_m = match read_scalar(ctx, suffix, args, 0) {
                Ok(m) => m,
                Err(reason) => return fault(ctx, op, reason),
            };
            let idx = idx_m.value();
            if idx < 0 || idx as usize >= ctx.organism.dps.len() {
                return fault(ctx, op, InstructionFault::InvalidActiveDpIndex);
            }
            ctx.organism.active_dp_index = idx as usize;
            ok(op)
        }
        _ => unreachable!("state::execute called with non-state opcode {op:?}"),
    }
}
