//! Location stack/registers family: vector-typed counterparts of the
//! data-stack ops (`DUPL|SWPL|DRPL|ROTL`), DP save/restore
//! (`PUSL|POPL`), and duplicate/sink transfers between LS, the `LR`
//! bank, and DS (`DPL*|SKL*|L*D*`). The single argument cell these take
//! is an `LR` bank index (0..4), matching this family's name.

use super::{fault, ok, ExecContext, Opcode};
use crate::coord::Coord;
use crate::vm::error::InstructionFault;
use crate::vm::organism::{RegValue, LR_COUNT};

fn lr_index(ctx: &ExecContext) -> usize {
    ctx.args[0].value().rem_euclid(LR_COUNT as i64) as usize
}

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    match op {
        Dupl => {
            let top = match ctx.organism.ls.peek() {
                Ok(v) => v.clone(),
                Err(reason) => return fault(ctx, op, reason),
            };
            if let Err(reason) = ctx.organism.ls.push(top) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Swpl => {
            let a = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let b = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let _ = ctx.organism.ls.push(a);
            let _ = ctx.organism.ls.push(b);
            ok(op)
        }
        Drpl => {
            if let Err(reason) = ctx.organism.ls.pop() {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Rotl => {
            let c = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let b = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let a = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let _ = ctx.organism.ls.push(b);
            let _ = ctx.organism.ls.push(c);
            let _ = ctx.organism.ls.push(a);
            ok(op)
        }
        Pusl => {
            let dp = ctx.organism.active_dp().clone();
            if let Err(reason) = ctx.organism.ls.push(dp) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Popl => {
            let dp = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            ctx.organism.set_active_dp(dp);
            ok(op)
        }
        Dplr => {
            let i = lr_index(ctx);
            let top = match ctx.organism.ls.peek() {
                Ok(v) => v.clone(),
                Err(reason) => return fault(ctx, op, reason),
            };
            ctx.organism.lr[i] = top;
            ok(op)
        }
        Sklr => {
            let i = lr_index(ctx);
            let top = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            ctx.organism.lr[i] = top;
            ok(op)
        }
        Dpls => {
            let i = lr_index(ctx);
            let value = ctx.organism.lr[i].clone();
            if let Err(reason) = ctx.organism.ls.push(value) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Skls => {
            let i = lr_index(ctx);
            let dims = ctx.organism.lr[i].dims();
            let value = std::mem::replace(&mut ctx.organism.lr[i], Coord::zero(dims));
            if let Err(reason) = ctx.organism.ls.push(value) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Lrdr => {
            let i = lr_index(ctx);
            let value = ctx.organism.lr[i].clone();
            if let Err(reason) = ctx.organism.ds.push(RegValue::Vector(value)) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Lrds => {
            let i = lr_index(ctx);
            let dims = ctx.organism.lr[i].dims();
            let value = std::mem::replace(&mut ctx.organism.lr[i], Coord::zero(dims));
            if let Err(reason) = ctx.organism.ds.push(RegValue::Vector(value)) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Lsdr => {
            let i = lr_index(ctx);
            let value = match ctx.organism.ds.pop() {
                Ok(v) => match v {
                    RegValue::Vector(v) => v,
                    RegValue::Scalar(_) => return fault(ctx, op, InstructionFault::WrongRegisterKind),
                },
                Err(reason) => return fault(ctx, op, reason),
            };
            ctx.organism.lr[i] = value;
            ok(op)
        }
        Lsds => {
            let i = lr_index(ctx);
            let value = match ctx.organism.ds.peek() {
                Ok(RegValue::Vector(v)) => v.clone(),
                Ok(RegValue::Scalar(_)) => return fault(ctx, op, InstructionFault::WrongRegisterKind),
                Err(reason) => return fault(ctx, op, reason),
            };
            ctx.organism.lr[i] = value;
            ok(op)
        }
        _ => unreachable!("locstack::execute called with non-location opcode {op:?}"),
    }
}
