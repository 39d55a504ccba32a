//! Conditional family: `IF*|LT*|GT*|IFT*|IFM*` and their negated forms
//! `IN*|LET*|GET*|INT*|INM*`. A false test (true for the negated forms)
//! skips the instruction that follows, by re-deriving its length from
//! the opcode table rather than re-executing it.

use super::{arity, decode, decode_register_arg, fault, ok, read_scalar, read_vector, suffix_of, ExecContext, Opcode};
use crate::vm::error::InstructionFault;

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode, dims: usize) -> super::Effect {
    use Opcode::*;

    let passes = match op {
        Ifr | Ifi | Ifs | Inr | Ini | Ins => {
            let Some(a_id) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let Some(a) = ctx.organism.reg(a_id).as_scalar() else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("IF*/IN* always has a suffix");
            let args = ctx.args;
            let b = match read_scalar(ctx, suffix, args, 1) {
                Ok(b) => b,
                Err(reason) => return fault(ctx, op, reason),
            };
            let equal = a.r#type() == b.r#type() && a.value() == b.value();
            if matches!(op, Inr | Ini | Ins) { !equal } else { equal }
        }
        Ltr | Lti | Lts | Letr | Leti | Lets => {
            let Some(a_id) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let Some(a) = ctx.organism.reg(a_id).as_scalar() else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("LT*/LET* always has a suffix");
            let args = ctx.args;
            let b = match read_scalar(ctx, suffix, args, 1) {
                Ok(b) => b,
                Err(reason) => return fault(ctx, op, reason),
            };
            let less = a.value() < b.value();
            if matches!(op, Letr | Leti | Lets) { !less } else { less }
        }
        Gtr | Gti | Gts | Getr | Geti | Gets => {
            let Some(a_id) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let Some(a) = ctx.organism.reg(a_id).as_scalar() else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("GT*/GET* always has a suffix");
            let args = ctx.args;
            let b = match read_scalar(ctx, suffix, args, 1) {
                Ok(b) => b,
                Err(reason) => return fault(ctx, op, reason),
            };
            let greater = a.value() > b.value();
            if matches!(op, Getr | Geti | Gets) { !greater } else { greater }
        }
        Iftr | Ifti | Ifts | Intr | Inti | Ints => {
            let Some(a_id) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let Some(a) = ctx.organism.reg(a_id).as_scalar() else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("IFT*/INT* always has a suffix");
            let args = ctx.args;
            let b = match read_scalar(ctx, suffix, args, 1) {
                Ok(b) => b,
                Err(reason) => return fault(ctx, op, reason),
            };
            let same_type = a.r#type() == b.r#type();
            if matches!(op, Intr | Inti | Ints) { !same_type } else { same_type }
        }
        Ifmr | Ifmi | Ifms | Inmr | Inmi | Inms => {
            let suffix = suffix_of(op).expect("IFM*/INM* always has a suffix");
            let args = ctx.args;
            let vector = match read_vector(ctx, suffix, args, 0, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            if !vector.is_unit() {
                return fault(ctx, op, InstructionFault::NotAUnitVector);
            }
            let target = ctx.world.wrap(&(ctx.organism.active_dp() + &vector));
            let actor = ctx.organism.id;
            let parent = ctx.organism.parent_id;
            let passable = ctx.world.get(&target).is_empty() || ctx.world.is_accessible(&target, actor, parent);
            if matches!(op, Inmr | Inmi | Inms) { !passable } else { passable }
        }
        _ => unreachable!("cond::execute called with non-conditional opcode {op:?}"),
    };

    if passes {
        return ok(op);
    }

    let this_len = 1 + arity(op, dims) as i64;
    let next_ip = ctx
        .world
        .wrap(&(&ctx.organism.ip_before_fetch + &ctx.organism.dv_before_fetch.scaled(this_len)));
    let next_op = decode(ctx.world.get(&next_ip));
    let skip_len = 1 + next_op.map(|o| arity(o, dims)).unwrap_or(0) as i64;
    let target = ctx.world.wrap(&(&next_ip + &ctx.organism.dv_before_fetch.scaled(skip_len)));

    ctx.organism.ip = target;
    ctx.organism.skip_ip_advance = true;
    ok(op)
}
