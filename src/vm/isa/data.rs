//! Data/memory family: `SETI|SETR|SETV`, `PUSH|POP|PUSI`, `DUP|SWAP|DROP|ROT`.

use super::{decode_register_arg, fault, ok, ExecContext, Opcode};
use crate::coord::Coord;
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    match op {
        Opcode::Seti => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let _ = ctx.organism.set_reg(dst, RegValue::Scalar(ctx.args[1]));
            ok(op)
        }
        Opcode::Setr => {
            let (Some(dst), Some(src)) = (
                decode_register_arg(ctx.args[0]),
                decode_register_arg(ctx.args[1]),
            ) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let value = ctx.organism.reg(src);
            let _ = ctx.organism.set_reg(dst, value);
            ok(op)
        }
        Opcode::Setv => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let vec = Coord(ctx.args[1..].iter().map(|m| m.value()).collect());
            let _ = ctx.organism.set_reg(dst, RegValue::Vector(vec));
            ok(op)
        }
        Opcode::Push => {
            let Some(src) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let value = ctx.organism.reg(src);
            match ctx.organism.ds.push(value) {
                Ok(()) => ok(op),
                Err(reason) => fault(ctx, op, reason),
            }
        }
        Opcode::Pusi => {
            let value = RegValue::Scalar(ctx.args[0]);
            match ctx.organism.ds.push(value) {
                Ok(()) => ok(op),
                Err(reason) => fault(ctx, op, reason),
            }
        }
        Opcode::Pop => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            match ctx.organism.ds.pop() {
                Ok(value) => {
                    let _ = ctx.organism.set_reg(dst, value);
                    ok(op)
                }
                Err(reason) => fault(ctx, op, reason),
            }
        }
        Opcode::Dup => {
            let top = match ctx.organism.ds.peek() {
                Ok(v) => v.clone(),
                Err(reason) => return fault(ctx, op, reason),
            };
            match ctx.organism.ds.push(top) {
                Ok(()) => ok(op),
                Err(reason) => fault(ctx, op, reason),
            }
        }
        Opcode::Swap => {
            let (a, b) = match (ctx.organism.ds.pop(), ctx.organism.ds.pop()) {
                (Ok(a), Ok(b)) => (a, b),
                _ => return fault(ctx, op, InstructionFault::StackUnderflow),
            };
            let _ = ctx.organism.ds.push(a);
            let _ = ctx.organism.ds.push(b);
            ok(op)
        }
        Opcode::Drop => match ctx.organism.ds.pop() {
            Ok(_) => ok(op),
            Err(reason) => fault(ctx, op, reason),
        },
        Opcode::Rot => {
            let (c, b, a) = match (
                ctx.organism.ds.pop(),
                ctx.organism.ds.pop(),
                ctx.organism.ds.pop(),
            ) {
                (Ok(c), Ok(b), Ok(a)) => (c, b, a),
                _ => return fault(ctx, op, InstructionFault::StackUnderflow),
            };
            // a b c -> b c a
            let _ = ctx.organism.ds.push(b);
            let _ = ctx.organism.ds.push(c);
            let _ = ctx.organism.ds.push(a);
            ok(op)
        }
        _ => unreachable!("data::execute called with non-data opcode {op:?}"),
    }
}
