//! Arithmetic family: `ADD|SUB|MUL|DIV|MOD` (scalar) and `DOT|CRS` (vector
//! operands, scalar result; `CRS` is defined only for 2-D worlds).
//!
//! Vector component-wise `ADD`/`SUB` are not modeled here: an opcode's
//! arity must be derivable statically (the conditional-skip mechanism
//! depends on it), so a family whose arity would depend on whatever
//! kind of value happens to sit in a register at runtime can't exist
//! as a single opcode. Component-wise vector arithmetic is expressed
//! with `VGT*`/`VST*` plus these scalar ops instead.

use super::{decode_register_arg, fault, ok, read_scalar, read_vector, suffix_of, ExecContext, Opcode};
use crate::molecule::Molecule;
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

fn scalar_binop(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    let Some(dst) = decode_register_arg(ctx.args[0]) else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let Some(a) = ctx.organism.reg(dst).as_scalar() else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let suffix = suffix_of(op).expect("arithmetic opcode always has a suffix");
    let args = ctx.args;
    let b = match read_scalar(ctx, suffix, args, 1) {
        Ok(b) => b,
        Err(reason) => return fault(ctx, op, reason),
    };

    use Opcode::*;
    let result = match op {
        Addr | Addi | Adds => a.value().wrapping_add(b.value()),
        Subr | Subi | Subs => a.value().wrapping_sub(b.value()),
        Mulr | Muli | Muls => a.value().wrapping_mul(b.value()),
        Divr | Divi | Divs => {
            if b.value() == 0 {
                return fault(ctx, op, InstructionFault::DivisionByZero);
            }
            a.value().wrapping_div(b.value())
        }
        Modr | Modi | Mods => {
            if b.value() == 0 {
                return fault(ctx, op, InstructionFault::DivisionByZero);
            }
            a.value().wrapping_rem(b.value())
        }
        _ => unreachable!("scalar_binop called with non-scalar-arithmetic opcode {op:?}"),
    };

    let _ = ctx
        .organism
        .set_reg(dst, RegValue::Scalar(Molecule::new(a.r#type(), result)));
    ok(op)
}

fn vector_binop(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    let dims = ctx.world.shape().len();
    let Some(dst) = decode_register_arg(ctx.args[0]) else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let Some(a) = ctx.organism.reg(dst).as_vector().cloned() else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let suffix = suffix_of(op).expect("vector-arithmetic opcode always has a suffix");
    let args = ctx.args;
    let b = match read_vector(ctx, suffix, args, 1, dims) {
        Ok(b) => b,
        Err(reason) => return fault(ctx, op, reason),
    };

    use Opcode::*;
    let result = match op {
        Dotr | Doti | Dots => a.0.iter().zip(&b.0).map(|(x, y)| x * y).sum::<i64>(),
        Crsr | Crsi | Crss => {
            if dims != 2 {
                return fault(ctx, op, InstructionFault::InvalidVectorArity);
            }
            a.0[0] * b.0[1] - a.0[1] * b.0[0]
        }
        _ => unreachable!("vector_binop called with non-vector-arithmetic opcode {op:?}"),
    };

    let _ = ctx
        .organism
        .set_reg(dst, RegValue::Scalar(Molecule::new(crate::molecule::MoleculeType::Data, result)));
    ok(op)
}

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    match op {
        Addr | Addi | Adds | Subr | Subi | Subs | Mulr | Muli | Muls | Divr | Divi | Divs
        | Modr | Modi | Mods => scalar_binop(ctx, op),
        Dotr | Doti | Dots | Crsr | Crsi | Crss => vector_binop(ctx, op),
        _ => unreachable!("arith::execute called with non-arithmetic opcode {op:?}"),
    }
}
