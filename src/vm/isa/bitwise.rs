//! Bitwise family: `AND|OR|XOR|NAND|NOT|SHL|SHR`, plus `ROT*` (bit
//! rotation within `VALUE_BITS`), `PCN*` (popcount), `BSN*` (n-th set
//! bit), `RBI*` (random set bit via the seeded RNG).

use super::{decode_register_arg, fault, ok, read_scalar, suffix_of, ExecContext, Opcode};
use crate::molecule::{Molecule, MoleculeType, VALUE_BITS};
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

fn mask_low_value_bits(v: i64) -> u32 {
    (v as u64 & ((1u64 << VALUE_BITS) - 1)) as u32
}

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    if op == Notr {
        let Some(dst) = decode_register_arg(ctx.args[0]) else {
            return fault(ctx, op, InstructionFault::WrongRegisterKind);
        };
        let Some(a) = ctx.organism.reg(dst).as_scalar() else {
            return fault(ctx, op, InstructionFault::WrongRegisterKind);
        };
        let _ = ctx
            .organism
            .set_reg(dst, RegValue::Scalar(Molecule::new(a.r#type(), !a.value())));
        return ok(op);
    }

    if matches!(op, Pcnr | Pcni | Pcns | Rbir | Rbii | Rbis) {
        return unary_bitscan(ctx, op);
    }

    let Some(dst) = decode_register_arg(ctx.args[0]) else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let Some(a) = ctx.organism.reg(dst).as_scalar() else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let suffix = suffix_of(op).expect("bitwise opcode always has a suffix");
    let args = ctx.args;
    let b = match read_scalar(ctx, suffix, args, 1) {
        Ok(b) => b,
        Err(reason) => return fault(ctx, op, reason),
    };

    match op {
        Andr | Andi | Ands => {
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), a.value() & b.value())),
            );
            ok(op)
        }
        Orr | Ori | Ors => {
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), a.value() | b.value())),
            );
            ok(op)
        }
        Xorr | Xori | Xors => {
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), a.value() ^ b.value())),
            );
            ok(op)
        }
        Nandr | Nandi | Nands => {
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), !(a.value() & b.value()))),
            );
            ok(op)
        }
        Shlr | Shli | Shls => {
            let shift = (b.value().rem_euclid(VALUE_BITS as i64)) as u32;
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), a.value().wrapping_shl(shift))),
            );
            ok(op)
        }
        Shrr | Shri | Shrs => {
            let shift = (b.value().rem_euclid(VALUE_BITS as i64)) as u32;
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), a.value().wrapping_shr(shift))),
            );
            ok(op)
        }
        Rotr | Roti | Rots => {
            let amount = b.value().rem_euclid(VALUE_BITS as i64) as u32;
            let bits = mask_low_value_bits(a.value());
            let rotated = if amount == 0 {
                bits
            } else {
                ((bits << amount) | (bits >> (VALUE_BITS - amount))) & ((1u32 << VALUE_BITS) - 1)
            };
            let _ = ctx.organism.set_reg(
                dst,
                RegValue::Scalar(Molecule::new(a.r#type(), rotated as i64)),
            );
            ok(op)
        }
        Bsnr | Bsni | Bsns => {
            let mask = mask_low_value_bits(a.value());
            let popcount = mask.count_ones() as i64;
            let n = b.value();
            if n == 0 || n.unsigned_abs() as i64 > popcount {
                let _ = ctx.organism.set_reg(dst, RegValue::Scalar(Molecule::new(a.r#type(), 0)));
                return fault(ctx, op, InstructionFault::InvalidBitSelector);
            }
            let bit = nth_set_bit(mask, n);
            let _ = ctx.organism.set_reg(dst, RegValue::Scalar(Molecule::new(a.r#type(), bit as i64)));
            ok(op)
        }
        _ => unreachable!("bitwise::execute called with non-bitwise opcode {op:?}"),
    }
}

/// `PCN*`/`RBI*`: unary (one source mask, no second operand). The `R`/`I`
/// forms read the mask from a dedicated source operand (not the
/// destination register, which is write-only here) and preserve its
/// type; the `S` forms pop the mask and push the result as `DATA`
/// (§4.3 "`PCNS` pushes as `DATA`").
fn unary_bitscan(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    let suffix = suffix_of(op).expect("PCN*/RBI* always has a suffix");

    if suffix == super::Suffix::Stack {
        let mask_m = match ctx.organism.ds.pop() {
            Ok(v) => match v.as_scalar() {
                Some(m) => m,
                None => return fault(ctx, op, InstructionFault::WrongRegisterKind),
            },
            Err(reason) => return fault(ctx, op, reason),
        };
        let result = bitscan_result(ctx, op, mask_m.value());
        return match ctx
            .organism
            .ds
            .push(RegValue::Scalar(Molecule::new(MoleculeType::Data, result)))
        {
            Ok(()) => ok(op),
            Err(reason) => fault(ctx, op, reason),
        };
    }

    let Some(dst) = decode_register_arg(ctx.args[0]) else {
        return fault(ctx, op, InstructionFault::WrongRegisterKind);
    };
    let args = ctx.args;
    let mask_m = match read_scalar(ctx, suffix, args, 1) {
        Ok(m) => m,
        Err(reason) => return fault(ctx, op, reason),
    };
    let result = bitscan_result(ctx, op, mask_m.value());
    let _ = ctx
        .organism
        .set_reg(dst, RegValue::Scalar(Molecule::new(mask_m.r#type(), result)));
    ok(op)
}

fn bitscan_result(ctx: &mut ExecContext, op: Opcode, mask_value: i64) -> i64 {
    use Opcode::*;
    let mask = mask_low_value_bits(mask_value);
    match op {
        Pcnr | Pcni | Pcns => mask.count_ones() as i64,
        Rbir | Rbii | Rbis => ctx.rng.pick_set_bit(mask as i64).unwrap_or(0) as i64,
        _ => unreachable!("bitscan_result called with non-PCN/RBI opcode {op:?}"),
    }
}

/// 1-based n-th set bit of `mask`, LSB-first for positive `n`, MSB-first
/// for negative `n`. Caller has already validated `1 <= |n| <= popcount`.
fn nth_set_bit(mask: u32, n: i64) -> u32 {
    let count = n.unsigned_abs() as u32;
    if n > 0 {
        let mut remaining = count;
        for bit in 0..32 {
            if mask & (1 << bit) != 0 {
                remaining -= 1;
                if remaining == 0 {
                    return bit;
                }
            }
        }
    } else {
        let mut remaining = count;
        for bit in (0..32).rev() {
            if mask & (1 << bit) != 0 {
                remaining -= 1;
                if remaining == 0 {
                    return bit;
                }
            }
        }
    }
    unreachable!("nth_set_bit called with |n| > popcount")
}
