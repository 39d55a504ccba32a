//! Vector-component family: `VGT*`/`VST*` (component get/set),
//! `VBLD`/`VBLS` (build/split a vector via the stacks), `B2V*`/`V2B*`
//! (bitmask <-> unit vector), `RTR*` (90-degree rotation in a plane).

use super::{decode_register_arg, fault, ok, read_scalar, read_vector, suffix_of, ExecContext, Opcode};
use crate::coord::Coord;
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::error::InstructionFault;
use crate::vm::organism::RegValue;

fn vec_reg(ctx: &mut ExecContext, id: crate::vm::organism::RegisterId) -> Result<Coord, InstructionFault> {
    ctx.organism
        .reg(id)
        .as_vector()
        .cloned()
        .ok_or(InstructionFault::WrongRegisterKind)
}

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode) -> super::Effect {
    use Opcode::*;
    match op {
        Vgtr | Vgti | Vgts => {
            let (Some(dst), Some(vec_id)) = (
                decode_register_arg(ctx.args[0]),
                decode_register_arg(ctx.args[1]),
            ) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let vec = match vec_reg(ctx, vec_id) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let suffix = suffix_of(op).expect("VGT* always has a suffix");
            let args = ctx.args;
            let idx_m = match read_scalar(ctx, suffix, args, 2) {
                Ok(m) => m,
                Err(reason) => return fault(ctx, op, reason),
            };
            let dims = vec.dims() as i64;
            let idx = idx_m.value().rem_euclid(dims.max(1)) as usize;
            let component = vec.0.get(idx).copied().unwrap_or(0);
            let _ = ctx
                .organism
                .set_reg(dst, RegValue::Scalar(Molecule::new(MoleculeType::Data, component)));
            ok(op)
        }
        Vstr | Vsti | Vsts => {
            let (Some(vec_id), Some(src)) = (
                decode_register_arg(ctx.args[0]),
                decode_register_arg(ctx.args[1]),
            ) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let mut vec = match vec_reg(ctx, vec_id) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let Some(value) = ctx.organism.reg(src).as_scalar() else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("VST* always has a suffix");
            let args = ctx.args;
            let idx_m = match read_scalar(ctx, suffix, args, 2) {
                Ok(m) => m,
                Err(reason) => return fault(ctx, op, reason),
            };
            let dims = vec.dims() as i64;
            let idx = idx_m.value().rem_euclid(dims.max(1)) as usize;
            if idx < vec.0.len() {
                vec.0[idx] = value.value();
            }
            let _ = ctx.organism.set_reg(vec_id, RegValue::Vector(vec));
            ok(op)
        }
        Vbld => {
            let dims = ctx.world.shape().len();
            let mut components = Vec::with_capacity(dims);
            for _ in 0..dims {
                match ctx.organism.ds.pop() {
                    Ok(v) => match v.as_scalar() {
                        Some(m) => components.push(m.value()),
                        None => return fault(ctx, op, InstructionFault::WrongRegisterKind),
                    },
                    Err(reason) => return fault(ctx, op, reason),
                }
            }
            components.reverse();
            if let Err(reason) = ctx.organism.ls.push(Coord(components)) {
                return fault(ctx, op, reason);
            }
            ok(op)
        }
        Vbls => {
            let vec = match ctx.organism.ls.pop() {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            for component in vec.0 {
                if let Err(reason) = ctx
                    .organism
                    .ds
                    .push(RegValue::Scalar(Molecule::new(MoleculeType::Data, component)))
                {
                    return fault(ctx, op, reason);
                }
            }
            ok(op)
        }
        B2vr | B2vi | B2vs => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let suffix = suffix_of(op).expect("B2V* always has a suffix");
            let args = ctx.args;
            let mask_m = match read_scalar(ctx, suffix, args, 1) {
                Ok(m) => m,
                Err(reason) => return fault(ctx, op, reason),
            };
            let mask = mask_m.value();
            if mask <= 0 || (mask & (mask - 1)) != 0 {
                return fault(ctx, op, InstructionFault::NotAUnitVector);
            }
            let bit = mask.trailing_zeros() as usize;
            let axis = bit / 2;
            let positive = bit % 2 == 0;
            let dims = ctx.world.shape().len();
            if axis >= dims {
                return fault(ctx, op, InstructionFault::NotAUnitVector);
            }
            let vec = Coord::unit(dims, axis, positive);
            let _ = ctx.organism.set_reg(dst, RegValue::Vector(vec));
            ok(op)
        }
        V2br | V2bi | V2bs => {
            let Some(dst) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let dims = ctx.world.shape().len();
            let suffix = suffix_of(op).expect("V2B* always has a suffix");
            let args = ctx.args;
            let vec = match read_vector(ctx, suffix, args, 1, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            if !vec.is_unit() {
                return fault(ctx, op, InstructionFault::NotAUnitVector);
            }
            let (axis, positive) = vec.unit_axis();
            let bit = 2 * axis + if positive { 0 } else { 1 };
            let mask = 1i64 << bit;
            let _ = ctx
                .organism
                .set_reg(dst, RegValue::Scalar(Molecule::new(MoleculeType::Data, mask)));
            ok(op)
        }
        Rtrr | Rtri | Rtrs => {
            let Some(vec_id) = decode_register_arg(ctx.args[0]) else {
                return fault(ctx, op, InstructionFault::WrongRegisterKind);
            };
            let mut vec = match vec_reg(ctx, vec_id) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let suffix = suffix_of(op).expect("RTR* always has a suffix");
            let scalar_cells = suffix.scalar_arity();
            let args = ctx.args;
            let (i, j) = match suffix {
                crate::vm::isa::Suffix::Stack => {
                    let i = match ctx.organism.ds.pop() {
                        Ok(v) => v.as_scalar().map(|m| m.value()),
                        Err(reason) => return fault(ctx, op, reason),
                    };
                    let j = match ctx.organism.ds.pop() {
                        Ok(v) => v.as_scalar().map(|m| m.value()),
                        Err(reason) => return fault(ctx, op, reason),
                    };
                    match (i, j) {
                        (Some(i), Some(j)) => (i, j),
                        _ => return fault(ctx, op, InstructionFault::WrongRegisterKind),
                    }
                }
                _ => {
                    let i = match read_scalar(ctx, suffix, args, 1) {
                        Ok(m) => m.value(),
                        Err(reason) => return fault(ctx, op, reason),
                    };
                    let j = match read_scalar(ctx, suffix, args, 1 + scalar_cells) {
                        Ok(m) => m.value(),
                        Err(reason) => return fault(ctx, op, reason),
                    };
                    (i, j)
                }
            };
            let dims = vec.dims() as i64;
            if i == j || i < 0 || j < 0 || i >= dims || j >= dims {
                return fault(ctx, op, InstructionFault::InvalidRotationAxes);
            }
            let (i, j) = (i as usize, j as usize);
            let (vi, vj) = (vec.0[i], vec.0[j]);
            vec.0[i] = vj;
            vec.0[j] = -vi;
            let _ = ctx.organism.set_reg(vec_id, RegValue::Vector(vec));
            ok(op)
        }
        _ => unreachable!("vector::execute called with non-vector opcode {op:?}"),
    }
}
