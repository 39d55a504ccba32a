//! Control-flow family: `JMPI|JMPR|JMPS`, `CALL`/`RET`.
//!
//! Label and call targets are compiled as position-independent relative
//! vectors (§4.5 codegen pass), so at runtime a jump is just "current
//! instruction's coord + vector", wrapped by the world's topology.

use super::{arity, fault, ok, read_vector, suffix_of, ExecContext, Opcode};
use crate::vm::error::InstructionFault;
use crate::vm::organism::CallFrame;
use crate::vm::program::ProgramArtifact;

pub(crate) fn execute(ctx: &mut ExecContext, op: Opcode, artifact: &ProgramArtifact) -> super::Effect {
    use Opcode::*;
    match op {
        Jmpi | Jmpr | Jmps => {
            let dims = ctx.world.shape().len();
            let suffix = suffix_of(op).expect("JMP* always has a suffix");
            let args = ctx.args;
            let vector = match read_vector(ctx, suffix, args, 0, dims) {
                Ok(v) => v,
                Err(reason) => return fault(ctx, op, reason),
            };
            let target = ctx.world.wrap(&(&ctx.organism.ip_before_fetch + &vector));
            ctx.organism.ip = target;
            ctx.organism.skip_ip_advance = true;
            ok(op)
        }
        Call => {
            let dims = ctx.world.shape().len();
            let vector = crate::coord::Coord(ctx.args.iter().map(|m| m.value()).collect());
            debug_assert_eq!(vector.dims(), dims);
            let target = ctx.world.wrap(&(&ctx.organism.ip_before_fetch + &vector));

            let call_site_layout_coord = &ctx.organism.ip_before_fetch - &ctx.organism.initial_ip;
            let linear = artifact.coord_to_linear_address(&call_site_layout_coord);
            let bindings = linear
                .and_then(|l| artifact.call_site_bindings.get(&l))
                .cloned()
                .unwrap_or_default();
            let target_layout_coord = &target - &ctx.organism.initial_ip;
            let proc_name = artifact
                .coord_to_linear_address(&target_layout_coord)
                .and_then(|l| artifact.label_address_to_name.get(&l))
                .cloned()
                .unwrap_or_default();

            let return_ip = ctx.world.wrap(
                &(&ctx.organism.ip_before_fetch
                    + &ctx.organism.dv_before_fetch.scaled(1 + arity(Call, dims) as i64)),
            );

            let frame = CallFrame {
                return_ip,
                saved_pr: ctx.organism.pr.clone(),
                saved_fpr: ctx.organism.fpr.clone(),
                fpr_bindings: bindings.iter().enumerate().map(|(i, r)| (i as u8, *r)).collect(),
                proc_name,
            };

            for (i, caller_reg) in bindings.iter().enumerate() {
                if i >= ctx.organism.fpr.len() {
                    return fault(ctx, op, InstructionFault::InvalidCallBinding);
                }
                let value = ctx.organism.reg(*caller_reg);
                if ctx.organism.set_reg(crate::vm::organism::RegisterId::Fpr(i as u8), value).is_err() {
                    return fault(ctx, op, InstructionFault::InvalidCallBinding);
                }
            }

            if ctx.organism.cs.push(frame).is_err() {
                return fault(ctx, op, InstructionFault::CallStackFull);
            }

            ctx.organism.ip = target;
            ctx.organism.skip_ip_advance = true;
            ok(op)
        }
        Ret => {
            let frame = match ctx.organism.cs.pop() {
                Ok(f) => f,
                Err(_) => return fault(ctx, op, InstructionFault::ReturnWithEmptyCallStack),
            };

            for (i, caller_reg) in &frame.fpr_bindings {
                let value = ctx.organism.reg(crate::vm::organism::RegisterId::Fpr(*i));
                let _ = ctx.organism.set_reg(*caller_reg, value);
            }
            ctx.organism.pr = frame.saved_pr;

            ctx.organism.ip = frame.return_ip;
            ctx.organism.skip_ip_advance = true;
            ok(op)
        }
        _ => unreachable!("control::execute called with non-control opcode {op:?}"),
    }
}
