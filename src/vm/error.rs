//! Dynamic, per-organism runtime faults (§7 `RuntimeInstructionFailure`).
//!
//! These are recoverable: the offending instruction sets
//! `instruction_failed`/`failure_reason` on the organism and the base
//! cost plus a configurable penalty is deducted, but the organism is
//! not killed (unless energy falls to zero or below as a result).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InstructionFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("data/location/call stack underflow")]
    StackUnderflow,
    #[error("data/location/call stack overflow")]
    StackOverflow,
    #[error("operand is not a unit vector")]
    NotAUnitVector,
    #[error("rotation axes must be distinct and in range")]
    InvalidRotationAxes,
    #[error("BSN* argument must satisfy 1 <= |n| <= popcount")]
    InvalidBitSelector,
    #[error("FORK target cell is not empty")]
    ForkTargetOccupied,
    #[error("FORK: parent lacks the energy to fund the child")]
    InsufficientEnergyForFork,
    #[error("POKE into an occupied cell")]
    PokeTargetOccupied,
    #[error("SEEK into an inaccessible or foreign cell")]
    SeekTargetInaccessible,
    #[error("CALL on a full call stack")]
    CallStackFull,
    #[error("RET on an empty call stack")]
    ReturnWithEmptyCallStack,
    #[error("CALL .WITH binds an invalid register id")]
    InvalidCallBinding,
    #[error("unknown label or call target")]
    UnresolvedTarget,
    #[error("register holds a value of the wrong kind (scalar vs vector) for this operand")]
    WrongRegisterKind,
    #[error("active data pointer index out of range")]
    InvalidActiveDpIndex,
    #[error("CRS* requires a 2-dimensional world")]
    InvalidVectorArity,
    #[error("lost tie-break arbitration for a same-cell world write this tick")]
    WriteConflictLost,
}
