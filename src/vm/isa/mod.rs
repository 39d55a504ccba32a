//! The instruction set: opcode table, per-opcode decode/execute/cost/arity (§4.3).
//!
//! Opcodes are modeled as a tagged sum (`Opcode`) dispatched through a
//! single `execute` match, per the "polymorphism of instructions"
//! design note — each family's handler is a pure function over
//! `(organism, world, args) -> Effect`, keeping the plan/commit split
//! the scheduler needs (§5) explicit: no handler mutates the `World`
//! directly, it only returns the write it *wants* to make.

mod arith;
mod bitwise;
mod cond;
mod control;
mod data;
mod locstack;
mod scan;
mod state;
mod vector;
mod world_ops;

use crate::coord::Coord;
use crate::molecule::{Molecule, MoleculeType};
use crate::vm::error::InstructionFault;
use crate::vm::organism::{Organism, RegisterId};
use crate::vm::program::ProgramArtifact;
use crate::world::World;
use crate::rng::Rng;

/// How a family operand's value is obtained: from a register, an
/// immediate literal embedded as the argument cell, or popped off a
/// stack. This is the `*R | *I | *S` suffix convention used throughout
/// §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Register,
    Immediate,
    Stack,
}

impl Suffix {
    /// Number of argument cells a scalar operand of this suffix consumes
    /// (the destination register id, if any, is accounted separately).
    #[must_use]
    pub const fn scalar_arity(self) -> usize {
        match self {
            Suffix::Register | Suffix::Immediate => 1,
            Suffix::Stack => 0,
        }
    }

    /// Number of argument cells a vector operand of this suffix consumes,
    /// for an n-dimensional world.
    #[must_use]
    pub const fn vector_arity(self, dims: usize) -> usize {
        match self {
            Suffix::Register => 1,
            Suffix::Immediate => dims,
            Suffix::Stack => 0,
        }
    }
}

/// A single planned write to the world, produced during the per-tick
/// "plan" phase and arbitrated by the scheduler before being applied.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldWrite {
    pub coord: Coord,
    pub molecule: Molecule,
    pub owner: u64,
    /// Whether this write represents a `PEEK`-style "consume" (clear to
    /// empty) rather than a `POKE`-style "set to value". Used only for
    /// conflict bookkeeping; the molecule/owner fields already encode
    /// the intended post-write cell state either way.
    pub consumes: bool,
}

/// The outcome of planning one organism's instruction this tick:
/// everything needed to finish execution once (if applicable) the
/// world-write conflict has been arbitrated.
#[derive(Debug, Clone, Default)]
pub struct Effect {
    /// Cost charged unconditionally, before conflict arbitration, such
    /// as `POKE`'s type-dependent surcharge (§4.3).
    pub pre_conflict_cost: i64,
    /// Cost charged only if this organism wins any world-write
    /// arbitration (or if there is none to arbitrate).
    pub base_cost: i64,
    pub world_write: Option<WorldWrite>,
    pub fork: Option<ForkRequest>,
}

#[derive(Debug, Clone)]
pub struct ForkRequest {
    pub child_energy: i64,
    pub child_ip: Coord,
    pub child_dv: Coord,
}

/// Everything a family handler needs, split so handlers can mutate
/// organism-local state freely (it is never subject to conflict) while
/// only *proposing* world writes.
pub struct ExecContext<'a> {
    pub organism: &'a mut Organism,
    pub world: &'a World,
    pub args: &'a [Molecule],
    pub rng: &'a mut Rng,
    pub penalty: i64,
    pub fork_base_cost: i64,
}

impl ExecContext<'_> {
    fn fail(&mut self, reason: InstructionFault) {
        self.organism.fail(reason);
    }
}

macro_rules! opcodes {
    ( $( $variant:ident = $mnemonic:literal ),+ $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Opcode {
            $( $variant ),+
        }

        impl Opcode {
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$variant => $mnemonic ),+
                }
            }

            #[must_use]
            pub fn from_mnemonic(name: &str) -> Option<Opcode> {
                let upper = name.to_ascii_uppercase();
                match upper.as_str() {
                    $( $mnemonic => Some(Opcode::$variant), )+
                    _ => None,
                }
            }

            /// Opcode ids are assigned by declaration order; `Nop = 0`
            /// is guaranteed by listing it first, matching "the all-zero
            /// molecule means NOP" (§3.1).
            #[must_use]
            pub const fn id(self) -> u16 {
                self as u16
            }

            #[must_use]
            pub fn from_id(id: u16) -> Option<Opcode> {
                const COUNT: u16 = { let mut n = 0u16; $( let _ = stringify!($variant); n += 1; )+ n };
                if id >= COUNT {
                    return None;
                }
                // SAFETY: Opcode is `repr(u16)` with consecutive discriminants
                // starting at 0 (enforced by this macro being the sole
                // constructor of the enum), and `id < COUNT` was just checked.
                Some(unsafe { std::mem::transmute::<u16, Opcode>(id) })
            }
        }
    };
}

opcodes! {
    Nop = "NOP",

    // Data / memory
    Seti = "SETI", Setr = "SETR", Setv = "SETV",
    Push = "PUSH", Pusi = "PUSI", Pop = "POP",
    Dup = "DUP", Swap = "SWAP", Drop = "DROP", Rot = "ROT",

    // Arithmetic
    Addr = "ADDR", Addi = "ADDI", Adds = "ADDS",
    Subr = "SUBR", Subi = "SUBI", Subs = "SUBS",
    Mulr = "MULR", Muli = "MULI", Muls = "MULS",
    Divr = "DIVR", Divi = "DIVI", Divs = "DIVS",
    Modr = "MODR", Modi = "MODI", Mods = "MODS",
    Dotr = "DOTR", Doti = "DOTI", Dots = "DOTS",
    Crsr = "CRSR", Crsi = "CRSI", Crss = "CRSS",

    // Bitwise
    Andr = "ANDR", Andi = "ANDI", Ands = "ANDS",
    Orr = "ORR", Ori = "ORI", Ors = "ORS",
    Xorr = "XORR", Xori = "XORI", Xors = "XORS",
    Nandr = "NANDR", Nandi = "NANDI", Nands = "NANDS",
    Shlr = "SHLR", Shli = "SHLI", Shls = "SHLS",
    Shrr = "SHRR", Shri = "SHRI", Shrs = "SHRS",
    Notr = "NOTR",
    Rotr = "ROTR", Roti = "ROTI", Rots = "ROTS",
    Pcnr = "PCNR", Pcni = "PCNI", Pcns = "PCNS",
    Bsnr = "BSNR", Bsni = "BSNI", Bsns = "BSNS",
    Rbir = "RBIR", Rbii = "RBII", Rbis = "RBIS",

    // Scans
    Spnr = "SPNR",
    Sntr = "SNTR", Snti = "SNTI", Snts = "SNTS",

    // Vector component
    Vgtr = "VGTR", Vgti = "VGTI", Vgts = "VGTS",
    Vstr = "VSTR", Vsti = "VSTI", Vsts = "VSTS",
    Vbld = "VBLD", Vbls = "VBLS",
    B2vr = "B2VR", B2vi = "B2VI", B2vs = "B2VS",
    V2br = "V2BR", V2bi = "V2BI", V2bs = "V2BS",
    Rtrr = "RTRR", Rtri = "RTRI", Rtrs = "RTRS",

    // Control flow
    Jmpi = "JMPI", Jmpr = "JMPR", Jmps = "JMPS",
    Call = "CALL", Ret = "RET",

    // Conditionals (positive)
    Ifr = "IFR", Ifi = "IFI", Ifs = "IFS",
    Ltr = "LTR", Lti = "LTI", Lts = "LTS",
    Gtr = "GTR", Gti = "GTI", Gts = "GTS",
    Iftr = "IFTR", Ifti = "IFTI", Ifts = "IFTS",
    Ifmr = "IFMR", Ifmi = "IFMI", Ifms = "IFMS",
    // Conditionals (negated)
    Inr = "INR", Ini = "INI", Ins = "INS",
    Letr = "LETR", Leti = "LETI", Lets = "LETS",
    Getr = "GETR", Geti = "GETI", Gets = "GETS",
    Intr = "INTR", Inti = "INTI", Ints = "INTS",
    Inmr = "INMR", Inmi = "INMI", Inms = "INMS",

    // World interaction
    Peek = "PEEK", Peki = "PEKI", Peks = "PEKS",
    Scan = "SCAN", Scni = "SCNI", Scns = "SCNS",
    Poke = "POKE", Poki = "POKI", Poks = "POKS",
    Seek = "SEEK", Seki = "SEKI", Seks = "SEKS",

    // State / location
    Sync = "SYNC", Turn = "TURN", Pos = "POS", Diff = "DIFF", Nrg = "NRG",
    Randr = "RANDR", Randi = "RANDI", Rands = "RANDS",
    Fork = "FORK",
    Adpr = "ADPR", Adpi = "ADPI", Adps = "ADPS",

    // Location stack / registers
    Dupl = "DUPL", Swpl = "SWPL", Drpl = "DRPL", Rotl = "ROTL",
    Dpls = "DPLS", Skls = "SKLS", Lsds = "LSDS", Dplr = "DPLR",
    Sklr = "SKLR", Pusl = "PUSL", Popl = "POPL", Lrdr = "LRDR",
    Lrds = "LRDS", Lsdr = "LSDR",
}

/// Resolves the `R|I|S` suffix encoded in an opcode's mnemonic, for
/// every opcode that has one.
#[must_use]
pub fn suffix_of(op: Opcode) -> Option<Suffix> {
    use Opcode::*;
    Some(match op {
        Addr | Subr | Mulr | Divr | Modr | Dotr | Crsr | Andr | Orr | Xorr | Nandr | Shlr
        | Shrr | Rotr | Pcnr | Bsnr | Rbir | Sntr | Vgtr | Vstr | B2vr | V2br | Rtrr | Ifr
        | Ltr | Gtr | Iftr | Ifmr | Inr | Letr | Getr | Intr | Inmr | Peek | Scan | Poke
        | Seek | Randr | Adpr | Jmpr => Suffix::Register,

        Addi | Subi | Muli | Divi | Modi | Doti | Crsi | Andi | Ori | Xori | Nandi | Shli
        | Shri | Roti | Pcni | Bsni | Rbii | Snti | Vgti | Vsti | B2vi | V2bi | Rtri | Ifi
        | Lti | Gti | Ifti | Ifmi | Ini | Leti | Geti | Inti | Inmi | Peki | Scni | Poki
        | Seki | Randi | Adpi | Jmpi => Suffix::Immediate,

        Adds | Subs | Muls | Divs | Mods | Dots | Crss | Ands | Ors | Xors | Nands | Shls
        | Shrs | Rots | Pcns | Bsns | Rbis | Snts | Vgts | Vsts | B2vs | V2bs | Rtrs | Ifs
        | Lts | Gts | Ifts | Ifms | Ins | Lets | Gets | Ints | Inms | Peks | Scns | Poks
        | Seks | Rands | Adps | Jmps => Suffix::Stack,

        _ => return None,
    })
}

/// Fixed arity (argument-cell count) of an opcode, for a world of the
/// given dimensionality. Needed both by the assembler's layout pass and
/// by the conditional "skip" mechanism (§4.3), which re-derives the
/// length of the *next* instruction from this table.
#[must_use]
pub fn arity(op: Opcode, dims: usize) -> usize {
    use Opcode::*;
    match op {
        // Zero-argument opcodes.
        Nop | Dup | Swap | Drop | Rot | Ret | Sync | Pos | Diff | Nrg | Fork
        | Vbld | Vbls | Dupl | Swpl | Drpl | Rotl | Pusl | Popl | Jmps => 0,

        // PCN*/RBI* are unary (one source mask, no second operand). The
        // `S` forms have no destination register at all: mask comes off
        // the data stack and the result is pushed back (§4.3 "PCNS
        // pushes as DATA"), so they take zero argument cells.
        Pcns | Rbis => 0,

        // Single-operand, fixed one argument cell.
        Push | Pusi | Pop | Notr | Dpls | Skls | Lsds | Dplr | Sklr | Lrdr | Lrds | Lsdr | Spnr => 1,

        // Destination register + one vector literal (n cells).
        Setv => 1 + dims,
        // TURN takes only the vector literal, no destination register.
        Turn => dims,
        // CALL's target is a position-independent relative vector, exactly like JMPI.
        Call => dims,

        Seti | Setr => 2,
        // JMPI/JMPR take no destination register, only a target vector.
        Jmpi | Jmpr => suffix_of(op)
            .expect("JMPI/JMPR always has a suffix")
            .vector_arity(dims),

        // Binary scalar families: destination register + suffix-encoded operand.
        Addr | Addi | Adds | Subr | Subi | Subs | Mulr | Muli | Muls | Divr | Divi | Divs
        | Modr | Modi | Mods | Andr | Andi | Ands | Orr | Ori | Ors | Xorr | Xori | Xors
        | Nandr | Nandi | Nands | Shlr | Shli | Shls | Shrr | Shri | Shrs | Rotr | Roti
        | Rots | Pcnr | Pcni | Bsnr | Bsni | Bsns | Rbir | Rbii | Sntr | Snti
        | Snts | Randr | Randi | Rands => {
            1 + suffix_of(op).expect("arithmetic/bitwise family opcode always has a suffix").scalar_arity()
        }

        // ADP* only sets the active DP index: operand only, no dest register.
        Adpr | Adpi | Adps => {
            suffix_of(op).expect("ADP* always has a suffix").scalar_arity()
        }

        // Binary vector families: destination register + suffix-encoded vector operand.
        Dotr | Doti | Dots | Crsr | Crsi | Crss => {
            1 + suffix_of(op).expect("vector-arithmetic opcode always has a suffix").vector_arity(dims)
        }

        // Vector component get/set: dest/src reg + vector operand reg/imm + index operand.
        Vgtr | Vgti | Vgts | Vstr | Vsti | Vsts => {
            2 + suffix_of(op).expect("VGT*/VST* always has a suffix").scalar_arity()
        }

        B2vr | B2vi | B2vs => {
            1 + suffix_of(op).expect("B2V* always has a suffix").scalar_arity()
        }
        V2br | V2bi | V2bs => {
            1 + suffix_of(op).expect("V2B* always has a suffix").vector_arity(dims)
        }
        Rtrr | Rtri | Rtrs => {
            1 + 2 * suffix_of(op).expect("RTR* always has a suffix").scalar_arity()
        }

        // SEEK only moves the active DP: no value register, just the target vector.
        Seek | Seki | Seks => {
            suffix_of(op).expect("SEEK* always has a suffix").vector_arity(dims)
        }
        // PEEK/SCAN read into a destination register; POKE writes a literal
        // value molecule. Either way, one fixed value cell plus the
        // suffix-encoded target vector.
        Peek | Peki | Peks | Scan | Scni | Scns | Poke | Poki | Poks => {
            1 + suffix_of(op).expect("world-interaction opcode always has a suffix").vector_arity(dims)
        }

        // Conditionals: operand A register + suffix-encoded operand B.
        Ifr | Ifi | Ifs | Ltr | Lti | Lts | Gtr | Gti | Gts | Iftr | Ifti | Ifts | Inr | Ini
        | Ins | Letr | Leti | Lets | Getr | Geti | Gets | Intr | Inti | Ints => {
            1 + suffix_of(op).expect("conditional opcode always has a suffix").scalar_arity()
        }
        Ifmr | Ifmi | Ifms | Inmr | Inmi | Inms => {
            suffix_of(op).expect("IFM*/INM* always has a suffix").vector_arity(dims)
        }
    }
}

/// Base energy cost of an opcode before any world-interaction surcharge.
#[must_use]
pub fn base_cost(_op: Opcode) -> i64 {
    1
}

/// Decodes the opcode-id molecule at the instruction pointer. Returns
/// `None` for a molecule that isn't a valid `CODE`-typed opcode id
/// (callers treat this like `NOP`, since the all-zero molecule both
/// *is* `NOP` and *is* "empty cell", §3.1).
#[must_use]
pub fn decode(word: Molecule) -> Option<Opcode> {
    if word.r#type() != MoleculeType::Code {
        return None;
    }
    Opcode::from_id(word.value().try_into().ok()?)
}

/// Executes one decoded instruction. `args` are the already-fetched
/// argument molecules (exactly `arity(op, world.dims())` of them).
pub fn execute(
    op: Opcode,
    organism: &mut Organism,
    world: &World,
    args: &[Molecule],
    rng: &mut Rng,
    penalty: i64,
    fork_base_cost: i64,
    artifact: &ProgramArtifact,
) -> Effect {
    let mut ctx = ExecContext {
        organism,
        world,
        args,
        rng,
        penalty,
        fork_base_cost,
    };
    use Opcode::*;
    match op {
        Nop => Effect { base_cost: 0, ..Default::default() },

        Seti | Setr | Setv | Push | Pusi | Pop | Dup | Swap | Drop | Rot => {
            data::execute(&mut ctx, op)
        }

        Addr | Addi | Adds | Subr | Subi | Subs | Mulr | Muli | Muls | Divr | Divi | Divs
        | Modr | Modi | Mods | Dotr | Doti | Dots | Crsr | Crsi | Crss => {
            arith::execute(&mut ctx, op)
        }

        Andr | Andi | Ands | Orr | Ori | Ors | Xorr | Xori | Xors | Nandr | Nandi | Nands
        | Shlr | Shli | Shls | Shrr | Shri | Shrs | Notr | Rotr | Roti | Rots | Pcnr | Pcni
        | Pcns | Bsnr | Bsni | Bsns | Rbir | Rbii | Rbis => bitwise::execute(&mut ctx, op),

        Spnr | Sntr | Snti | Snts => scan::execute(&mut ctx, op),

        Vgtr | Vgti | Vgts | Vstr | Vsti | Vsts | Vbld | Vbls | B2vr | B2vi | B2vs | V2br
        | V2bi | V2bs | Rtrr | Rtri | Rtrs => vector::execute(&mut ctx, op),

        Jmpi | Jmpr | Jmps | Call | Ret => control::execute(&mut ctx, op, artifact),

        Ifr | Ifi | Ifs | Ltr | Lti | Lts | Gtr | Gti | Gts | Iftr | Ifti | Ifts | Ifmr
        | Ifmi | Ifms | Inr | Ini | Ins | Letr | Leti | Lets | Getr | Geti | Gets | Intr
        | Inti | Ints | Inmr | Inmi | Inms => cond::execute(&mut ctx, op, world.shape().len()),

        Peek | Peki | Peks | Scan | Scni | Scns | Poke | Poki | Poks | Seek | Seki | Seks => {
            world_ops::execute(&mut ctx, op)
        }

        Sync | Turn | Pos | Diff | Nrg | Randr | Randi | Rands | Fork | Adpr | Adpi | Adps => {
            state::execute(&mut ctx, op)
        }

        Dupl | Swpl | Drpl | Rotl | Dpls | Skls | Lsds | Dplr | Sklr | Pusl | Popl | Lrdr
        | Lrds | Lsdr => locstack::execute(&mut ctx, op),
    }
}

pub(crate) fn decode_register_arg(m: Molecule) -> Option<RegisterId> {
    let idx = m.value();
    if idx < 0 {
        return None;
    }
    let idx = idx as u64;
    if idx < 8 {
        Some(RegisterId::Dr(idx as u8))
    } else if idx < 10 {
        Some(RegisterId::Pr((idx - 8) as u8))
    } else if idx < 18 {
        Some(RegisterId::Fpr((idx - 10) as u8))
    } else if idx < 22 {
        Some(RegisterId::Lr((idx - 18) as u8))
    } else {
        None
    }
}

pub(crate) fn register_arg_value(id: RegisterId) -> i64 {
    match id {
        RegisterId::Dr(n) => n as i64,
        RegisterId::Pr(n) => 8 + n as i64,
        RegisterId::Fpr(n) => 10 + n as i64,
        RegisterId::Lr(n) => 18 + n as i64,
    }
}

/// An unconditionally-successful effect charging just the opcode's base cost.
pub(crate) fn ok(op: Opcode) -> Effect {
    Effect {
        base_cost: base_cost(op),
        ..Default::default()
    }
}

/// Records an instruction failure on `ctx.organism` and charges the base
/// cost plus the configured penalty (§7 `RuntimeInstructionFailure`).
pub(crate) fn fault(ctx: &mut ExecContext, op: Opcode, reason: InstructionFault) -> Effect {
    ctx.fail(reason);
    Effect {
        base_cost: base_cost(op) + ctx.penalty,
        ..Default::default()
    }
}

/// Reads a scalar operand encoded with the given suffix, starting at
/// `args[idx]` (consuming `suffix.scalar_arity()` argument cells; a
/// `Stack` suffix instead pops the data stack).
pub(crate) fn read_scalar(
    ctx: &mut ExecContext,
    suffix: Suffix,
    args: &[Molecule],
    idx: usize,
) -> Result<Molecule, InstructionFault> {
    match suffix {
        Suffix::Register => {
            let id = decode_register_arg(args[idx]).ok_or(InstructionFault::WrongRegisterKind)?;
            ctx.organism
                .reg(id)
                .as_scalar()
                .ok_or(InstructionFault::WrongRegisterKind)
        }
        Suffix::Immediate => Ok(args[idx]),
        Suffix::Stack => ctx
            .organism
            .ds
            .pop()?
            .as_scalar()
            .ok_or(InstructionFault::WrongRegisterKind),
    }
}

/// Reads a vector operand encoded with the given suffix, starting at
/// `args[idx]` (consuming `suffix.vector_arity(dims)` argument cells; a
/// `Stack` suffix instead pops the data stack).
pub(crate) fn read_vector(
    ctx: &mut ExecContext,
    suffix: Suffix,
    args: &[Molecule],
    idx: usize,
    dims: usize,
) -> Result<Coord, InstructionFault> {
    match suffix {
        Suffix::Register => {
            let id = decode_register_arg(args[idx]).ok_or(InstructionFault::WrongRegisterKind)?;
            ctx.organism
                .reg(id)
                .as_vector()
                .cloned()
                .ok_or(InstructionFault::WrongRegisterKind)
        }
        Suffix::Immediate => Ok(Coord(
            args[idx..idx + dims].iter().map(|m| m.value()).collect(),
        )),
        Suffix::Stack => ctx
            .organism
            .ds
            .pop()?
            .as_vector()
            .cloned()
            .ok_or(InstructionFault::WrongRegisterKind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_is_opcode_zero() {
        assert_eq!(Opcode::Nop.id(), 0);
        assert!(decode(Molecule::empty()).is_some());
        assert_eq!(decode(Molecule::empty()), Some(Opcode::Nop));
    }

    #[test]
    fn mnemonic_round_trips() {
        for id in 0u16.. {
            let Some(op) = Opcode::from_id(id) else { break };
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
    }
}
