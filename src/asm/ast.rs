//! The parsed, macro/include-expanded program: labels, directives, and
//! instructions with not-yet-resolved operands.

use crate::molecule::Molecule;
use crate::vm::organism::RegisterId;
use crate::vm::program::SourceLocation;

/// An instruction operand before identifier resolution (§4.5 pass 1).
/// `Ident` is resolved into either `Register` (a `.REG`/`.PREG` alias)
/// or `LabelRef` (a forward or backward label reference) once the full
/// set of declared names is known — see `asm::resolve`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(RegisterId),
    Scalar(Molecule),
    Vector(Vec<i64>),
    Ident(String),
    LabelRef(String),
}

impl Operand {
    /// Number of argument cells this operand occupies once fully
    /// resolved. `Ident` must not remain by the time this is called.
    pub fn cell_count(&self, dims: usize) -> usize {
        match self {
            Operand::Register(_) | Operand::Scalar(_) => 1,
            Operand::Vector(v) => {
                let _ = dims;
                v.len()
            }
            Operand::LabelRef(_) => dims,
            Operand::Ident(_) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    /// Caller register operands bound via `CALL NAME .WITH %A %B …`.
    pub with_bindings: Vec<Operand>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Label(String, SourceLocation),
    Instruction(Instruction),
    Org(Vec<i64>, SourceLocation),
    Dir(Vec<i64>, SourceLocation),
    RegAlias(String, RegisterId),
    Scope(String),
    EndScope,
    Proc {
        name: String,
        export: bool,
        params: Vec<String>,
        loc: SourceLocation,
    },
    EndProc,
    Place {
        molecule: Molecule,
        axes: Vec<PlaceAxis>,
        loc: SourceLocation,
    },
    Require(String, SourceLocation),
    /// Marks entry/exit of an `.INCLUDE`d region, so the layout pass can
    /// save/restore `.DIR` across it (§4.5 pass 3).
    IncludeBegin,
    IncludeEnd,
}

/// One `.PLACE` coordinate axis, relative to the current origin (§4.5
/// pass 7). A placement's full coord set is the cartesian product of
/// its axes once [`Wildcard`](PlaceAxis::Wildcard) is resolved against
/// the world shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceAxis {
    Single(i64),
    /// `a..b`, inclusive of both ends.
    Range(i64, i64),
    /// `a:s:b`, stepping by `s` (which may be negative) from `a` to `b` inclusive.
    Stepped(i64, i64, i64),
    /// `*`, every coordinate along this axis in the world's shape.
    Wildcard,
}
