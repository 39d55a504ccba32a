//! Molecule word layout: a typed value packed into a single machine word.
//!
//! A `Molecule` splits a fixed-width word into a type tag (upper bits)
//! and a two's-complement signed value (lower `VALUE_BITS`). The
//! all-zero word is both "empty cell" and opcode 0 (`NOP`).

use std::fmt;

/// Width in bits of the signed value field. Several opcodes (rotation,
/// bitmask-encoded direction scans) depend on this constant.
pub const VALUE_BITS: u32 = 24;
/// Width in bits of the type tag field.
pub const TYPE_BITS: u32 = 8;
/// Total word width.
pub const WORD_BITS: u32 = VALUE_BITS + TYPE_BITS;

const VALUE_MASK: i64 = (1i64 << VALUE_BITS) - 1;
const VALUE_SIGN_BIT: i64 = 1i64 << (VALUE_BITS - 1);

/// The type tag of a [`Molecule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[repr(u8)]
pub enum MoleculeType {
    Code = 0,
    Data = 1,
    Energy = 2,
    Structure = 3,
}

impl MoleculeType {
    /// Decodes a type tag, wrapping modulo the 4 defined types.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Self {
        match tag & 0b11 {
            0 => MoleculeType::Code,
            1 => MoleculeType::Data,
            2 => MoleculeType::Energy,
            _ => MoleculeType::Structure,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoleculeType::Code => "CODE",
            MoleculeType::Data => "DATA",
            MoleculeType::Energy => "ENERGY",
            MoleculeType::Structure => "STRUCTURE",
        };
        write!(f, "{name}")
    }
}

/// A typed machine word: `(type, value)`.
///
/// `value()` sign-extends the low `VALUE_BITS` bits to a native `i64`.
/// Arithmetic producing a value outside the representable range wraps
/// modulo `2^VALUE_BITS` (two's complement) — see [`Molecule::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Molecule {
    ty: MoleculeType,
    value: i64,
}

impl Molecule {
    /// Constructs a molecule, wrapping `value` into `VALUE_BITS` two's
    /// complement range.
    #[must_use]
    pub fn new(ty: MoleculeType, value: i64) -> Self {
        Self {
            ty,
            value: sign_extend(value & VALUE_MASK),
        }
    }

    /// The all-zero molecule: empty cell, and opcode 0 (`NOP`).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ty: MoleculeType::Code,
            value: 0,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.ty == MoleculeType::Code && self.value == 0
    }

    #[must_use]
    pub const fn r#type(self) -> MoleculeType {
        self.ty
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.value
    }

    /// Packs into a single machine word: type tag in bits
    /// `[VALUE_BITS..VALUE_BITS+TYPE_BITS)`, value in the low bits.
    #[must_use]
    pub fn to_int(self) -> i64 {
        let raw_value = self.value & VALUE_MASK;
        ((self.ty.as_u8() as i64) << VALUE_BITS) | raw_value
    }

    /// Inverse of [`Molecule::to_int`].
    #[must_use]
    pub fn from_int(word: i64) -> Self {
        let raw_value = word & VALUE_MASK;
        let tag = ((word >> VALUE_BITS) & 0b1111_1111) as u8;
        Self {
            ty: MoleculeType::from_u8(tag),
            value: sign_extend(raw_value),
        }
    }
}

impl Default for Molecule {
    fn default() -> Self {
        Self::empty()
    }
}

fn sign_extend(masked: i64) -> i64 {
    if masked & VALUE_SIGN_BIT != 0 {
        masked - (1i64 << VALUE_BITS)
    } else {
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_is_nop_opcode() {
        assert!(Molecule::empty().is_empty());
        assert_eq!(Molecule::empty().to_int(), 0);
    }

    #[test]
    fn value_sign_extends() {
        let m = Molecule::new(MoleculeType::Data, -1);
        assert_eq!(m.value(), -1);
        let m = Molecule::new(MoleculeType::Data, (1 << (VALUE_BITS - 1)) as i64);
        assert!(m.value() < 0, "top bit of value field must sign-extend");
    }

    #[test]
    fn arithmetic_overflow_wraps() {
        let max = (1i64 << (VALUE_BITS - 1)) - 1;
        let m = Molecule::new(MoleculeType::Data, max + 1);
        assert_eq!(m.value(), -(1i64 << (VALUE_BITS - 1)));
    }

    proptest! {
        #[test]
        fn round_trip(tag in 0u8..4, value in i64::MIN..i64::MAX) {
            let m = Molecule::new(MoleculeType::from_u8(tag), value);
            let w = m.to_int();
            prop_assert_eq!(Molecule::from_int(w), m);
        }
    }
}
