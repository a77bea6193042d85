//! Opcode catalog.
//!
//! The raw numbers are the VOP3P encoding's opcode field and are stable;
//! mnemonics follow the assembler spelling.
//!
//! | Range | Family |
//! |-------|--------|
//! | 0x00-0x12 | packed 16-bit integer and binary16 |
//! | 0x23-0x2B | dot products |
//! | 0x30-0x33 | packed 32-bit in a 64-bit container |
//! | 0x58-0x59 | accumulator moves |

use std::fmt;

use super::ParseError;
use crate::alu::codec::FieldWidth;

/// A VOP3P opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    PkMadI16,
    PkMulLoU16,
    PkAddI16,
    PkSubI16,
    PkLshlrevB16,
    PkLshrrevB16,
    PkAshrrevI16,
    PkMaxI16,
    PkMinI16,
    PkMadU16,
    PkAddU16,
    PkSubU16,
    PkMaxU16,
    PkMinU16,
    PkFmaF16,
    PkAddF16,
    PkMulF16,
    PkMinF16,
    PkMaxF16,
    Dot2F32F16,
    Dot2I32I16,
    Dot2U32U16,
    Dot4I32I8,
    Dot4U32U8,
    Dot8I32I4,
    Dot8U32U4,
    PkFmaF32,
    PkMulF32,
    PkAddF32,
    PkMovB32,
    AccvgprRead,
    AccvgprWrite,
}

/// Raw number and mnemonic for every opcode, in encoding order.
const TABLE: &[(Opcode, u16, &str)] = &[
    (Opcode::PkMadI16, 0x00, "v_pk_mad_i16"),
    (Opcode::PkMulLoU16, 0x01, "v_pk_mul_lo_u16"),
    (Opcode::PkAddI16, 0x02, "v_pk_add_i16"),
    (Opcode::PkSubI16, 0x03, "v_pk_sub_i16"),
    (Opcode::PkLshlrevB16, 0x04, "v_pk_lshlrev_b16"),
    (Opcode::PkLshrrevB16, 0x05, "v_pk_lshrrev_b16"),
    (Opcode::PkAshrrevI16, 0x06, "v_pk_ashrrev_i16"),
    (Opcode::PkMaxI16, 0x07, "v_pk_max_i16"),
    (Opcode::PkMinI16, 0x08, "v_pk_min_i16"),
    (Opcode::PkMadU16, 0x09, "v_pk_mad_u16"),
    (Opcode::PkAddU16, 0x0A, "v_pk_add_u16"),
    (Opcode::PkSubU16, 0x0B, "v_pk_sub_u16"),
    (Opcode::PkMaxU16, 0x0C, "v_pk_max_u16"),
    (Opcode::PkMinU16, 0x0D, "v_pk_min_u16"),
    (Opcode::PkFmaF16, 0x0E, "v_pk_fma_f16"),
    (Opcode::PkAddF16, 0x0F, "v_pk_add_f16"),
    (Opcode::PkMulF16, 0x10, "v_pk_mul_f16"),
    (Opcode::PkMinF16, 0x11, "v_pk_min_f16"),
    (Opcode::PkMaxF16, 0x12, "v_pk_max_f16"),
    (Opcode::Dot2F32F16, 0x23, "v_dot2_f32_f16"),
    (Opcode::Dot2I32I16, 0x26, "v_dot2_i32_i16"),
    (Opcode::Dot2U32U16, 0x27, "v_dot2_u32_u16"),
    (Opcode::Dot4I32I8, 0x28, "v_dot4_i32_i8"),
    (Opcode::Dot4U32U8, 0x29, "v_dot4_u32_u8"),
    (Opcode::Dot8I32I4, 0x2A, "v_dot8_i32_i4"),
    (Opcode::Dot8U32U4, 0x2B, "v_dot8_u32_u4"),
    (Opcode::PkFmaF32, 0x30, "v_pk_fma_f32"),
    (Opcode::PkMulF32, 0x31, "v_pk_mul_f32"),
    (Opcode::PkAddF32, 0x32, "v_pk_add_f32"),
    (Opcode::PkMovB32, 0x33, "v_pk_mov_b32"),
    (Opcode::AccvgprRead, 0x58, "v_accvgpr_read"),
    (Opcode::AccvgprWrite, 0x59, "v_accvgpr_write"),
];

/// Interpretation of a field's bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
    Float,
    /// Raw bits, no arithmetic interpretation.
    Bits,
}

/// Operand storage per lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// One 32-bit register.
    B32,
    /// A register pair.
    B64,
}

impl Container {
    /// Width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            Container::B32 => 32,
            Container::B64 => 64,
        }
    }
}

/// What the clamp bit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampKind {
    /// Integer saturation to the result field's range.
    Int,
    /// Floating-point clamp to `[0.0, 1.0]`.
    Unit,
    /// No clamp form.
    None,
}

/// Which modifier fields the opcode honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    /// OPSEL/OPSEL_HI select halves, NEG/NEG_HI flip signs.
    Full,
    /// OPSEL picks halves, NEG is undefined.
    SelectOnly,
    /// Sources are read whole.
    None,
}

/// Static description of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDescriptor {
    /// Source operands read.
    pub arity: usize,
    /// Width of a source field.
    pub field_width: FieldWidth,
    pub signedness: Signedness,
    /// Storage of sources and result.
    pub container: Container,
    pub clamp: ClampKind,
    pub modifiers: ModifierKind,
}

impl OpDescriptor {
    const fn new(
        arity: usize,
        field_width: FieldWidth,
        signedness: Signedness,
        container: Container,
        clamp: ClampKind,
        modifiers: ModifierKind,
    ) -> Self {
        Self {
            arity,
            field_width,
            signedness,
            container,
            clamp,
            modifiers,
        }
    }
}

impl Opcode {
    /// Every opcode in encoding order.
    pub fn all() -> impl Iterator<Item = Opcode> {
        TABLE.iter().map(|&(op, _, _)| op)
    }

    fn entry(self) -> &'static (Opcode, u16, &'static str) {
        // The table lists every variant exactly once, in declaration order.
        &TABLE[self as usize]
    }

    /// Hardware opcode number.
    #[inline]
    pub fn raw(self) -> u16 {
        self.entry().1
    }

    /// Assembler mnemonic.
    #[inline]
    pub fn mnemonic(self) -> &'static str {
        self.entry().2
    }

    /// Look up a hardware opcode number.
    pub fn from_raw(raw: u16) -> Result<Self, ParseError> {
        TABLE
            .iter()
            .find(|&&(_, r, _)| r == raw)
            .map(|&(op, _, _)| op)
            .ok_or(ParseError::UnknownOpcode(raw))
    }

    /// Look up a mnemonic. Case-insensitive; the `v_` prefix is optional.
    pub fn from_mnemonic(name: &str) -> Result<Self, ParseError> {
        let lower = name.trim().to_ascii_lowercase();
        let full = if lower.starts_with("v_") {
            lower
        } else {
            format!("v_{}", lower)
        };
        TABLE
            .iter()
            .find(|&&(_, _, m)| m == full)
            .map(|&(op, _, _)| op)
            .ok_or_else(|| ParseError::UnknownMnemonic(name.to_string()))
    }

    /// Static operand and modifier description.
    pub fn descriptor(self) -> OpDescriptor {
        use ClampKind as C;
        use Container::{B32, B64};
        use FieldWidth::{W16, W32, W4, W8};
        use ModifierKind as M;
        use Opcode::*;
        use Signedness::{Bits, Float, Signed, Unsigned};

        match self {
            PkMadI16 => OpDescriptor::new(3, W16, Signed, B32, C::Int, M::Full),
            PkMadU16 => OpDescriptor::new(3, W16, Unsigned, B32, C::Int, M::Full),
            PkMulLoU16 => OpDescriptor::new(2, W16, Unsigned, B32, C::None, M::Full),
            PkAddI16 | PkSubI16 | PkMaxI16 | PkMinI16 => {
                OpDescriptor::new(2, W16, Signed, B32, C::Int, M::Full)
            }
            PkAddU16 | PkSubU16 | PkMaxU16 | PkMinU16 => {
                OpDescriptor::new(2, W16, Unsigned, B32, C::Int, M::Full)
            }
            PkLshlrevB16 | PkLshrrevB16 => OpDescriptor::new(2, W16, Bits, B32, C::None, M::Full),
            PkAshrrevI16 => OpDescriptor::new(2, W16, Signed, B32, C::None, M::Full),
            PkFmaF16 => OpDescriptor::new(3, W16, Float, B32, C::Unit, M::Full),
            PkAddF16 | PkMulF16 | PkMinF16 | PkMaxF16 => {
                OpDescriptor::new(2, W16, Float, B32, C::Unit, M::Full)
            }
            Dot2F32F16 => OpDescriptor::new(3, W16, Float, B32, C::Unit, M::None),
            Dot2I32I16 => OpDescriptor::new(3, W16, Signed, B32, C::Int, M::None),
            Dot2U32U16 => OpDescriptor::new(3, W16, Unsigned, B32, C::Int, M::None),
            Dot4I32I8 => OpDescriptor::new(3, W8, Signed, B32, C::Int, M::None),
            Dot4U32U8 => OpDescriptor::new(3, W8, Unsigned, B32, C::Int, M::None),
            Dot8I32I4 => OpDescriptor::new(3, W4, Signed, B32, C::Int, M::None),
            Dot8U32U4 => OpDescriptor::new(3, W4, Unsigned, B32, C::Int, M::None),
            PkFmaF32 => OpDescriptor::new(3, W32, Float, B64, C::None, M::Full),
            PkMulF32 | PkAddF32 => OpDescriptor::new(2, W32, Float, B64, C::None, M::Full),
            PkMovB32 => OpDescriptor::new(2, W32, Bits, B64, C::None, M::SelectOnly),
            AccvgprRead | AccvgprWrite => OpDescriptor::new(1, W32, Bits, B32, C::None, M::None),
        }
    }

    /// Dot-product reduction.
    pub fn is_dot(self) -> bool {
        matches!(self.raw(), 0x23..=0x2B)
    }

    /// Accumulator move.
    pub fn is_accum(self) -> bool {
        matches!(self, Opcode::AccvgprRead | Opcode::AccvgprWrite)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_declaration_order() {
        for (i, &(op, _, _)) in TABLE.iter().enumerate() {
            assert_eq!(op as usize, i, "{} out of order", op);
        }
        assert_eq!(Opcode::all().count(), 32);
    }

    #[test]
    fn test_raw_round_trip() {
        for op in Opcode::all() {
            assert_eq!(Opcode::from_raw(op.raw()), Ok(op));
        }
        assert_eq!(Opcode::PkFmaF32.raw(), 0x30);
        assert_eq!(Opcode::Dot4I32I8.raw(), 0x28);
        assert_eq!(Opcode::from_raw(0x24), Err(ParseError::UnknownOpcode(0x24)));
    }

    #[test]
    fn test_mnemonic_round_trip() {
        for op in Opcode::all() {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Ok(op));
        }
        assert_eq!(Opcode::from_mnemonic("PK_MOV_B32"), Ok(Opcode::PkMovB32));
        assert!(Opcode::from_mnemonic("v_pk_div_f16").is_err());
    }

    #[test]
    fn test_descriptors() {
        let d = Opcode::Dot8U32U4.descriptor();
        assert_eq!(d.arity, 3);
        assert_eq!(d.field_width, FieldWidth::W4);
        assert_eq!(d.signedness, Signedness::Unsigned);

        let d = Opcode::PkMovB32.descriptor();
        assert_eq!(d.container, Container::B64);
        assert_eq!(d.modifiers, ModifierKind::SelectOnly);
        assert_eq!(d.clamp, ClampKind::None);

        assert_eq!(Opcode::AccvgprWrite.descriptor().arity, 1);
        assert!(Opcode::Dot2F32F16.is_dot());
        assert!(!Opcode::PkMaxF16.is_dot());
        assert!(Opcode::AccvgprRead.is_accum());
    }
}
