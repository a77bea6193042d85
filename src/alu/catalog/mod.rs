//! Instruction catalog and representation.
//!
//! An [`Instruction`] is an [`Opcode`], a destination, up to three source
//! operands and a [`Modifiers`] set. It is built with the same chained
//! `with_*` calls a decoder or test harness would use:
//!
//! ```
//! use packed_alu::alu::{Instruction, Opcode, Operand};
//!
//! let inst = Instruction::new(Opcode::Dot4I32I8)
//!     .with_dest(Operand::Vgpr(3))
//!     .with_source(Operand::Vgpr(0))
//!     .with_source(Operand::Vgpr(1))
//!     .with_source(Operand::Imm(0));
//! assert_eq!(inst.sources.len(), 3);
//! ```

mod modifiers;
mod opcode;

pub use modifiers::{ExecMode, Modifiers};
pub use opcode::{ClampKind, Container, ModifierKind, OpDescriptor, Opcode, Signedness};

use smallvec::SmallVec;
use thiserror::Error;

/// Catalog lookup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u16),

    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),
}

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Vector register (first of the pair for 64-bit containers).
    Vgpr(u16),
    /// Inline constant, the same for every lane. Truncated to the
    /// container width.
    Imm(u64),
}

/// A decoded packed instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: Option<Operand>,
    pub sources: SmallVec<[Operand; 3]>,
    pub modifiers: Modifiers,
}

impl Instruction {
    /// Create an instruction with default modifiers and no operands.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            sources: SmallVec::new(),
            modifiers: Modifiers::default(),
        }
    }

    /// Add a source operand.
    pub fn with_source(mut self, src: Operand) -> Self {
        self.sources.push(src);
        self
    }

    /// Set the destination operand.
    pub fn with_dest(mut self, dst: Operand) -> Self {
        self.dest = Some(dst);
        self
    }

    /// Replace the whole modifier set.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the clamp bit.
    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.modifiers.clamp = clamp;
        self
    }

    /// Catalog entry for the opcode.
    #[inline]
    pub fn descriptor(&self) -> OpDescriptor {
        self.opcode.descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_builder() {
        let inst = Instruction::new(Opcode::PkAddU16)
            .with_dest(Operand::Vgpr(0))
            .with_source(Operand::Vgpr(1))
            .with_source(Operand::Imm(0x0001_0001))
            .with_clamp(true);

        assert_eq!(inst.sources.len(), 2);
        assert_eq!(inst.dest, Some(Operand::Vgpr(0)));
        assert!(inst.modifiers.clamp);
        assert_eq!(inst.modifiers.opsel_hi, 0b111);
        assert_eq!(inst.descriptor().arity, 2);
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(ParseError::UnknownOpcode(0x7).to_string(), "unknown opcode: 0x07");
        assert_eq!(
            ParseError::UnknownMnemonic("v_foo".into()).to_string(),
            "unknown mnemonic: v_foo"
        );
    }
}
