//! Core traits and error types for the packed ALU.
//!
//! Two seams are defined here:
//!
//! - [`FpUnit`]: the IEEE-754 binary16 primitives the ALU consumes. The
//!   crate ships [`SoftFp`](super::fp::SoftFp); a host or hardware-backed
//!   unit can be swapped in for comparison runs.
//! - [`Executor`]: evaluates one decoded instruction against a wavefront's
//!   register state.
//!
//! Errors are split by concern: [`RegisterError`] for register-file
//! addressing, [`ExecError`] for instruction-level faults.

use smallvec::SmallVec;
use thiserror::Error;

use super::catalog::{ExecMode, Instruction, Opcode};
use super::fp::{FpContext, FpFlags, RoundingMode};
use super::state::WaveContext;

/// Binary16 floating-point primitives.
///
/// All operands and results are raw bit patterns. Implementations must not
/// keep state between calls; everything per-evaluation lives in the
/// [`FpContext`].
pub trait FpUnit: Send + Sync {
    /// IEEE minimum of two binary16 values.
    fn min_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16;

    /// IEEE maximum of two binary16 values.
    fn max_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16;

    /// `a + b`, rounded per `ctx.rounding`.
    fn add_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16;

    /// `a * b`, rounded per `ctx.rounding`.
    fn mul_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16;

    /// Fused `addend + a * b` with a single rounding.
    fn mul_add_f16(&self, addend: u16, a: u16, b: u16, ctx: &mut FpContext) -> u16;

    /// Widen binary16 to binary32.
    fn f16_to_f32(&self, a: u16, mode: RoundingMode, ctx: &mut FpContext) -> u32;

    /// Narrow binary32 to binary16 with an explicit rounding direction.
    fn f32_to_f16(&self, a: u32, mode: RoundingMode, ctx: &mut FpContext) -> u16;
}

/// Errors from register-file addressing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Register (or the last register of a pair) is past the end of the file.
    #[error("register v{reg} (+{span} regs) out of range for a {count}-register file")]
    OutOfRange {
        /// First register index.
        reg: u32,
        /// Registers spanned by the access (1 or 2).
        span: u32,
        /// Registers in the file.
        count: usize,
    },

    /// Staged destination does not match the wavefront size.
    #[error("lane count mismatch: staged {staged}, wavefront {lanes}")]
    LaneMismatch {
        /// Lanes in the staged view.
        staged: usize,
        /// Lanes in the register file.
        lanes: usize,
    },
}

/// Errors that abort an instruction before any lane is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The opcode cannot run in the requested execution mode.
    #[error("{mode:?} not supported for {opcode}")]
    UnsupportedMode {
        /// The opcode.
        opcode: Opcode,
        /// The rejected mode.
        mode: ExecMode,
    },

    /// Wrong number of source operands.
    #[error("{opcode} takes {expected} source operand(s), got {found}")]
    OperandCount {
        /// The opcode.
        opcode: Opcode,
        /// Sources the opcode reads.
        expected: usize,
        /// Sources supplied.
        found: usize,
    },

    /// No destination register was given.
    #[error("{opcode} has no destination register")]
    MissingDest {
        /// The opcode.
        opcode: Opcode,
    },

    /// The destination is not a vector register.
    #[error("{opcode} destination must be a vector register")]
    InvalidDest {
        /// The opcode.
        opcode: Opcode,
    },

    /// Register addressing failed.
    #[error(transparent)]
    Register(#[from] RegisterError),
}

/// A modifier the opcode defines as meaningless.
///
/// Non-fatal: the instruction runs with the modifier ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierWarning {
    /// NEG/NEG_HI bits set on an opcode without sign-flip modifiers.
    NegIgnored {
        /// The opcode.
        opcode: Opcode,
    },
    /// OPSEL/OPSEL_HI set on an opcode without operand selection.
    OpselIgnored {
        /// The opcode.
        opcode: Opcode,
    },
    /// Clamp requested on an opcode with no saturating form.
    ClampIgnored {
        /// The opcode.
        opcode: Opcode,
    },
}

impl std::fmt::Display for ModifierWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModifierWarning::NegIgnored { opcode } => {
                write!(f, "negative modifier undefined for {}", opcode)
            }
            ModifierWarning::OpselIgnored { opcode } => {
                write!(f, "operand select undefined for {}", opcode)
            }
            ModifierWarning::ClampIgnored { opcode } => {
                write!(f, "clamp undefined for {}", opcode)
            }
        }
    }
}

/// Result of a completed instruction.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Active lanes that received a fresh result.
    pub lanes_written: usize,
    /// Ignored modifiers.
    pub warnings: SmallVec<[ModifierWarning; 2]>,
    /// Floating-point exceptions raised across all lanes.
    pub fp_flags: FpFlags,
}

/// Trait for instruction evaluation.
///
/// # Example
///
/// ```
/// use packed_alu::alu::{Executor, Instruction, Opcode, Operand, PackedExecutor, WaveContext};
///
/// let mut ctx = WaveContext::new(64, 16);
/// ctx.vgprs.broadcast(0, 0x0001_7FFFu32).unwrap();
/// ctx.vgprs.broadcast(1, 0x0001_0001u32).unwrap();
///
/// let inst = Instruction::new(Opcode::PkAddI16)
///     .with_dest(Operand::Vgpr(2))
///     .with_source(Operand::Vgpr(0))
///     .with_source(Operand::Vgpr(1))
///     .with_clamp(true);
///
/// let outcome = PackedExecutor::new().execute(&inst, &mut ctx).unwrap();
/// assert_eq!(outcome.lanes_written, 64);
/// assert_eq!(ctx.vgprs.read_lane(2, 0).unwrap(), 0x0002_7FFF);
/// ```
pub trait Executor {
    /// Evaluate `inst` on every active lane of `ctx`.
    ///
    /// On error nothing has been written.
    fn execute(&self, inst: &Instruction, ctx: &mut WaveContext) -> Result<Outcome, ExecError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_error_display() {
        let e = ExecError::UnsupportedMode {
            opcode: Opcode::PkAddF32,
            mode: ExecMode::Dpp,
        };
        assert_eq!(e.to_string(), "Dpp not supported for v_pk_add_f32");

        let e = ExecError::OperandCount {
            opcode: Opcode::PkFmaF32,
            expected: 3,
            found: 2,
        };
        assert!(e.to_string().contains("takes 3"));
    }

    #[test]
    fn test_register_error_converts() {
        let e: ExecError = RegisterError::OutOfRange {
            reg: 300,
            span: 2,
            count: 256,
        }
        .into();
        assert!(matches!(e, ExecError::Register(_)));
        assert!(e.to_string().contains("v300"));
    }

    #[test]
    fn test_warning_display() {
        let w = ModifierWarning::NegIgnored {
            opcode: Opcode::PkMovB32,
        };
        assert_eq!(w.to_string(), "negative modifier undefined for v_pk_mov_b32");
    }
}
