//! Packed sub-word vector ALU.
//!
//! Bit-exact evaluation of the VOP3P instruction family: 16-bit integer and
//! binary16 pairs in a 32-bit register, dot-product reductions over 4-, 8-
//! and 16-bit fields, binary32 pairs in a 64-bit register pair, and the
//! accumulator moves.
//!
//! # Architecture
//!
//! ```text
//! Instruction ──► PackedExecutor ──► validate (mode, arity, dest)
//!                       │
//!                       ├─► VectorView snapshots of each source
//!                       ├─► LaneDriver: for each active lane
//!                       │      packed16 / dot / packed32 / accum
//!                       │      (codec + saturate + FpUnit)
//!                       └─► commit staged destination
//! ```
//!
//! # Modules
//!
//! - [`saturate`]: clamps into signed, unsigned and unit ranges
//! - [`codec`]: split a register into fields and join them back
//! - [`fp`]: software binary16 unit and evaluation context
//! - [`catalog`]: opcodes, descriptors, modifiers, instructions
//! - [`state`]: register file, exec mask, accumulator window
//! - [`execute`]: execution units and the dispatching executor
//! - [`traits`]: `FpUnit` and `Executor` seams, error types

pub mod catalog;
pub mod codec;
pub mod execute;
pub mod fp;
pub mod saturate;
pub mod state;
pub mod traits;

pub use catalog::{ExecMode, Instruction, Modifiers, OpDescriptor, Opcode, Operand, ParseError};
pub use execute::PackedExecutor;
pub use fp::{FpContext, FpFlags, RoundingMode, SoftFp};
pub use state::{AccumWindow, ExecMask, VectorRegisterFile, WaveContext};
pub use traits::{ExecError, Executor, FpUnit, ModifierWarning, Outcome, RegisterError};
