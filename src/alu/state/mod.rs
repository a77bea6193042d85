//! Register state for a wavefront.
//!
//! | Piece | Width | Purpose |
//! |-------|-------|---------|
//! | `VectorRegisterFile` | 32-bit x lanes | VGPRs; pairs hold 64-bit operands |
//! | `ExecMask` | 1 bit x lanes | Lanes that may be written |
//! | `AccumWindow` | offset | Where accumulator registers start |
//!
//! # Example
//!
//! ```
//! use packed_alu::alu::state::{ExecMask, WaveContext};
//!
//! let mut ctx = WaveContext::new(32, 8).with_exec(ExecMask(0x0000_00FF));
//! ctx.vgprs.write_lane(1, 0, 42).unwrap();
//! assert_eq!(ctx.vgprs.read_lane(1, 0).unwrap(), 42);
//! assert_eq!(ctx.exec.count(ctx.lanes()), 8);
//! ```

mod context;
mod registers;

pub use context::{AccumWindow, ExecMask, WaveContext};
pub use registers::{LaneValue, VectorRegisterFile, MAX_LANES};
