//! Execution units for packed instructions.
//!
//! | Unit | Opcodes |
//! |------|---------|
//! | `packed16` | `v_pk_*_{i16,u16,b16,f16}` |
//! | `dot` | `v_dot{2,4,8}_*` |
//! | `packed32` | `v_pk_{fma,mul,add}_f32`, `v_pk_mov_b32` |
//! | `accum` | `v_accvgpr_{read,write}` |
//!
//! Each unit exposes a pure per-lane `evaluate` (or `route` for the
//! accumulator moves). The `driver` applies a per-lane function under the
//! exec mask, and `PackedExecutor` ties validation, dispatch and commit
//! together.

pub mod accum;
pub mod dot;
pub mod driver;
mod executor;
pub mod packed16;
pub mod packed32;

pub use driver::{LaneDriver, VectorView};
pub use executor::PackedExecutor;
