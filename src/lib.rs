//! packed-alu library
//!
//! Bit-exact evaluation of packed sub-word vector ALU instructions.

pub mod alu;
pub mod config;
