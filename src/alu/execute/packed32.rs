//! Packed-32 dual-lane float ALU.
//!
//! Operands are register pairs holding two binary32 values. Source `i`
//! contributes its high dword to the low result when OPSEL bit `i` is set,
//! and to the high result when OPSEL_HI bit `i` is set. NEG/NEG_HI bit `i`
//! flips the IEEE sign of source `i`'s selected dword.

use crate::alu::catalog::{Modifiers, Opcode};
use crate::alu::codec::half32;

#[inline]
fn operand(src: &[u64; 3], mods: &Modifiers, i: usize, hi: bool) -> f32 {
    let v = f32::from_bits(half32(src[i], mods.select(i, hi)));
    if mods.negate(i, hi) {
        -v
    } else {
        v
    }
}

/// One binary32 result for the low or high half.
fn compute(op: Opcode, src: &[u64; 3], mods: &Modifiers, hi: bool) -> u32 {
    let a = operand(src, mods, 0, hi);
    let b = operand(src, mods, 1, hi);
    let r = match op {
        Opcode::PkFmaF32 => a.mul_add(b, operand(src, mods, 2, hi)),
        Opcode::PkMulF32 => a * b,
        Opcode::PkAddF32 => a + b,
        _ => {
            debug_assert!(false, "{} is not a packed-32 float opcode", op);
            0.0
        }
    };
    r.to_bits()
}

/// Evaluate one lane. Returns `hi << 32 | lo`.
pub fn evaluate(op: Opcode, src: &[u64; 3], mods: &Modifiers) -> u64 {
    if op == Opcode::PkMovB32 {
        return mov(src, mods);
    }
    let lo = compute(op, src, mods, false);
    let hi = compute(op, src, mods, true);
    (hi as u64) << 32 | lo as u64
}

/// `v_pk_mov_b32`: low result from source 0, high result from source 1,
/// each picking its dword with OPSEL bit 0 and bit 1. Raw copy.
fn mov(src: &[u64; 3], mods: &Modifiers) -> u64 {
    let lo = half32(src[0], mods.select(0, false));
    let hi = half32(src[1], mods.select(1, false));
    (hi as u64) << 32 | lo as u64
}
