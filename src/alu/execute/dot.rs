//! Dot-product reducer.
//!
//! Sources 0 and 1 are split into `32 / w` fields. Each pair of fields is
//! multiplied and clamped on its own before it joins the sum, so an
//! overflowing component never bleeds into its neighbours. The sum wraps at
//! 32 bits and source 2 (the bias) is added last.

use crate::alu::catalog::{Opcode, Signedness};
use crate::alu::codec::{half16, split_signed, split_unsigned, FieldWidth};
use crate::alu::fp::{FpContext, RoundingMode};
use crate::alu::saturate::{clamp_signed, clamp_unit_f32, clamp_unsigned};
use crate::alu::traits::FpUnit;

/// Evaluate one lane of a dot-product opcode.
pub fn evaluate<F: FpUnit + ?Sized>(
    op: Opcode,
    src: &[u32; 3],
    clamp: bool,
    fpu: &F,
    ctx: &mut FpContext,
) -> u32 {
    let desc = op.descriptor();
    match desc.signedness {
        Signedness::Signed => dot_signed(src, desc.field_width, clamp),
        Signedness::Unsigned => dot_unsigned(src, desc.field_width, clamp),
        Signedness::Float => dot_f16(src, clamp, fpu, ctx),
        Signedness::Bits => {
            debug_assert!(false, "{} is not a dot-product opcode", op);
            0
        }
    }
}

fn dot_signed(src: &[u32; 3], width: FieldWidth, clamp: bool) -> u32 {
    let bits = width.bits();
    let (Ok(a), Ok(b)) = (
        split_signed(src[0] as u64, 32, width),
        split_signed(src[1] as u64, 32, width),
    ) else {
        return 0;
    };

    let sum = a.iter().zip(b.iter()).fold(0i32, |acc, (&x, &y)| {
        // Clamped or truncated back to the field width, then sign-extended.
        let p = clamp_signed(x * y, bits, clamp);
        acc.wrapping_add(p as i32)
    });
    sum.wrapping_add(src[2] as i32) as u32
}

fn dot_unsigned(src: &[u32; 3], width: FieldWidth, clamp: bool) -> u32 {
    let bits = width.bits();
    let (Ok(a), Ok(b)) = (
        split_unsigned(src[0] as u64, 32, width),
        split_unsigned(src[1] as u64, 32, width),
    ) else {
        return 0;
    };

    let sum = a.iter().zip(b.iter()).fold(0u32, |acc, (&x, &y)| {
        let p = x * y;
        // Unclamped products keep every bit.
        let p = if clamp {
            clamp_unsigned(p as i64, bits, true)
        } else {
            p
        };
        acc.wrapping_add(p as u32)
    });
    sum.wrapping_add(src[2])
}

fn dot_f16<F: FpUnit + ?Sized>(src: &[u32; 3], clamp: bool, fpu: &F, ctx: &mut FpContext) -> u32 {
    let mut sum = 0.0f32;
    for hi in [false, true] {
        let p = fpu.mul_f16(half16(src[0], hi), half16(src[1], hi), ctx);
        let wide = f32::from_bits(fpu.f16_to_f32(p, RoundingMode::TiesToEven, ctx));
        sum += clamp_unit_f32(wide, clamp);
    }
    (sum + f32::from_bits(src[2])).to_bits()
}
