//! Saturation library.
//!
//! Pure clamps from a wide intermediate into a narrower signed or unsigned
//! field. Every function takes the instruction's clamp bit: with clamping
//! disabled the result is the plain N-bit truncation of the intermediate.
//!
//! | Function | Range |
//! |----------|-------|
//! | [`clamp_signed`] | `[-(2^(N-1)), 2^(N-1) - 1]` |
//! | [`clamp_unsigned`] | `[0, 2^N - 1]` |
//! | [`clamp_unit_f32`] | `[0.0, 1.0]`, plain comparison |
//! | [`clamp_unit_f16`] | `[0.0, 1.0]`, through the FPU min/max |

use super::fp::{FpContext, F16_ONE, F16_ZERO};
use super::traits::FpUnit;

/// Mask with the low `bits` bits set (`bits` in 1..=63).
#[inline]
fn low_mask(bits: u32) -> u64 {
    debug_assert!(bits > 0 && bits < 64);
    (1u64 << bits) - 1
}

/// Sign-extend the low `bits` bits of `value`.
#[inline]
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Clamp a signed intermediate into an N-bit signed range.
///
/// With `clamp` unset the low N bits are returned, sign-extended, which is
/// the wrapped value a plain N-bit register would hold.
pub fn clamp_signed(value: i64, bits: u32, clamp: bool) -> i64 {
    if !clamp {
        return sign_extend(value as u64 & low_mask(bits), bits);
    }

    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    value.clamp(min, max)
}

/// Clamp an intermediate into an N-bit unsigned range.
///
/// Negative intermediates saturate to zero.
pub fn clamp_unsigned(value: i64, bits: u32, clamp: bool) -> u64 {
    if !clamp {
        return value as u64 & low_mask(bits);
    }

    value.clamp(0, low_mask(bits) as i64) as u64
}

/// 16-bit signed saturation.
#[inline]
pub fn clamp_i16(value: i32, clamp: bool) -> i16 {
    if !clamp {
        return value as i16;
    }
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// 16-bit unsigned saturation.
#[inline]
pub fn clamp_u16(value: i32, clamp: bool) -> u16 {
    if !clamp {
        return value as u16;
    }
    value.clamp(0, u16::MAX as i32) as u16
}

/// Clamp a single-precision value into `[0.0, 1.0]`.
///
/// NaN is returned unchanged: neither comparison holds for it.
#[inline]
pub fn clamp_unit_f32(value: f32, clamp: bool) -> f32 {
    if !clamp {
        return value;
    }
    if value < 0.0 {
        0.0
    } else if value > 1.0 {
        1.0
    } else {
        value
    }
}

/// Clamp a binary16 value into `[0.0, 1.0]` with the FPU's own min/max.
///
/// `min(x, 1.0)` first, then `max(_, 0.0)`, so NaN handling and signed
/// zeros follow the floating-point unit rather than host comparisons.
pub fn clamp_unit_f16<F: FpUnit + ?Sized>(
    value: u16,
    clamp: bool,
    fpu: &F,
    ctx: &mut FpContext,
) -> u16 {
    if !clamp {
        return value;
    }

    let capped = fpu.min_f16(value, F16_ONE, ctx);
    fpu.max_f16(capped, F16_ZERO, ctx)
}
