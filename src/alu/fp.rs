//! Software binary16 floating-point unit.
//!
//! [`SoftFp`] implements the [`FpUnit`] primitives the packed ALU consumes.
//! Operand storage and widening go through [`half::f16`]; arithmetic is done
//! on exact double-precision intermediates and then rounded once to binary16
//! by [`round_to_f16`], so results are correctly rounded in every mode.
//!
//! NaN handling follows ARM `fplib` (default-NaN mode off, no
//! flush-to-zero):
//!
//! - A signalling NaN operand raises Invalid and is returned quietened.
//! - Signalling NaNs take priority over quiet NaNs, then operand order.
//! - Invalid operations (`inf - inf`, `0 * inf`) return the default NaN
//!   `0x7E00`.
//! - `min`/`max` are IEEE 754-2008 `minimum`/`maximum`-style: any NaN
//!   propagates, and `-0 < +0`.

use std::fmt;

use half::f16;

use super::traits::FpUnit;

/// binary16 `+0.0`.
pub const F16_ZERO: u16 = 0x0000;
/// binary16 `1.0`.
pub const F16_ONE: u16 = 0x3C00;
/// binary16 default NaN.
pub const F16_DEFAULT_NAN: u16 = 0x7E00;

const F16_SIGN: u16 = 0x8000;
const F16_EXP: u16 = 0x7C00;
const F16_MANT: u16 = 0x03FF;
const F16_QUIET: u16 = 0x0200;
const F16_INF: u16 = 0x7C00;
const F16_MAX: u16 = 0x7BFF;

const F32_SIGN: u32 = 0x8000_0000;
const F32_EXP: u32 = 0x7F80_0000;
const F32_MANT: u32 = 0x007F_FFFF;
const F32_QUIET: u32 = 0x0040_0000;

/// IEEE 754 rounding direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    #[default]
    TiesToEven,
    /// Round toward +infinity.
    TowardPositive,
    /// Round toward -infinity.
    TowardNegative,
    /// Round toward zero (truncate).
    TowardZero,
}

/// Sticky exception flags raised during one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FpFlags {
    /// Invalid operation (signalling NaN input, `inf - inf`, `0 * inf`).
    pub invalid: bool,
    /// Result magnitude exceeded the format.
    pub overflow: bool,
    /// Tiny and inexact result.
    pub underflow: bool,
    /// Result was rounded.
    pub inexact: bool,
}

impl FpFlags {
    /// Whether any flag is raised.
    pub fn any(&self) -> bool {
        self.invalid || self.overflow || self.underflow || self.inexact
    }

    /// OR another set of flags into this one.
    pub fn merge(&mut self, other: FpFlags) {
        self.invalid |= other.invalid;
        self.overflow |= other.overflow;
        self.underflow |= other.underflow;
        self.inexact |= other.inexact;
    }
}

impl fmt::Display for FpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.invalid, "invalid"),
            (self.overflow, "overflow"),
            (self.underflow, "underflow"),
            (self.inexact, "inexact"),
        ];
        let raised: Vec<&str> = names.iter().filter(|(on, _)| *on).map(|(_, n)| *n).collect();
        if raised.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", raised.join("|"))
        }
    }
}

/// Per-evaluation floating-point state handed to every primitive.
///
/// Created fresh for each instruction and discarded afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FpContext {
    /// Rounding direction for arithmetic results.
    pub rounding: RoundingMode,
    /// Exceptions raised so far.
    pub flags: FpFlags,
}

impl FpContext {
    /// Context with the given rounding direction and clear flags.
    pub fn with_rounding(rounding: RoundingMode) -> Self {
        Self {
            rounding,
            flags: FpFlags::default(),
        }
    }
}

// ========== binary16 classification ==========

#[inline]
fn is_nan16(x: u16) -> bool {
    x & F16_EXP == F16_EXP && x & F16_MANT != 0
}

#[inline]
fn is_snan16(x: u16) -> bool {
    is_nan16(x) && x & F16_QUIET == 0
}

#[inline]
fn is_inf16(x: u16) -> bool {
    x & !F16_SIGN == F16_INF
}

#[inline]
fn is_zero16(x: u16) -> bool {
    x & !F16_SIGN == 0
}

#[inline]
fn sign16(x: u16) -> bool {
    x & F16_SIGN != 0
}

#[inline]
fn value16(x: u16) -> f64 {
    f16::from_bits(x).to_f64()
}

#[inline]
fn signed_zero16(negative: bool) -> u16 {
    if negative {
        F16_SIGN
    } else {
        F16_ZERO
    }
}

#[inline]
fn signed_inf16(negative: bool) -> u16 {
    signed_zero16(negative) | F16_INF
}

/// Pick the NaN to propagate out of `ops`, if any.
///
/// Signalling NaNs win over quiet ones and raise Invalid; within a class the
/// first operand wins. The returned NaN is always quiet.
fn process_nans16(ops: &[u16], ctx: &mut FpContext) -> Option<u16> {
    if let Some(&snan) = ops.iter().find(|&&x| is_snan16(x)) {
        ctx.flags.invalid = true;
        return Some(snan | F16_QUIET);
    }
    ops.iter().copied().find(|&x| is_nan16(x))
}

/// Exact sum of two doubles as `(rounded, error)`.
#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

/// Fold a rounding error term into `s` with round-to-odd.
///
/// The adjusted value lies strictly inside the same binary16 rounding
/// interval as `s + err`, so a single rounding of it to binary16 is exact
/// for every mode.
fn round_to_odd(s: f64, err: f64) -> f64 {
    if err == 0.0 || !s.is_finite() {
        return s;
    }
    let bits = s.to_bits();
    if bits & 1 == 1 {
        return s;
    }
    let away_from_zero = (err > 0.0) == (s > 0.0);
    f64::from_bits(if away_from_zero { bits + 1 } else { bits - 1 })
}

/// Round a finite, non-zero double to binary16.
///
/// Tininess is detected before rounding.
pub fn round_to_f16(value: f64, mode: RoundingMode, ctx: &mut FpContext) -> u16 {
    debug_assert!(value.is_finite() && value != 0.0);

    let negative = value.is_sign_negative();
    let bits = value.to_bits();
    let raw_exp = ((bits >> 52) & 0x7FF) as i32;
    let frac = bits & ((1u64 << 52) - 1);

    // value = mant * 2^(exp - 52)
    let (exp, mant) = if raw_exp == 0 {
        // f64 subnormal: far below the binary16 range, only its sign and
        // stickiness matter.
        (-1074 + 52, frac)
    } else {
        (raw_exp - 1023, frac | (1u64 << 52))
    };

    // binary16 quantum at this magnitude.
    let eff_exp = exp.max(-14);
    let shift = (eff_exp - 10 - (exp - 52)) as u32;

    let (kept, rem, half) = if shift >= 64 {
        (0u64, mant, None)
    } else {
        let rem = mant & ((1u64 << shift) - 1);
        (mant >> shift, rem, Some(1u64 << (shift - 1)))
    };

    let inexact = rem != 0;
    let round_up = match mode {
        RoundingMode::TiesToEven => match half {
            Some(h) => rem > h || (rem == h && kept & 1 == 1),
            // Everything sits below half an ulp.
            None => false,
        },
        RoundingMode::TowardZero => false,
        RoundingMode::TowardPositive => inexact && !negative,
        RoundingMode::TowardNegative => inexact && negative,
    };

    let magnitude = (((eff_exp + 14) as u64) << 10) + kept + round_up as u64;

    if magnitude >= F16_INF as u64 {
        ctx.flags.overflow = true;
        ctx.flags.inexact = true;
        let to_inf = match mode {
            RoundingMode::TiesToEven => true,
            RoundingMode::TowardZero => false,
            RoundingMode::TowardPositive => !negative,
            RoundingMode::TowardNegative => negative,
        };
        let mag = if to_inf { F16_INF } else { F16_MAX };
        return signed_zero16(negative) | mag;
    }

    if inexact {
        ctx.flags.inexact = true;
        if exp < -14 {
            ctx.flags.underflow = true;
        }
    }

    signed_zero16(negative) | magnitude as u16
}

/// Round an exact `sum + err` to binary16, with IEEE exact-zero signs.
fn round_sum_to_f16(sum: f64, err: f64, ctx: &mut FpContext) -> u16 {
    if sum == 0.0 && err == 0.0 {
        return signed_zero16(ctx.rounding == RoundingMode::TowardNegative);
    }
    let mode = ctx.rounding;
    round_to_f16(round_to_odd(sum, err), mode, ctx)
}

/// Software binary16 unit with ARM `fplib` NaN semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftFp;

impl SoftFp {
    /// Create a new software FPU.
    pub const fn new() -> Self {
        SoftFp
    }

    fn min_max(&self, a: u16, b: u16, want_max: bool, ctx: &mut FpContext) -> u16 {
        if let Some(nan) = process_nans16(&[a, b], ctx) {
            return nan;
        }

        if is_zero16(a) && is_zero16(b) {
            let negative = if want_max {
                sign16(a) && sign16(b)
            } else {
                sign16(a) || sign16(b)
            };
            return signed_zero16(negative);
        }

        let (va, vb) = (value16(a), value16(b));
        let pick_a = if want_max { va > vb } else { va < vb };
        if pick_a {
            a
        } else {
            b
        }
    }
}

impl FpUnit for SoftFp {
    fn min_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16 {
        self.min_max(a, b, false, ctx)
    }

    fn max_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16 {
        self.min_max(a, b, true, ctx)
    }

    fn add_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16 {
        if let Some(nan) = process_nans16(&[a, b], ctx) {
            return nan;
        }

        match (is_inf16(a), is_inf16(b)) {
            (true, true) if sign16(a) != sign16(b) => {
                ctx.flags.invalid = true;
                return F16_DEFAULT_NAN;
            }
            (true, _) => return a,
            (_, true) => return b,
            _ => {}
        }

        if is_zero16(a) && is_zero16(b) && sign16(a) == sign16(b) {
            return a;
        }

        // Sums of binary16 values are exact in binary64.
        round_sum_to_f16(value16(a) + value16(b), 0.0, ctx)
    }

    fn mul_f16(&self, a: u16, b: u16, ctx: &mut FpContext) -> u16 {
        if let Some(nan) = process_nans16(&[a, b], ctx) {
            return nan;
        }

        let negative = sign16(a) != sign16(b);
        let (inf_a, inf_b) = (is_inf16(a), is_inf16(b));
        let (zero_a, zero_b) = (is_zero16(a), is_zero16(b));

        if (inf_a && zero_b) || (zero_a && inf_b) {
            ctx.flags.invalid = true;
            return F16_DEFAULT_NAN;
        }
        if inf_a || inf_b {
            return signed_inf16(negative);
        }
        if zero_a || zero_b {
            return signed_zero16(negative);
        }

        // 11-bit by 11-bit significands: exact in binary64.
        let mode = ctx.rounding;
        round_to_f16(value16(a) * value16(b), mode, ctx)
    }

    fn mul_add_f16(&self, addend: u16, a: u16, b: u16, ctx: &mut FpContext) -> u16 {
        let (inf_a, inf_b) = (is_inf16(a), is_inf16(b));
        let (zero_a, zero_b) = (is_zero16(a), is_zero16(b));
        let invalid_product = (inf_a && zero_b) || (zero_a && inf_b);

        if let Some(nan) = process_nans16(&[addend, a, b], ctx) {
            // A quiet NaN addend does not hide an invalid product.
            if invalid_product && !is_snan16(addend) {
                ctx.flags.invalid = true;
                return F16_DEFAULT_NAN;
            }
            return nan;
        }

        let sign_p = sign16(a) != sign16(b);
        let sign_c = sign16(addend);
        let inf_p = inf_a || inf_b;
        let zero_p = zero_a || zero_b;
        let inf_c = is_inf16(addend);

        if invalid_product || (inf_c && inf_p && sign_c != sign_p) {
            ctx.flags.invalid = true;
            return F16_DEFAULT_NAN;
        }
        if inf_c {
            return addend;
        }
        if inf_p {
            return signed_inf16(sign_p);
        }
        if is_zero16(addend) && zero_p && sign_c == sign_p {
            return addend;
        }

        let product = value16(a) * value16(b);
        let (sum, err) = two_sum(product, value16(addend));
        round_sum_to_f16(sum, err, ctx)
    }

    fn f16_to_f32(&self, a: u16, _mode: RoundingMode, ctx: &mut FpContext) -> u32 {
        if is_nan16(a) {
            if is_snan16(a) {
                ctx.flags.invalid = true;
            }
            let sign = ((a & F16_SIGN) as u32) << 16;
            let payload = ((a & F16_MANT) as u32) << 13;
            return sign | F32_EXP | F32_QUIET | payload;
        }
        // Every binary16 value is representable in binary32.
        f16::from_bits(a).to_f32().to_bits()
    }

    fn f32_to_f16(&self, a: u32, mode: RoundingMode, ctx: &mut FpContext) -> u16 {
        let negative = a & F32_SIGN != 0;
        let exp = a & F32_EXP;
        let mant = a & F32_MANT;

        if exp == F32_EXP {
            if mant == 0 {
                return signed_inf16(negative);
            }
            if mant & F32_QUIET == 0 {
                ctx.flags.invalid = true;
            }
            let payload = (mant >> 13) as u16 & F16_MANT;
            return signed_zero16(negative) | F16_EXP | F16_QUIET | payload;
        }
        if exp == 0 && mant == 0 {
            return signed_zero16(negative);
        }

        round_to_f16(f32::from_bits(a) as f64, mode, ctx)
    }
}
