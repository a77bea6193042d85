//! Packed-16 ALU.
//!
//! Each 32-bit source holds two 16-bit halves. The low result half is
//! computed from the halves picked by OPSEL, the high result half from the
//! halves picked by OPSEL_HI. A NEG (NEG_HI) bit flips bit 15 of the picked
//! half before it reaches the operation, for integer and float opcodes
//! alike.

use crate::alu::catalog::{Modifiers, Opcode};
use crate::alu::codec::half16;
use crate::alu::fp::FpContext;
use crate::alu::saturate::{clamp_i16, clamp_u16, clamp_unit_f16, clamp_unsigned};
use crate::alu::traits::FpUnit;

const SIGN16: u16 = 0x8000;

/// Gather the three operands for one result half.
#[inline]
fn operands(src: &[u32; 3], mods: &Modifiers, hi: bool) -> [u16; 3] {
    let mut out = [0u16; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut h = half16(src[i], mods.select(i, hi));
        if mods.negate(i, hi) {
            h ^= SIGN16;
        }
        *slot = h;
    }
    out
}

/// Evaluate one lane. Unused sources are ignored.
pub fn evaluate<F: FpUnit + ?Sized>(
    op: Opcode,
    src: &[u32; 3],
    mods: &Modifiers,
    fpu: &F,
    ctx: &mut FpContext,
) -> u32 {
    let lo = compute(op, operands(src, mods, false), mods.clamp, fpu, ctx);
    let hi = compute(op, operands(src, mods, true), mods.clamp, fpu, ctx);
    (hi as u32) << 16 | lo as u32
}

/// One 16-bit result from three selected halves.
fn compute<F: FpUnit + ?Sized>(
    op: Opcode,
    [a, b, c]: [u16; 3],
    clamp: bool,
    fpu: &F,
    ctx: &mut FpContext,
) -> u16 {
    let (sa, sb, sc) = (a as i16 as i32, b as i16 as i32, c as i16 as i32);
    let (ua, ub, uc) = (a as i32, b as i32, c as i32);

    match op {
        Opcode::PkMadI16 => clamp_i16(sa * sb + sc, clamp) as u16,
        // Product can exceed i32; saturate from 64 bits.
        Opcode::PkMadU16 => clamp_unsigned(a as i64 * b as i64 + c as i64, 16, clamp) as u16,
        Opcode::PkMulLoU16 => (a as u32 * b as u32) as u16,
        Opcode::PkAddI16 => clamp_i16(sa + sb, clamp) as u16,
        Opcode::PkSubI16 => clamp_i16(sa - sb, clamp) as u16,
        Opcode::PkAddU16 => clamp_u16(ua + ub, clamp),
        Opcode::PkSubU16 => clamp_u16(ua - ub, clamp),
        Opcode::PkMaxI16 => clamp_i16(sa.max(sb), clamp) as u16,
        Opcode::PkMinI16 => clamp_i16(sa.min(sb), clamp) as u16,
        Opcode::PkMaxU16 => clamp_u16(ua.max(ub), clamp),
        Opcode::PkMinU16 => clamp_u16(ua.min(ub), clamp),
        Opcode::PkLshlrevB16 => ((b as u32) << (a & 0xF)) as u16,
        Opcode::PkLshrrevB16 => b >> (a & 0xF),
        Opcode::PkAshrrevI16 => (sb >> (a & 0xF)) as u16,
        Opcode::PkFmaF16 => {
            let r = fpu.mul_add_f16(c, a, b, ctx);
            clamp_unit_f16(r, clamp, fpu, ctx)
        }
        Opcode::PkAddF16 => {
            let r = fpu.add_f16(a, b, ctx);
            clamp_unit_f16(r, clamp, fpu, ctx)
        }
        Opcode::PkMulF16 => {
            let r = fpu.mul_f16(a, b, ctx);
            clamp_unit_f16(r, clamp, fpu, ctx)
        }
        Opcode::PkMinF16 => {
            let r = fpu.min_f16(a, b, ctx);
            clamp_unit_f16(r, clamp, fpu, ctx)
        }
        Opcode::PkMaxF16 => {
            let r = fpu.max_f16(a, b, ctx);
            clamp_unit_f16(r, clamp, fpu, ctx)
        }
        _ => {
            debug_assert!(false, "{} is not a packed-16 opcode", op);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alu::fp::SoftFp;

    fn eval(op: Opcode, src: [u32; 3], mods: Modifiers) -> u32 {
        let mut ctx = FpContext::default();
        evaluate(op, &src, &mods, &SoftFp::new(), &mut ctx)
    }

    fn clamped() -> Modifiers {
        Modifiers {
            clamp: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_i16_saturates_per_half() {
        let src = [0x0001_7FFF, 0x0001_0001, 0];
        assert_eq!(eval(Opcode::PkAddI16, src, clamped()), 0x0002_7FFF);
        assert_eq!(eval(Opcode::PkAddI16, src, Modifiers::default()), 0x0002_8000);
    }

    #[test]
    fn test_unsigned_sub_underflow() {
        let src = [0x0005_0000, 0x0003_0001, 0];
        assert_eq!(eval(Opcode::PkSubU16, src, clamped()), 0x0002_0000);
        assert_eq!(eval(Opcode::PkSubU16, src, Modifiers::default()), 0x0002_FFFF);
    }

    #[test]
    fn test_mad() {
        // lo: -2 * 3 + 1 = -5, hi: 200 * 200 + 0 saturates
        let src = [0x00C8_FFFE, 0x00C8_0003, 0x0000_0001];
        assert_eq!(eval(Opcode::PkMadI16, src, clamped()), 0x7FFF_FFFB);

        // u16: 0xFFFF * 0xFFFF + 1 saturates when clamped, wraps otherwise
        let src = [0x0000_FFFF, 0x0000_FFFF, 0x0000_0001];
        assert_eq!(eval(Opcode::PkMadU16, src, clamped()) & 0xFFFF, 0xFFFF);
        assert_eq!(eval(Opcode::PkMadU16, src, Modifiers::default()) & 0xFFFF, 0x0002);
    }

    #[test]
    fn test_mul_lo_ignores_clamp() {
        let src = [0x0100_FFFF, 0x0100_0002, 0];
        assert_eq!(eval(Opcode::PkMulLoU16, src, clamped()), 0x0000_FFFE);
    }

    #[test]
    fn test_min_max() {
        let src = [0x8000_0001, 0x7FFF_FFFF, 0];
        assert_eq!(eval(Opcode::PkMaxI16, src, Modifiers::default()), 0x7FFF_0001);
        assert_eq!(eval(Opcode::PkMinI16, src, Modifiers::default()), 0x8000_FFFF);
        assert_eq!(eval(Opcode::PkMaxU16, src, Modifiers::default()), 0x8000_FFFF);
        assert_eq!(eval(Opcode::PkMinU16, src, Modifiers::default()), 0x7FFF_0001);
    }

    #[test]
    fn test_shifts() {
        // Shift amount is source 0, masked to 4 bits.
        let src = [0x0011_0004, 0x8000_0F0F, 0];
        assert_eq!(eval(Opcode::PkLshlrevB16, src, Modifiers::default()), 0x0000_F0F0);
        assert_eq!(eval(Opcode::PkLshrrevB16, src, Modifiers::default()), 0x4000_00F0);
        assert_eq!(eval(Opcode::PkAshrrevI16, src, Modifiers::default()), 0xC000_00F0);
    }

    #[test]
    fn test_opsel_selects_halves() {
        // Swap source 0's halves, broadcast source 1's low half.
        let mods = Modifiers {
            opsel: 0b01,
            opsel_hi: 0b00,
            ..Default::default()
        };
        let src = [0x0010_0020, 0x0001_0002, 0];
        // lo = 0x10 + 0x2, hi = 0x20 + 0x2
        assert_eq!(eval(Opcode::PkAddU16, src, mods), 0x0022_0012);
    }

    #[test]
    fn test_neg_flips_msb() {
        let mods = Modifiers {
            neg: 0b10,
            ..Default::default()
        };
        // f16: 1.0 + -(1.0) = +0.0 in the low half; high half untouched
        let src = [0x4000_3C00, 0x3C00_3C00, 0];
        assert_eq!(eval(Opcode::PkAddF16, src, mods), 0x4200_0000);

        // Integers see the raw bit flip: 1 ^ 0x8000 = -32767
        let src = [0x0000_0000, 0x0000_0001, 0];
        assert_eq!(eval(Opcode::PkAddI16, src, mods) & 0xFFFF, 0x8001);
    }

    #[test]
    fn test_f16_ops_and_clamp() {
        // 1.5 * 2.0 = 3.0 -> clamped to 1.0; -1.0 * 2.0 -> 0.0
        let src = [0xBC00_3E00, 0x4000_4000, 0];
        assert_eq!(eval(Opcode::PkMulF16, src, clamped()), 0x0000_3C00);
        assert_eq!(eval(Opcode::PkMulF16, src, Modifiers::default()), 0xC000_4200);

        // fma: 2 * 3 + 1 = 7 in both halves
        let src = [0x4000_4000, 0x4200_4200, 0x3C00_3C00];
        assert_eq!(eval(Opcode::PkFmaF16, src, Modifiers::default()), 0x4700_4700);

        let src = [0x3C00_8000, 0x4000_0000, 0];
        assert_eq!(eval(Opcode::PkMinF16, src, Modifiers::default()), 0x3C00_8000);
        assert_eq!(eval(Opcode::PkMaxF16, src, Modifiers::default()), 0x4000_0000);
    }
}
