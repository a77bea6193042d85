//! Packed-field codec.
//!
//! Reinterprets a register word as a little-endian sequence of equal-width
//! fields (field 0 in the least-significant bits) and packs such a sequence
//! back. Split followed by join is the identity for every width.

use smallvec::SmallVec;
use thiserror::Error;

use super::saturate::sign_extend;

/// Field sequence for one register. Inline up to 16 fields (8 x 4-bit in a
/// word, 16 x 4-bit in a pair).
pub type Fields<T> = SmallVec<[T; 16]>;

/// Codec errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported field width: {0} bits")]
    UnsupportedWidth(u32),

    #[error("field width {field} does not divide register width {register}")]
    Indivisible { field: u32, register: u32 },

    #[error("register width {0} is not 32 or 64")]
    RegisterWidth(u32),
}

/// Sub-word field width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldWidth {
    W4,
    W8,
    W16,
    W32,
}

impl FieldWidth {
    /// Width from a bit count.
    pub fn new(bits: u32) -> Result<Self, CodecError> {
        match bits {
            4 => Ok(FieldWidth::W4),
            8 => Ok(FieldWidth::W8),
            16 => Ok(FieldWidth::W16),
            32 => Ok(FieldWidth::W32),
            other => Err(CodecError::UnsupportedWidth(other)),
        }
    }

    /// Bits per field.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            FieldWidth::W4 => 4,
            FieldWidth::W8 => 8,
            FieldWidth::W16 => 16,
            FieldWidth::W32 => 32,
        }
    }

    #[inline]
    fn mask(self) -> u64 {
        (1u64 << self.bits()) - 1
    }

    /// Number of fields in a register of `reg_width` bits.
    pub fn count(self, reg_width: u32) -> Result<usize, CodecError> {
        if reg_width != 32 && reg_width != 64 {
            return Err(CodecError::RegisterWidth(reg_width));
        }
        // Every width divides 32 and 64; kept for widths added later.
        if reg_width % self.bits() != 0 {
            return Err(CodecError::Indivisible {
                field: self.bits(),
                register: reg_width,
            });
        }
        Ok((reg_width / self.bits()) as usize)
    }
}

/// Split into zero-extended fields.
pub fn split_unsigned(bits: u64, reg_width: u32, width: FieldWidth) -> Result<Fields<u64>, CodecError> {
    let n = width.count(reg_width)?;
    let w = width.bits();
    Ok((0..n).map(|i| (bits >> (i as u32 * w)) & width.mask()).collect())
}

/// Split into sign-extended fields.
pub fn split_signed(bits: u64, reg_width: u32, width: FieldWidth) -> Result<Fields<i64>, CodecError> {
    let w = width.bits();
    Ok(split_unsigned(bits, reg_width, width)?
        .into_iter()
        .map(|f| sign_extend(f, w))
        .collect())
}

/// Pack fields, least-significant first. Each field is masked to `width`;
/// fields past bit 63 are dropped.
pub fn join<I>(fields: I, width: FieldWidth) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let w = width.bits();
    fields
        .into_iter()
        .take((64 / w) as usize)
        .enumerate()
        .fold(0u64, |acc, (i, f)| acc | ((f & width.mask()) << (i as u32 * w)))
}

/// Low (`hi = false`) or high half of a 32-bit word.
#[inline]
pub fn half16(word: u32, hi: bool) -> u16 {
    if hi {
        (word >> 16) as u16
    } else {
        word as u16
    }
}

/// Low (`hi = false`) or high half of a 64-bit container.
#[inline]
pub fn half32(qword: u64, hi: bool) -> u32 {
    if hi {
        (qword >> 32) as u32
    } else {
        qword as u32
    }
}
