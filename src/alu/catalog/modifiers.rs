//! Instruction modifiers.

/// Execution mode requested by the encoding.
///
/// Only [`ExecMode::Native`] is valid for packed instructions; the others
/// exist so a decoder can pass the request through and have it rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    #[default]
    Native,
    /// Sub-dword addressing.
    Sdwa,
    /// Data-parallel primitives (cross-lane).
    Dpp,
}

/// Modifier fields of a packed instruction. Bit `i` of each mask belongs
/// to source `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    /// Half feeding the low result (0 = low, 1 = high).
    pub opsel: u8,
    /// Half feeding the high result.
    pub opsel_hi: u8,
    /// Sign flip on the half feeding the low result.
    pub neg: u8,
    /// Sign flip on the half feeding the high result.
    pub neg_hi: u8,
    pub clamp: bool,
    pub mode: ExecMode,
}

impl Default for Modifiers {
    /// Assembler default: low halves to the low result, high halves to the
    /// high result.
    fn default() -> Self {
        Self {
            opsel: 0,
            opsel_hi: 0b111,
            neg: 0,
            neg_hi: 0,
            clamp: false,
            mode: ExecMode::Native,
        }
    }
}

impl Modifiers {
    #[inline]
    fn bit(mask: u8, src: usize) -> bool {
        (mask >> src) & 1 != 0
    }

    /// Half of source `src` feeding the result half `hi`.
    #[inline]
    pub fn select(&self, src: usize, hi: bool) -> bool {
        Self::bit(if hi { self.opsel_hi } else { self.opsel }, src)
    }

    /// Whether source `src` is negated for the result half `hi`.
    #[inline]
    pub fn negate(&self, src: usize, hi: bool) -> bool {
        Self::bit(if hi { self.neg_hi } else { self.neg }, src)
    }

    /// Any NEG or NEG_HI bit set for the first `arity` sources.
    pub fn has_neg(&self, arity: usize) -> bool {
        let m = Self::arity_mask(arity);
        (self.neg | self.neg_hi) & m != 0
    }

    /// OPSEL/OPSEL_HI differ from the assembler default.
    pub fn has_opsel(&self, arity: usize) -> bool {
        let m = Self::arity_mask(arity);
        self.opsel & m != 0 || self.opsel_hi & m != m
    }

    fn arity_mask(arity: usize) -> u8 {
        ((1u16 << arity.min(3)) - 1) as u8
    }
}
