//! Vector register file.
//!
//! Storage is register-major: all lanes of v0, then all lanes of v1, and
//! so on. A 64-bit operand is the pair `(r, r+1)` with the low dword in
//! `r`, so a pair never straddles anything but two adjacent registers.

use std::fmt;

use crate::alu::traits::RegisterError;

/// Maximum lanes in a wavefront (one bit per lane in the exec mask).
pub const MAX_LANES: usize = 64;

/// Per-lane value read from or written to the register file.
///
/// Implemented for `u32` (one register) and `u64` (a register pair).
pub trait LaneValue: Copy + Default + fmt::Debug {
    /// Registers occupied.
    const REGS: u32;

    /// Build from the low/high dwords.
    fn from_dwords(lo: u32, hi: u32) -> Self;

    /// Split into low/high dwords. `hi` is ignored for single registers.
    fn to_dwords(self) -> (u32, u32);

    /// Truncate an immediate to this width.
    fn from_imm(imm: u64) -> Self;
}

impl LaneValue for u32 {
    const REGS: u32 = 1;

    #[inline]
    fn from_dwords(lo: u32, _hi: u32) -> Self {
        lo
    }

    #[inline]
    fn to_dwords(self) -> (u32, u32) {
        (self, 0)
    }

    #[inline]
    fn from_imm(imm: u64) -> Self {
        imm as u32
    }
}

impl LaneValue for u64 {
    const REGS: u32 = 2;

    #[inline]
    fn from_dwords(lo: u32, hi: u32) -> Self {
        (hi as u64) << 32 | lo as u64
    }

    #[inline]
    fn to_dwords(self) -> (u32, u32) {
        (self as u32, (self >> 32) as u32)
    }

    #[inline]
    fn from_imm(imm: u64) -> Self {
        imm
    }
}

/// Vector general purpose registers for one wavefront.
#[derive(Clone)]
pub struct VectorRegisterFile {
    lanes: usize,
    count: usize,
    regs: Vec<u32>,
}

impl Default for VectorRegisterFile {
    fn default() -> Self {
        Self::new(MAX_LANES, 256)
    }
}

impl VectorRegisterFile {
    /// Create a zeroed file of `count` registers. `lanes` is clamped to
    /// `1..=64`.
    pub fn new(lanes: usize, count: usize) -> Self {
        let lanes = lanes.clamp(1, MAX_LANES);
        Self {
            lanes,
            count,
            regs: vec![0; lanes * count],
        }
    }

    /// Lanes per register.
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Number of registers.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Validate that registers `reg..reg+span` exist.
    pub fn check(&self, reg: u32, span: u32) -> Result<(), RegisterError> {
        if (reg as usize) + (span as usize) > self.count {
            return Err(RegisterError::OutOfRange {
                reg,
                span,
                count: self.count,
            });
        }
        Ok(())
    }

    #[inline]
    fn index(&self, reg: u32, lane: usize) -> usize {
        reg as usize * self.lanes + lane
    }

    /// Read one lane of a 32-bit register.
    pub fn read_lane(&self, reg: u32, lane: usize) -> Result<u32, RegisterError> {
        self.read_value(reg, lane)
    }

    /// Write one lane of a 32-bit register.
    pub fn write_lane(&mut self, reg: u32, lane: usize, value: u32) -> Result<(), RegisterError> {
        self.write_value(reg, lane, value)
    }

    /// Read one lane of a register or register pair.
    ///
    /// Lane indices wrap at the wavefront size.
    pub fn read_value<T: LaneValue>(&self, reg: u32, lane: usize) -> Result<T, RegisterError> {
        self.check(reg, T::REGS)?;
        let lane = lane % self.lanes;
        let lo = self.regs[self.index(reg, lane)];
        let hi = if T::REGS > 1 {
            self.regs[self.index(reg + 1, lane)]
        } else {
            0
        };
        Ok(T::from_dwords(lo, hi))
    }

    /// Write one lane of a register or register pair.
    pub fn write_value<T: LaneValue>(
        &mut self,
        reg: u32,
        lane: usize,
        value: T,
    ) -> Result<(), RegisterError> {
        self.check(reg, T::REGS)?;
        let lane = lane % self.lanes;
        let (lo, hi) = value.to_dwords();
        let i = self.index(reg, lane);
        self.regs[i] = lo;
        if T::REGS > 1 {
            let i = self.index(reg + 1, lane);
            self.regs[i] = hi;
        }
        Ok(())
    }

    /// Set every lane of `reg` to `value`.
    pub fn broadcast<T: LaneValue>(&mut self, reg: u32, value: T) -> Result<(), RegisterError> {
        for lane in 0..self.lanes {
            self.write_value(reg, lane, value)?;
        }
        Ok(())
    }

    /// Snapshot all lanes of a register (pair).
    pub fn read_lanes<T: LaneValue>(&self, reg: u32) -> Result<Vec<T>, RegisterError> {
        self.check(reg, T::REGS)?;
        (0..self.lanes).map(|lane| self.read_value(reg, lane)).collect()
    }

    /// Write a staged destination back in one step.
    ///
    /// Fails without writing anything if the register is out of range or
    /// `staged` does not cover exactly one value per lane.
    pub fn commit<T: LaneValue>(&mut self, reg: u32, staged: &[T]) -> Result<(), RegisterError> {
        self.check(reg, T::REGS)?;
        if staged.len() != self.lanes {
            return Err(RegisterError::LaneMismatch {
                staged: staged.len(),
                lanes: self.lanes,
            });
        }
        for (lane, &value) in staged.iter().enumerate() {
            self.write_value(reg, lane, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for VectorRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show non-zero registers
        let non_zero: Vec<_> = self
            .regs
            .chunks(self.lanes)
            .enumerate()
            .filter(|(_, v)| v.iter().any(|x| *x != 0))
            .collect();

        if non_zero.is_empty() {
            write!(f, "VectorRegisterFile {{ {} x {} lanes, all zero }}", self.count, self.lanes)
        } else {
            writeln!(f, "VectorRegisterFile {{")?;
            for (reg, lanes) in non_zero {
                write!(f, "  v{}: [", reg)?;
                for (i, v) in lanes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "0x{:08X}", v)?;
                }
                writeln!(f, "]")?;
            }
            write!(f, "}}")
        }
    }
}
