//! Wavefront execution context.
//!
//! The `WaveContext` holds everything an instruction touches: the vector
//! register file, the active-lane mask and the accumulator window.

use std::fmt;

use super::registers::{VectorRegisterFile, MAX_LANES};

/// Active-lane mask, one bit per lane.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecMask(pub u64);

impl ExecMask {
    /// All of the first `lanes` lanes active.
    pub fn all(lanes: usize) -> Self {
        if lanes >= MAX_LANES {
            ExecMask(u64::MAX)
        } else {
            ExecMask((1u64 << lanes) - 1)
        }
    }

    /// No lanes active.
    pub const fn none() -> Self {
        ExecMask(0)
    }

    #[inline]
    pub fn is_active(self, lane: usize) -> bool {
        lane < MAX_LANES && (self.0 >> lane) & 1 != 0
    }

    /// Active lanes below `lanes`, ascending.
    pub fn iter_active(self, lanes: usize) -> impl Iterator<Item = usize> {
        (0..lanes.min(MAX_LANES)).filter(move |&l| self.is_active(l))
    }

    /// Number of active lanes below `lanes`.
    pub fn count(self, lanes: usize) -> usize {
        (self.0 & ExecMask::all(lanes).0).count_ones() as usize
    }
}

impl fmt::Debug for ExecMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecMask(0x{:016X})", self.0)
    }
}

/// Offset from an architectural VGPR index to the accumulator register it
/// aliases in the unified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccumWindow {
    pub offset: u32,
}

impl AccumWindow {
    pub const fn new(offset: u32) -> Self {
        Self { offset }
    }

    /// Physical register for accumulator index `reg`.
    #[inline]
    pub fn resolve(self, reg: u32) -> u32 {
        reg.saturating_add(self.offset)
    }
}

/// State visible to one packed instruction.
#[derive(Debug, Clone)]
pub struct WaveContext {
    pub vgprs: VectorRegisterFile,
    pub exec: ExecMask,
    pub accum: AccumWindow,
}

impl WaveContext {
    /// Zeroed registers, all lanes active, accumulator offset zero.
    pub fn new(lanes: usize, vgpr_count: usize) -> Self {
        let vgprs = VectorRegisterFile::new(lanes, vgpr_count);
        let exec = ExecMask::all(vgprs.lanes());
        Self {
            vgprs,
            exec,
            accum: AccumWindow::default(),
        }
    }

    /// Set the accumulator window.
    pub fn with_accum(mut self, accum: AccumWindow) -> Self {
        self.accum = accum;
        self
    }

    /// Set the active-lane mask.
    pub fn with_exec(mut self, exec: ExecMask) -> Self {
        self.exec = exec;
        self
    }

    #[inline]
    pub fn lanes(&self) -> usize {
        self.vgprs.lanes()
    }
}
