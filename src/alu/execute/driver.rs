//! Lane-masked execution driver.
//!
//! Sources are snapshotted into [`VectorView`]s before anything is written,
//! so a destination that aliases a source still reads the pre-instruction
//! value. Results go into a staged copy of the destination which is
//! committed in one step once every active lane has been evaluated.

use crate::alu::catalog::Operand;
use crate::alu::state::{ExecMask, LaneValue, VectorRegisterFile, WaveContext};
use crate::alu::traits::RegisterError;

/// Read-only per-lane snapshot of one source operand.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorView<T> {
    /// One value per lane.
    Lanes(Vec<T>),
    /// The same value in every lane.
    Splat(T),
}

impl<T: LaneValue> VectorView<T> {
    /// Snapshot an operand. Immediates are truncated to `T`.
    pub fn load(vgprs: &VectorRegisterFile, operand: Operand) -> Result<Self, RegisterError> {
        match operand {
            Operand::Vgpr(reg) => Ok(VectorView::Lanes(vgprs.read_lanes(reg as u32)?)),
            Operand::Imm(imm) => Ok(VectorView::Splat(T::from_imm(imm))),
        }
    }

    /// Value seen by `lane`.
    #[inline]
    pub fn lane(&self, lane: usize) -> T {
        match self {
            VectorView::Lanes(values) => values.get(lane).copied().unwrap_or_default(),
            VectorView::Splat(value) => *value,
        }
    }
}

/// Applies a per-lane function under an exec mask.
pub struct LaneDriver;

impl LaneDriver {
    /// Evaluate `f` for every active lane into `staged`.
    ///
    /// Inactive lanes keep whatever `staged` already holds. Returns the
    /// number of lanes written.
    pub fn apply<T, F>(exec: ExecMask, staged: &mut [T], mut f: F) -> usize
    where
        T: LaneValue,
        F: FnMut(usize) -> T,
    {
        let mut written = 0;
        for lane in exec.iter_active(staged.len()) {
            let value = f(lane);
            log::trace!("  lane {:2}: {:#x?}", lane, value);
            staged[lane] = value;
            written += 1;
        }
        written
    }

    /// Stage `dest`, apply `f` under the context's exec mask and commit.
    ///
    /// `dest` is validated before `f` runs for any lane.
    pub fn run<T, F>(ctx: &mut WaveContext, dest: u32, f: F) -> Result<usize, RegisterError>
    where
        T: LaneValue,
        F: FnMut(usize) -> T,
    {
        let mut staged: Vec<T> = ctx.vgprs.read_lanes(dest)?;
        let written = Self::apply(ctx.exec, &mut staged, f);
        ctx.vgprs.commit(dest, &staged)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_lanes_untouched() {
        let mut staged = vec![7u32; 8];
        let n = LaneDriver::apply(ExecMask(0b0000_0101), &mut staged, |lane| lane as u32 * 10);
        assert_eq!(n, 2);
        assert_eq!(staged, vec![0, 7, 20, 7, 7, 7, 7, 7]);
    }

    #[test]
    fn test_empty_mask_writes_nothing() {
        let mut staged = vec![1u64; 4];
        let n = LaneDriver::apply(ExecMask::none(), &mut staged, |_| 0);
        assert_eq!(n, 0);
        assert_eq!(staged, vec![1; 4]);
    }

    #[test]
    fn test_views() {
        let mut vrf = VectorRegisterFile::new(4, 4);
        vrf.commit(1, &[1u32, 2, 3, 4]).unwrap();

        let v = VectorView::<u32>::load(&vrf, Operand::Vgpr(1)).unwrap();
        assert_eq!(v.lane(2), 3);

        let imm = VectorView::<u32>::load(&vrf, Operand::Imm(0x1_0000_0005)).unwrap();
        assert_eq!(imm, VectorView::Splat(5));

        let pair = VectorView::<u64>::load(&vrf, Operand::Vgpr(0)).unwrap();
        assert_eq!(pair.lane(3), 4u64 << 32);

        assert!(VectorView::<u64>::load(&vrf, Operand::Vgpr(3)).is_err());
    }

    #[test]
    fn test_run_sees_snapshot_and_commits() {
        let mut ctx = WaveContext::new(4, 2).with_exec(ExecMask(0b0110));
        ctx.vgprs.commit(0, &[1u32, 2, 3, 4]).unwrap();

        let src = VectorView::<u32>::load(&ctx.vgprs, Operand::Vgpr(0)).unwrap();
        let n = LaneDriver::run(&mut ctx, 0, |lane| src.lane(lane) + 100).unwrap();

        assert_eq!(n, 2);
        assert_eq!(ctx.vgprs.read_lanes::<u32>(0).unwrap(), vec![1, 102, 103, 4]);
    }

    #[test]
    fn test_run_rejects_bad_dest_before_evaluating() {
        let mut ctx = WaveContext::new(4, 2);
        let mut calls = 0;
        let r = LaneDriver::run::<u64, _>(&mut ctx, 1, |_| {
            calls += 1;
            0
        });
        assert!(r.is_err());
        assert_eq!(calls, 0);
    }
}
