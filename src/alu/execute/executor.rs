//! Dispatching executor.
//!
//! The `PackedExecutor` runs one instruction over a wavefront:
//!
//! 1. Reject unsupported execution modes and malformed operand lists.
//! 2. Record modifiers the opcode ignores as warnings.
//! 3. Snapshot every source and validate the destination.
//! 4. Evaluate each active lane into a staged destination.
//! 5. Commit the staged destination.
//!
//! Nothing is written unless steps 1 and 3 succeed.

use smallvec::SmallVec;

use crate::alu::catalog::{
    ClampKind, Container, ExecMode, Instruction, ModifierKind, Modifiers, OpDescriptor, Opcode,
    Operand,
};
use crate::alu::fp::{FpContext, RoundingMode, SoftFp};
use crate::alu::state::{LaneValue, WaveContext};
use crate::alu::traits::{ExecError, Executor, FpUnit, ModifierWarning, Outcome};

use super::accum;
use super::dot;
use super::driver::{LaneDriver, VectorView};
use super::packed16;
use super::packed32;

/// Executor for the packed instruction catalog.
pub struct PackedExecutor<F: FpUnit = SoftFp> {
    fpu: F,
    rounding: RoundingMode,
}

impl PackedExecutor<SoftFp> {
    /// Executor backed by [`SoftFp`] with round-to-nearest-even.
    pub fn new() -> Self {
        Self::with_fpu(SoftFp::new())
    }
}

impl Default for PackedExecutor<SoftFp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FpUnit> PackedExecutor<F> {
    /// Executor backed by a caller-supplied floating-point unit.
    pub fn with_fpu(fpu: F) -> Self {
        Self {
            fpu,
            rounding: RoundingMode::default(),
        }
    }

    /// Rounding mode for binary16 arithmetic.
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn fpu(&self) -> &F {
        &self.fpu
    }

    /// Check mode, arity and destination. Returns the destination register.
    fn validate(inst: &Instruction, desc: &OpDescriptor) -> Result<u32, ExecError> {
        let opcode = inst.opcode;

        // No packed opcode has an SDWA or DPP form.
        if inst.modifiers.mode != ExecMode::Native {
            return Err(ExecError::UnsupportedMode {
                opcode,
                mode: inst.modifiers.mode,
            });
        }

        if inst.sources.len() != desc.arity {
            return Err(ExecError::OperandCount {
                opcode,
                expected: desc.arity,
                found: inst.sources.len(),
            });
        }

        match inst.dest {
            None => Err(ExecError::MissingDest { opcode }),
            Some(Operand::Imm(_)) => Err(ExecError::InvalidDest { opcode }),
            Some(Operand::Vgpr(r)) => Ok(r as u32),
        }
    }

    /// Strip modifiers the opcode does not define, reporting each one.
    fn effective_modifiers(
        inst: &Instruction,
        desc: &OpDescriptor,
    ) -> (Modifiers, SmallVec<[ModifierWarning; 2]>) {
        let opcode = inst.opcode;
        let mut mods = inst.modifiers;
        let mut warnings = SmallVec::new();

        if mods.clamp && desc.clamp == ClampKind::None {
            warnings.push(ModifierWarning::ClampIgnored { opcode });
            mods.clamp = false;
        }

        if desc.modifiers == ModifierKind::None && mods.has_opsel(desc.arity) {
            warnings.push(ModifierWarning::OpselIgnored { opcode });
            mods.opsel = Modifiers::default().opsel;
            mods.opsel_hi = Modifiers::default().opsel_hi;
        }

        if desc.modifiers != ModifierKind::Full && mods.has_neg(desc.arity) {
            warnings.push(ModifierWarning::NegIgnored { opcode });
            mods.neg = 0;
            mods.neg_hi = 0;
        }

        for w in &warnings {
            log::warn!("{}", w);
        }
        (mods, warnings)
    }

    /// Snapshot sources as `T`, padding the unused slots with zero.
    fn load_sources<T: LaneValue>(
        inst: &Instruction,
        ctx: &WaveContext,
    ) -> Result<[VectorView<T>; 3], ExecError> {
        let mut views = [
            VectorView::Splat(T::default()),
            VectorView::Splat(T::default()),
            VectorView::Splat(T::default()),
        ];
        for (view, &src) in views.iter_mut().zip(inst.sources.iter()) {
            *view = VectorView::load(&ctx.vgprs, src)?;
        }
        Ok(views)
    }

    fn run_b32(
        &self,
        opcode: Opcode,
        mods: &Modifiers,
        srcs: [VectorView<u32>; 3],
        dest: u32,
        ctx: &mut WaveContext,
        fp: &mut FpContext,
    ) -> Result<usize, ExecError> {
        let fpu = &self.fpu;
        let written = LaneDriver::run(ctx, dest, |lane| {
            let s = [srcs[0].lane(lane), srcs[1].lane(lane), srcs[2].lane(lane)];
            if opcode.is_dot() {
                dot::evaluate(opcode, &s, mods.clamp, fpu, fp)
            } else {
                packed16::evaluate(opcode, &s, mods, fpu, fp)
            }
        })?;
        Ok(written)
    }

    fn run_accum(
        &self,
        inst: &Instruction,
        dest: u32,
        ctx: &mut WaveContext,
    ) -> Result<usize, ExecError> {
        let (src, dest) = accum::route(inst.opcode, ctx.accum, inst.sources[0], dest);
        log::trace!("{}: {:?} -> v{}", inst.opcode, src, dest);
        let view: VectorView<u32> = VectorView::load(&ctx.vgprs, src)?;
        Ok(LaneDriver::run(ctx, dest, |lane| view.lane(lane))?)
    }
}

impl<F: FpUnit> Executor for PackedExecutor<F> {
    fn execute(&self, inst: &Instruction, ctx: &mut WaveContext) -> Result<Outcome, ExecError> {
        let desc = inst.descriptor();
        let dest = Self::validate(inst, &desc)?;

        log::debug!(
            "[EXEC {}] dest=v{} sources={:?} mods={:?} exec={:?}",
            inst.opcode,
            dest,
            inst.sources,
            inst.modifiers,
            ctx.exec
        );

        let (mods, warnings) = Self::effective_modifiers(inst, &desc);
        let mut fp = FpContext::with_rounding(self.rounding);

        let lanes_written = if inst.opcode.is_accum() {
            self.run_accum(inst, dest, ctx)?
        } else {
            match desc.container {
                Container::B32 => {
                    let srcs = Self::load_sources::<u32>(inst, ctx)?;
                    self.run_b32(inst.opcode, &mods, srcs, dest, ctx, &mut fp)?
                }
                Container::B64 => {
                    let srcs = Self::load_sources::<u64>(inst, ctx)?;
                    let opcode = inst.opcode;
                    LaneDriver::run(ctx, dest, |lane| {
                        let s = [srcs[0].lane(lane), srcs[1].lane(lane), srcs[2].lane(lane)];
                        packed32::evaluate(opcode, &s, &mods)
                    })?
                }
            }
        };

        if fp.flags.any() {
            log::trace!("[EXEC {}] fp flags: {}", inst.opcode, fp.flags);
        }

        Ok(Outcome {
            lanes_written,
            warnings,
            fp_flags: fp.flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alu::state::ExecMask;

    fn binary(op: Opcode, d: u16, a: u16, b: u16) -> Instruction {
        Instruction::new(op)
            .with_dest(Operand::Vgpr(d))
            .with_source(Operand::Vgpr(a))
            .with_source(Operand::Vgpr(b))
    }

    #[test]
    fn test_packed16_over_wave() {
        let mut ctx = WaveContext::new(32, 8);
        ctx.vgprs.broadcast(0, 0x0001_7FFFu32).unwrap();
        ctx.vgprs.broadcast(1, 0x0001_0001u32).unwrap();

        let exec = PackedExecutor::new();
        let out = exec
            .execute(&binary(Opcode::PkAddI16, 2, 0, 1).with_clamp(true), &mut ctx)
            .unwrap();
        assert_eq!(out.lanes_written, 32);
        assert!(out.warnings.is_empty());
        assert_eq!(ctx.vgprs.read_lane(2, 31).unwrap(), 0x0002_7FFF);
    }

    #[test]
    fn test_exec_mask_respected() {
        let mut ctx = WaveContext::new(4, 4).with_exec(ExecMask(0b1001));
        ctx.vgprs.broadcast(0, 1u32).unwrap();
        ctx.vgprs.broadcast(1, 2u32).unwrap();
        ctx.vgprs.broadcast(2, 0xFFFF_FFFFu32).unwrap();

        let out = PackedExecutor::new()
            .execute(&binary(Opcode::PkAddU16, 2, 0, 1), &mut ctx)
            .unwrap();
        assert_eq!(out.lanes_written, 2);
        assert_eq!(
            ctx.vgprs.read_lanes::<u32>(2).unwrap(),
            vec![3, 0xFFFF_FFFF, 0xFFFF_FFFF, 3]
        );
    }

    #[test]
    fn test_dest_aliases_source() {
        let mut ctx = WaveContext::new(2, 2);
        ctx.vgprs.commit(0, &[0x0001_0001u32, 0x0002_0002]).unwrap();

        PackedExecutor::new()
            .execute(&binary(Opcode::PkAddU16, 0, 0, 0), &mut ctx)
            .unwrap();
        assert_eq!(ctx.vgprs.read_lanes::<u32>(0).unwrap(), vec![0x0002_0002, 0x0004_0004]);
    }

    #[test]
    fn test_unsupported_mode_writes_nothing() {
        let mut ctx = WaveContext::new(4, 8);
        ctx.vgprs.broadcast(6, 0x1234u32).unwrap();

        for mode in [ExecMode::Sdwa, ExecMode::Dpp] {
            let inst = binary(Opcode::PkAddF32, 6, 0, 2).with_modifiers(Modifiers {
                mode,
                ..Default::default()
            });
            let err = PackedExecutor::new().execute(&inst, &mut ctx).unwrap_err();
            assert_eq!(
                err,
                ExecError::UnsupportedMode {
                    opcode: Opcode::PkAddF32,
                    mode
                }
            );
        }
        assert_eq!(ctx.vgprs.read_lane(6, 0).unwrap(), 0x1234);
    }

    #[test]
    fn test_structural_errors() {
        let mut ctx = WaveContext::new(4, 4);
        let exec = PackedExecutor::new();

        let inst = Instruction::new(Opcode::PkFmaF16)
            .with_dest(Operand::Vgpr(0))
            .with_source(Operand::Vgpr(1));
        assert!(matches!(
            exec.execute(&inst, &mut ctx),
            Err(ExecError::OperandCount { expected: 3, found: 1, .. })
        ));

        let inst = Instruction::new(Opcode::AccvgprRead).with_source(Operand::Vgpr(0));
        assert!(matches!(exec.execute(&inst, &mut ctx), Err(ExecError::MissingDest { .. })));

        let inst = Instruction::new(Opcode::AccvgprRead)
            .with_dest(Operand::Imm(0))
            .with_source(Operand::Vgpr(0));
        assert!(matches!(exec.execute(&inst, &mut ctx), Err(ExecError::InvalidDest { .. })));

        // Pair v3:v4 does not fit a 4-register file.
        let inst = binary(Opcode::PkMulF32, 0, 3, 0);
        assert!(matches!(exec.execute(&inst, &mut ctx), Err(ExecError::Register(_))));
    }

    #[test]
    fn test_pk_mov_neg_warns_and_is_ignored() {
        let mut ctx = WaveContext::new(2, 8);
        ctx.vgprs.broadcast(0, 0x3F80_0000_4000_0000u64).unwrap();

        let inst = binary(Opcode::PkMovB32, 4, 0, 0).with_modifiers(Modifiers {
            opsel: 0b10,
            neg: 0b01,
            ..Default::default()
        });
        let out = PackedExecutor::new().execute(&inst, &mut ctx).unwrap();
        assert_eq!(
            out.warnings.as_slice(),
            &[ModifierWarning::NegIgnored {
                opcode: Opcode::PkMovB32
            }]
        );
        assert_eq!(ctx.vgprs.read_value::<u64>(4, 1).unwrap(), 0x3F80_0000_4000_0000);
    }

    #[test]
    fn test_clamp_on_unclampable_warns() {
        let mut ctx = WaveContext::new(1, 4);
        ctx.vgprs.broadcast(0, 0x0000_FFFFu32).unwrap();
        ctx.vgprs.broadcast(1, 0x0000_0002u32).unwrap();

        let out = PackedExecutor::new()
            .execute(&binary(Opcode::PkMulLoU16, 2, 0, 1).with_clamp(true), &mut ctx)
            .unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(ctx.vgprs.read_lane(2, 0).unwrap(), 0x0000_FFFE);
    }

    #[test]
    fn test_dot_with_immediate_bias() {
        let mut ctx = WaveContext::new(2, 4);
        ctx.vgprs.broadcast(0, 0x0101_0101u32).unwrap();
        ctx.vgprs.broadcast(1, 0x7F7F_7F7Fu32).unwrap();

        let inst = binary(Opcode::Dot4I32I8, 2, 0, 1).with_source(Operand::Imm(2));
        let out = PackedExecutor::new().execute(&inst, &mut ctx).unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(ctx.vgprs.read_lane(2, 1).unwrap(), 510);
    }

    #[test]
    fn test_dot_opsel_warns() {
        let mut ctx = WaveContext::new(1, 4);
        let inst = binary(Opcode::Dot2I32I16, 2, 0, 1)
            .with_source(Operand::Imm(0))
            .with_modifiers(Modifiers {
                opsel: 0b001,
                ..Default::default()
            });
        let out = PackedExecutor::new().execute(&inst, &mut ctx).unwrap();
        assert_eq!(
            out.warnings.as_slice(),
            &[ModifierWarning::OpselIgnored {
                opcode: Opcode::Dot2I32I16
            }]
        );
    }

    #[test]
    fn test_accumulator_moves() {
        let mut ctx = WaveContext::new(2, 16).with_accum(crate::alu::state::AccumWindow::new(8));
        ctx.vgprs.broadcast(1, 0xCAFEu32).unwrap();

        let exec = PackedExecutor::new();
        let write = Instruction::new(Opcode::AccvgprWrite)
            .with_dest(Operand::Vgpr(2))
            .with_source(Operand::Vgpr(1));
        exec.execute(&write, &mut ctx).unwrap();
        assert_eq!(ctx.vgprs.read_lane(10, 0).unwrap(), 0xCAFE);

        let read = Instruction::new(Opcode::AccvgprRead)
            .with_dest(Operand::Vgpr(3))
            .with_source(Operand::Vgpr(2));
        exec.execute(&read, &mut ctx).unwrap();
        assert_eq!(ctx.vgprs.read_lane(3, 1).unwrap(), 0xCAFE);
    }

    #[test]
    fn test_fp_flags_reported() {
        let mut ctx = WaveContext::new(1, 4);
        // 65504 * 2 overflows binary16
        ctx.vgprs.broadcast(0, 0x3C00_7BFFu32).unwrap();
        ctx.vgprs.broadcast(1, 0x3C00_4000u32).unwrap();

        let out = PackedExecutor::new()
            .execute(&binary(Opcode::PkMulF16, 2, 0, 1), &mut ctx)
            .unwrap();
        assert!(out.fp_flags.overflow);
        assert_eq!(ctx.vgprs.read_lane(2, 0).unwrap(), 0x3C00_7C00);
    }
}
