//! Accumulator register bridge.
//!
//! Accumulator registers live in the same physical file as the VGPRs, at a
//! fixed offset given by the [`AccumWindow`]. The two moves are masked raw
//! copies between the architectural and accumulator halves.

use crate::alu::catalog::{Opcode, Operand};
use crate::alu::state::AccumWindow;

/// Physical source and destination for an accumulator move.
///
/// `v_accvgpr_read` reads `src + offset` into `dest`;
/// `v_accvgpr_write` writes `src` into `dest + offset`. An immediate
/// source is passed through.
pub fn route(op: Opcode, window: AccumWindow, src: Operand, dest: u32) -> (Operand, u32) {
    match op {
        Opcode::AccvgprRead => {
            let src = match src {
                // Saturate so an oversized window fails the range check
                // instead of wrapping onto a low register.
                Operand::Vgpr(r) => {
                    let phys = window.resolve(r as u32);
                    Operand::Vgpr(u16::try_from(phys).unwrap_or(u16::MAX))
                }
                imm => imm,
            };
            (src, dest)
        }
        Opcode::AccvgprWrite => (src, window.resolve(dest)),
        _ => {
            debug_assert!(false, "{} is not an accumulator move", op);
            (src, dest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_offsets_source() {
        let w = AccumWindow::new(256);
        assert_eq!(
            route(Opcode::AccvgprRead, w, Operand::Vgpr(3), 7),
            (Operand::Vgpr(259), 7)
        );
    }

    #[test]
    fn test_write_offsets_dest() {
        let w = AccumWindow::new(256);
        assert_eq!(
            route(Opcode::AccvgprWrite, w, Operand::Vgpr(3), 7),
            (Operand::Vgpr(3), 263)
        );
        assert_eq!(
            route(Opcode::AccvgprWrite, w, Operand::Imm(42), 0),
            (Operand::Imm(42), 256)
        );
    }
}
