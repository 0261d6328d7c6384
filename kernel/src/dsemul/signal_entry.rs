//! Signal-entry correction.
//!
//! Before a signal handler runs, the saved program counter must not point
//! into the scratch region: a handler could inspect it, and a handler that
//! returns through sigreturn would resume in a frame whose slot may have
//! been reused. Each pending frame the pc sits in is unwound to the
//! externally visible state it stands for:
//!
//! - pc at the relocated instruction: it has not run yet, so the branch is
//!   re-entered at its target with the original `$ra`.
//! - pc past it (at the trap marker): it has run, so execution continues at
//!   the continuation address without taking the trap.
//!
//! Frames unwound here are abandoned, not resolved.

use super::region::ScratchRegion;
use crate::arch_impl::mips::{isa16_mode, msk_isa16_mode, REG_RA};
use crate::arch_impl::traits::TrapFrame;

pub(super) fn adjust<F: TrapFrame>(region: &ScratchRegion, frame: &mut F) {
    while region.offset() < region.page_size() {
        let pc = frame.instruction_pointer();
        let epc = msk_isa16_mode(pc);
        if !region.in_frame_area(epc) {
            return;
        }

        let offset = region.offset();
        let fr = region.user_addr(offset);
        let emu = region.read_frame(offset, isa16_mode(pc) != 0);
        if !emu.is_genuine() {
            log::warn!("dsemul: frame {:#x} was overwritten while pending", fr);
        }

        let new_pc = if epc == fr {
            frame.set_register(REG_RA, emu.r31);
            emu.bpc
        } else {
            emu.epc
        };

        log::debug!("dsemul: signal entry in frame {:#x}, pc {:#x} -> {:#x}", fr, epc, new_pc);
        frame.set_instruction_pointer(new_pc);

        if let Err(err) = region.pop() {
            log::warn!("dsemul: abandoning frame {:#x} failed: {}", fr, err);
            return;
        }
    }
}
