//! Trap resolver.
//!
//! Runs when a trap marker executes. If the marker belongs to a frame this
//! crate built, the frame's continuation address becomes the saved program
//! counter and the frame is released.

use super::frame::{read_insn, BADINST_OFFSET, COOKIE_OFFSET, EPC_OFFSET, FRAME_SIZE};
use super::placement::FramePlacement;
use super::stats::EmuStats;
use super::TrapResolution;
use crate::arch_impl::mips::{isa16_mode, msk_isa16_mode, BD_COOKIE, BREAK_MATH, INSN_SIZE};
use crate::arch_impl::traits::TrapFrame;
use crate::config::PlatformConfig;
use crate::error::DsemulError;
use crate::memory::uaccess::UserMemory;

pub(super) fn resolve<P, F, M>(
    placement: &P,
    config: &PlatformConfig,
    stats: &EmuStats,
    frame: &mut F,
    mem: &M,
) -> Result<TrapResolution, DsemulError>
where
    P: FramePlacement,
    F: TrapFrame,
    M: UserMemory + ?Sized,
{
    let pc = frame.instruction_pointer();
    let isa16 = isa16_mode(pc) != 0;
    // The saved pc names the trap marker, which follows the relocated
    // instruction.
    let fr = msk_isa16_mode(pc).wrapping_sub(INSN_SIZE);

    // If we can't even access the area, leave it to the default handling.
    if !placement.readable(fr, FRAME_SIZE, mem) {
        return Ok(TrapResolution::NotHandled);
    }

    // Marker and cookie are read together; they are adjacent.
    let mut header = [0u8; 8];
    let header_ok = placement.read(fr + BADINST_OFFSET as u64, &mut header, mem).is_ok();
    let insn = read_insn([header[0], header[1], header[2], header[3]], isa16, config.endian);
    let cookie_at = COOKIE_OFFSET - BADINST_OFFSET;
    let cookie = config.endian.read_u32([
        header[cookie_at],
        header[cookie_at + 1],
        header[cookie_at + 2],
        header[cookie_at + 3],
    ]);

    if !header_ok || insn != BREAK_MATH || cookie != BD_COOKIE || !placement.owns(pc) {
        stats.inc_errors();
        log::debug!(
            "dsemul: trap at {:#x} is not an emulation frame (insn {:#x}, cookie {:#x})",
            pc,
            insn,
            cookie
        );
        return Ok(TrapResolution::NotHandled);
    }

    // From here on the trap is ours. A user program that deliberately placed
    // a marker and cookie pair will have the following word used as its
    // continuation address.
    log::trace!("dsemulret");

    let mut epc = [0u8; 8];
    if let Err(fault) = placement.read(fr + EPC_OFFSET as u64, &mut epc, mem) {
        stats.inc_errors();
        log::warn!("dsemul: continuation of frame {:#x} unreadable ({})", fr, fault);
        return Err(DsemulError::FrameReadFault { addr: fr });
    }
    let epc = config.endian.read_u64(epc);

    if let Err(err) = placement.pop() {
        stats.inc_errors();
        log::warn!("dsemul: releasing frame {:#x} failed: {}", fr, err);
        return Err(err);
    }

    // Set EPC to return to post-branch instruction
    frame.set_instruction_pointer(epc);
    stats.inc_ds_emul();
    Ok(TrapResolution::Handled)
}
