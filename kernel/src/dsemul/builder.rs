//! Frame builder.
//!
//! Relocates a delay-slot instruction into a trampoline frame followed by the
//! trap marker, then points the saved program counter at it. When the thread
//! resumes it executes the instruction in its own context and immediately
//! traps back into [`super::resolver`].

use super::frame::EmuFrame;
use super::placement::FramePlacement;
use super::{DelaySlot, Emulation};
use crate::arch_impl::mips::insn::{addiupc_value, classify, FastPath};
use crate::arch_impl::mips::isa16_mode;
use crate::arch_impl::traits::{CacheOps, TrapFrame};
use crate::config::PlatformConfig;
use crate::error::DsemulError;
use crate::memory::uaccess::UserMemory;

/// Complete `slot` without a trampoline if its instruction allows it.
///
/// On success the saved pc is moved to the continuation address.
pub(super) fn try_fast_path<F: TrapFrame>(frame: &mut F, slot: &DelaySlot) -> Option<Emulation> {
    let isa16 = isa16_mode(frame.instruction_pointer()) != 0;

    match classify(slot.insn, isa16)? {
        FastPath::Nop => {
            log::trace!("dsemul: nop in delay slot at {:#x}", frame.instruction_pointer());
        }
        FastPath::AddiuPc { reg, simm } => {
            // A single register write that cannot fault: no need to relocate.
            let value = addiupc_value(slot.continuation, simm);
            log::trace!("dsemul: addiupc ${} <- {:#x}", reg, value);
            frame.set_register(reg, value);
        }
    }

    frame.set_instruction_pointer(slot.continuation);
    Some(Emulation::Completed)
}

/// Build a trampoline frame for `slot` using `placement`.
pub(super) fn build<P, F, M, C>(
    placement: &P,
    config: &PlatformConfig,
    frame: &mut F,
    mem: &mut M,
    cache: &C,
    slot: &DelaySlot,
) -> Result<Emulation, DsemulError>
where
    P: FramePlacement,
    F: TrapFrame,
    M: UserMemory + ?Sized,
    C: CacheOps + ?Sized,
{
    let pc = frame.instruction_pointer();
    let mode = isa16_mode(pc);

    log::debug!("dsemul {:#x} {:#x}", pc, slot.continuation);

    let image = EmuFrame::new(slot.insn, slot.continuation, slot.branch_target, slot.link)
        .encode(mode != 0, config.endian);

    let addr = placement.push(&image, frame.stack_pointer(), mem, cache)?;

    frame.set_instruction_pointer(addr | mode);
    Ok(Emulation::Trampoline { frame: addr })
}
