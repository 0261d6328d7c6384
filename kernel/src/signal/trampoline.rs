//! Signal return trampolines at the start of the scratch page
//!
//! Signal handlers return into these instruction pairs, which enter the
//! kernel through sigreturn/rt_sigreturn. They occupy the first
//! `TRAMPOLINE_AREA_SIZE` bytes of the scratch region; emulation frames are
//! never placed below that boundary.

use crate::arch_impl::mips::{LI_V0, NR_RT_SIGRETURN, NR_SIGRETURN, SYSCALL_INSN};

/// Assembly:
///   li      v0, 4119    ; __NR_sigreturn
///   syscall
pub const SIGNAL_TRAMPOLINE: [u32; 2] = [LI_V0 | NR_SIGRETURN, SYSCALL_INSN];

/// Assembly:
///   li      v0, 4193    ; __NR_rt_sigreturn
///   syscall
pub const RT_SIGNAL_TRAMPOLINE: [u32; 2] = [LI_V0 | NR_RT_SIGRETURN, SYSCALL_INSN];

/// Byte offset of the sigreturn trampoline within the scratch page.
pub const SIGNAL_TRAMPOLINE_OFFSET: usize = 0;

/// Byte offset of the rt_sigreturn trampoline within the scratch page.
pub const RT_SIGNAL_TRAMPOLINE_OFFSET: usize = 8;

/// Bytes reserved for trampoline code at the start of the scratch page.
pub const TRAMPOLINE_AREA_SIZE: usize = 16;

/// All trampoline words in page order.
pub fn trampoline_words() -> impl Iterator<Item = u32> {
    SIGNAL_TRAMPOLINE.into_iter().chain(RT_SIGNAL_TRAMPOLINE)
}
