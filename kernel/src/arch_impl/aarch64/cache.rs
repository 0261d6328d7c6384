//! AArch64 instruction cache maintenance.
//!
//! AArch64 does not keep the instruction cache coherent with data writes.
//! Newly written code must be cleaned from the data cache to the point of
//! unification and invalidated from the instruction cache before it runs.

use aarch64_cpu::asm::barrier;

/// Read the minimum data and instruction cache line sizes from CTR_EL0.
#[inline]
fn cache_line_sizes() -> (u64, u64) {
    let ctr: u64;
    unsafe {
        core::arch::asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack));
    }
    let dline = 4u64 << ((ctr >> 16) & 0xf);
    let iline = 4u64 << (ctr & 0xf);
    (dline, iline)
}

/// Clean and invalidate `[start, start + len)` to the point of unification.
///
/// # Safety
///
/// The range must be mapped in the current address space.
pub unsafe fn sync_range(start: u64, len: usize) {
    let (dline, iline) = cache_line_sizes();
    let end = start.saturating_add(len as u64);

    let mut addr = start & !(dline - 1);
    while addr < end {
        core::arch::asm!("dc cvau, {addr}", addr = in(reg) addr, options(nostack));
        addr += dline;
    }
    barrier::dsb(barrier::ISH);

    addr = start & !(iline - 1);
    while addr < end {
        core::arch::asm!("ic ivau, {addr}", addr = in(reg) addr, options(nostack));
        addr += iline;
    }
    barrier::dsb(barrier::ISH);
    barrier::isb(barrier::SY);
}

/// Clean and invalidate the single line containing `addr`.
///
/// # Safety
///
/// `addr` must be mapped in the current address space.
pub unsafe fn sync_line(addr: u64) {
    core::arch::asm!(
        "dc cvau, {addr}",
        "dsb ish",
        "ic ivau, {addr}",
        addr = in(reg) addr,
        options(nostack)
    );
    barrier::dsb(barrier::ISH);
    barrier::isb(barrier::SY);
}
