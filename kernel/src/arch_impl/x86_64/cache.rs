//! x86_64 instruction cache maintenance.
//!
//! x86_64 snoops the instruction cache on stores, so self-modifying code is
//! coherent once the stores are ordered before the jump into them. The
//! exception return that enters the trampoline is serializing.

use core::sync::atomic::{compiler_fence, Ordering};

/// Order prior stores to `[start, start + len)` before any later fetch.
///
/// # Safety
///
/// The range must be mapped in the current address space.
#[inline]
pub unsafe fn sync_range(_start: u64, _len: usize) {
    compiler_fence(Ordering::SeqCst);
}

/// Order prior stores to the line containing `addr` before any later fetch.
///
/// # Safety
///
/// `addr` must be mapped in the current address space.
#[inline]
pub unsafe fn sync_line(_addr: u64) {
    compiler_fence(Ordering::SeqCst);
}
