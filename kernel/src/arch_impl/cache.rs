//! Cache maintenance providers.
//!
//! `HostCache` forwards to the current architecture's primitives and is only
//! usable when trampoline addresses are real mappings of the running address
//! space. `RecordingCache` keeps a log of requested operations instead, for
//! simulated address spaces.

use alloc::vec::Vec;
use spin::Mutex;

use super::traits::CacheOps;

#[cfg(target_arch = "aarch64")]
use super::aarch64::cache as arch;
#[cfg(target_arch = "x86_64")]
use super::x86_64::cache as arch;

#[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
mod arch {
    use core::sync::atomic::{fence, Ordering};

    pub unsafe fn sync_range(_start: u64, _len: usize) {
        fence(Ordering::SeqCst);
    }

    pub unsafe fn sync_line(_addr: u64) {
        fence(Ordering::SeqCst);
    }
}

/// Cache maintenance on the machine the crate runs on.
#[derive(Debug)]
pub struct HostCache {
    _private: (),
}

impl HostCache {
    /// Create a host cache provider.
    ///
    /// # Safety
    ///
    /// Every address later passed to this provider must be mapped in the
    /// current address space.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl CacheOps for HostCache {
    fn synchronize_instructions(&self, start: u64, len: usize) {
        // SAFETY: the constructor's contract guarantees the range is mapped.
        unsafe { arch::sync_range(start, len) }
    }

    fn synchronize_line(&self, addr: u64) {
        // SAFETY: as above.
        unsafe { arch::sync_line(addr) }
    }
}

/// A cache operation requested through [`RecordingCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Range { start: u64, len: usize },
    Line { addr: u64 },
}

/// Records cache operations instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingCache {
    ops: Mutex<Vec<CacheOp>>,
}

impl RecordingCache {
    pub const fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
        }
    }

    /// Operations recorded so far, oldest first.
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().clone()
    }

    /// Forget all recorded operations.
    pub fn clear(&self) {
        self.ops.lock().clear();
    }
}

impl CacheOps for RecordingCache {
    fn synchronize_instructions(&self, start: u64, len: usize) {
        self.ops.lock().push(CacheOp::Range { start, len });
    }

    fn synchronize_line(&self, addr: u64) {
        self.ops.lock().push(CacheOp::Line { addr });
    }
}
