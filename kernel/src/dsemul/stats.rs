//! Emulation counters.

use core::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EmuStats {
    /// Trampolines resolved through their trap marker.
    ds_emul: AtomicU64,
    /// Rejected traps and failed frame operations.
    errors: AtomicU64,
}

/// Point-in-time copy of [`EmuStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub ds_emul: u64,
    pub errors: u64,
}

impl EmuStats {
    pub const fn new() -> Self {
        Self {
            ds_emul: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn inc_ds_emul(&self) {
        self.ds_emul.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ds_emul: self.ds_emul.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
