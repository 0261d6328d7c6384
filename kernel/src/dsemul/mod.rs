//! Out-of-line delay-slot emulation.
//!
//! When the FPU emulator has to emulate a branch, the instruction in the
//! branch's delay slot still has to run, in the thread's own context, before
//! execution continues at the branch outcome. Instead of emulating arbitrary
//! instructions, the emulator copies the delay-slot instruction into a small
//! frame, follows it with a `break 514` trap marker, and returns to the
//! thread at the copy. The marker traps straight back into the kernel, which
//! redirects the thread to the continuation address recorded in the frame.
//!
//! The three entry points on [`DelaySlotEmulator`] are:
//! - [`emulate`](DelaySlotEmulator::emulate): build a frame (or finish a
//!   trivial instruction inline).
//! - [`resolve_trap`](DelaySlotEmulator::resolve_trap): handle the marker's
//!   breakpoint exception.
//! - [`adjust_for_signal`](DelaySlotEmulator::adjust_for_signal): move the
//!   thread out of scratch memory before a signal handler runs.
//!
//! Frames nest when a signal handler itself needs delay-slot emulation
//! before an earlier frame resolved, so they are kept as a stack.

pub mod builder;
pub mod frame;
pub mod placement;
pub mod region;
pub mod resolver;
pub mod signal_entry;
pub mod stats;

use conquer_once::spin::OnceCell;

use crate::arch_impl::traits::{CacheOps, TrapFrame};
use crate::config::PlatformConfig;
use crate::error::{DsemulError, RegionError};
use crate::memory::uaccess::UserMemory;
use crate::signal::constants::signal_name;

pub use frame::{EmuFrame, FRAME_ROUNDED_SIZE, FRAME_SIZE};
pub use placement::{FramePlacement, SharedRegionPlacement, StackPlacement};
pub use region::ScratchRegion;
pub use stats::{EmuStats, StatsSnapshot};

/// A delay-slot instruction and where control goes around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelaySlot {
    /// The instruction to execute.
    pub insn: u32,
    /// Where execution resumes once `insn` has run.
    pub continuation: u64,
    /// Target of the branch owning the delay slot.
    pub branch_target: u64,
    /// `$ra` before the branch executed.
    pub link: u64,
}

/// Outcome of [`DelaySlotEmulator::emulate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emulation {
    /// The instruction was completed in place; the saved pc is at the
    /// continuation address and no scratch memory was touched.
    Completed,
    /// A frame was built at `frame` and the saved pc points into it.
    Trampoline { frame: u64 },
}

/// Outcome of [`DelaySlotEmulator::resolve_trap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapResolution {
    /// The trap came from an emulation frame; the saved pc is restored.
    Handled,
    /// Not an emulation frame. The generic breakpoint handling applies.
    NotHandled,
}

/// Per-address-space delay-slot emulation state.
pub struct DelaySlotEmulator {
    config: PlatformConfig,
    region: OnceCell<ScratchRegion>,
    stats: EmuStats,
}

impl DelaySlotEmulator {
    /// Emulator placing frames on the thread stack until a scratch region
    /// is installed.
    pub const fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            region: OnceCell::uninit(),
            stats: EmuStats::new(),
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Switch the address space to the shared scratch region strategy,
    /// with the region page mapped at `user_base`.
    ///
    /// Must happen before the first frame is built; a region is installed
    /// at most once.
    pub fn install_scratch_region(&self, user_base: u64) -> Result<(), RegionError> {
        if self.region.is_initialized() {
            return Err(RegionError::AlreadyInstalled);
        }
        let region = ScratchRegion::new(user_base, &self.config)?;
        self.region
            .try_init_once(move || region)
            .map_err(|_| RegionError::AlreadyInstalled)
    }

    pub fn scratch_region(&self) -> Option<&ScratchRegion> {
        self.region.get()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Arrange for `slot.insn` to execute in the context described by
    /// `frame`.
    ///
    /// On [`Emulation::Trampoline`] the caller returns to the thread, which
    /// runs the instruction and traps back into
    /// [`resolve_trap`](Self::resolve_trap). On error the caller forces
    /// [`DsemulError::signal`] on the thread.
    pub fn emulate<F, M, C>(
        &self,
        frame: &mut F,
        mem: &mut M,
        cache: &C,
        slot: DelaySlot,
    ) -> Result<Emulation, DsemulError>
    where
        F: TrapFrame,
        M: UserMemory + ?Sized,
        C: CacheOps + ?Sized,
    {
        if let Some(done) = builder::try_fast_path(frame, &slot) {
            return Ok(done);
        }

        let result = match self.region.get() {
            Some(region) => builder::build(
                &SharedRegionPlacement::new(region, &self.config),
                &self.config,
                frame,
                mem,
                cache,
                &slot,
            ),
            None => builder::build(
                &StackPlacement::new(&self.config),
                &self.config,
                frame,
                mem,
                cache,
                &slot,
            ),
        };

        if let Err(err) = &result {
            self.stats.inc_errors();
            log::warn!(
                "dsemul: cannot emulate {:#010x}: {} ({})",
                slot.insn,
                err,
                signal_name(err.signal())
            );
        }
        result
    }

    /// Handle a breakpoint exception that may come from a trap marker.
    ///
    /// `Ok(NotHandled)` leaves `frame` untouched. On error the trap was
    /// recognized but cannot be resolved; the caller forces
    /// [`DsemulError::signal`] on the thread.
    pub fn resolve_trap<F, M>(&self, frame: &mut F, mem: &M) -> Result<TrapResolution, DsemulError>
    where
        F: TrapFrame,
        M: UserMemory + ?Sized,
    {
        match self.region.get() {
            Some(region) => resolver::resolve(
                &SharedRegionPlacement::new(region, &self.config),
                &self.config,
                &self.stats,
                frame,
                mem,
            ),
            None => resolver::resolve(
                &StackPlacement::new(&self.config),
                &self.config,
                &self.stats,
                frame,
                mem,
            ),
        }
    }

    /// Move the saved pc out of the scratch region before signal delivery.
    ///
    /// Frames on the thread stack are ordinary user memory and are left
    /// alone.
    pub fn adjust_for_signal<F: TrapFrame>(&self, frame: &mut F) {
        if let Some(region) = self.region.get() {
            signal_entry::adjust(region, frame);
        }
    }
}

impl Default for DelaySlotEmulator {
    fn default() -> Self {
        Self::new(PlatformConfig::default())
    }
}
