//! Frame placement strategies.
//!
//! A frame is placed either in the address space's shared scratch region or
//! directly below the thread's stack pointer. The strategy is fixed when the
//! address space is set up (a region is installed or it is not), so the
//! builder and resolver of one frame always agree on it.

use super::frame::{FrameImage, FRAME_ALIGN, FRAME_SIZE};
use super::region::ScratchRegion;
use crate::arch_impl::mips::msk_isa16_mode;
use crate::arch_impl::traits::CacheOps;
use crate::config::PlatformConfig;
use crate::error::{DsemulError, MemoryFault};
use crate::memory::uaccess::UserMemory;

/// Where frames live and how they are written, read back and released.
pub trait FramePlacement {
    /// Reserve a slot, store `image` in it and make it executable.
    ///
    /// Returns the user address of the frame.
    fn push<M, C>(
        &self,
        image: &FrameImage,
        stack_pointer: u64,
        mem: &mut M,
        cache: &C,
    ) -> Result<u64, DsemulError>
    where
        M: UserMemory + ?Sized,
        C: CacheOps + ?Sized;

    /// A trap at `pc` could have come from a frame of this placement.
    fn owns(&self, pc: u64) -> bool;

    /// `[addr, addr + len)` may be read back.
    fn readable<M: UserMemory + ?Sized>(&self, addr: u64, len: usize, mem: &M) -> bool;

    /// Read back frame bytes.
    fn read<M: UserMemory + ?Sized>(
        &self,
        addr: u64,
        buf: &mut [u8],
        mem: &M,
    ) -> Result<(), MemoryFault>;

    /// Release the most recently pushed frame after it resolved.
    fn pop(&self) -> Result<(), DsemulError>;
}

/// Make freshly written trampoline code visible to instruction fetch.
fn sync_frame<C: CacheOps + ?Sized>(cache: &C, config: &PlatformConfig, addr: u64, len: usize) {
    if config.dcache_aliases {
        cache.synchronize_instructions(addr, len);
    } else {
        // The instruction pair never straddles a line.
        cache.synchronize_line(addr);
    }
}

/// Frames stacked in the per-address-space scratch page.
pub struct SharedRegionPlacement<'a> {
    region: &'a ScratchRegion,
    config: &'a PlatformConfig,
}

impl<'a> SharedRegionPlacement<'a> {
    pub fn new(region: &'a ScratchRegion, config: &'a PlatformConfig) -> Self {
        Self { region, config }
    }
}

impl FramePlacement for SharedRegionPlacement<'_> {
    fn push<M, C>(
        &self,
        image: &FrameImage,
        _stack_pointer: u64,
        _mem: &mut M,
        cache: &C,
    ) -> Result<u64, DsemulError>
    where
        M: UserMemory + ?Sized,
        C: CacheOps + ?Sized,
    {
        let offset = self.region.push()?;
        self.region.write_frame(offset, image);

        let addr = self.region.user_addr(offset);
        sync_frame(cache, self.config, addr, image.len());
        Ok(addr)
    }

    fn owns(&self, pc: u64) -> bool {
        msk_isa16_mode(pc) & self.config.page_mask() == self.region.user_base()
    }

    fn readable<M: UserMemory + ?Sized>(&self, addr: u64, len: usize, _mem: &M) -> bool {
        len > 0 && self.region.contains(addr) && self.region.contains(addr + len as u64 - 1)
    }

    fn read<M: UserMemory + ?Sized>(
        &self,
        addr: u64,
        buf: &mut [u8],
        _mem: &M,
    ) -> Result<(), MemoryFault> {
        self.region.read(addr, buf)
    }

    fn pop(&self) -> Result<(), DsemulError> {
        self.region.pop().map(|_| ())
    }
}

/// Frames written just below the thread's stack pointer.
pub struct StackPlacement<'a> {
    config: &'a PlatformConfig,
}

impl<'a> StackPlacement<'a> {
    pub fn new(config: &'a PlatformConfig) -> Self {
        Self { config }
    }

    /// Frame address for a thread whose stack pointer is `sp`.
    pub fn frame_addr(sp: u64) -> u64 {
        sp.wrapping_sub(FRAME_SIZE as u64) & !(FRAME_ALIGN - 1)
    }
}

impl FramePlacement for StackPlacement<'_> {
    fn push<M, C>(
        &self,
        image: &FrameImage,
        stack_pointer: u64,
        mem: &mut M,
        cache: &C,
    ) -> Result<u64, DsemulError>
    where
        M: UserMemory + ?Sized,
        C: CacheOps + ?Sized,
    {
        let addr = Self::frame_addr(stack_pointer);

        // Verify that the stack pointer is not completely insane
        if !mem.access_ok(addr, FRAME_SIZE) {
            return Err(DsemulError::StackNotWritable { addr });
        }

        mem.write_bytes(addr, &image[..FRAME_SIZE]).map_err(|fault| {
            log::debug!("dsemul: stack frame write faulted at {:#x}", fault.addr);
            DsemulError::StackWriteFault { addr }
        })?;

        sync_frame(cache, self.config, addr, FRAME_SIZE);
        Ok(addr)
    }

    fn owns(&self, _pc: u64) -> bool {
        true
    }

    fn readable<M: UserMemory + ?Sized>(&self, addr: u64, len: usize, mem: &M) -> bool {
        mem.access_ok(addr, len)
    }

    fn read<M: UserMemory + ?Sized>(
        &self,
        addr: u64,
        buf: &mut [u8],
        mem: &M,
    ) -> Result<(), MemoryFault> {
        mem.read_bytes(addr, buf)
    }

    fn pop(&self) -> Result<(), DsemulError> {
        Ok(())
    }
}
