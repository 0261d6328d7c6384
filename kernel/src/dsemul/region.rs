//! Shared scratch region.
//!
//! One executable page per address space, mapped read/execute into the user
//! address space at `user_base` and writable only through the kernel's own
//! mapping. The page starts with the signal return trampolines; emulation
//! frames are stacked downward from the page end:
//!
//! ```text
//! user_base                                        user_base + page_size
//! | trampolines | free ...       | frame N | ... | frame 1 |
//!               ^                ^
//!               TRAMPOLINE_AREA  offset
//! ```
//!
//! `offset` is the byte distance from the page start to the most recently
//! pushed frame, or `page_size` when no frame is pending. `push` and `pop`
//! are the only mutators and never let it leave
//! `[TRAMPOLINE_AREA_SIZE, page_size]`.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use super::frame::{EmuFrame, FrameImage, FRAME_ROUNDED_SIZE};
use crate::config::{Endian, PlatformConfig};
use crate::error::{DsemulError, MemoryFault, RegionError};
use crate::signal::trampoline::{trampoline_words, TRAMPOLINE_AREA_SIZE};

pub struct ScratchRegion {
    user_base: u64,
    page_size: usize,
    endian: Endian,
    /// Kernel mapping of the page.
    page: Mutex<Vec<u8>>,
    offset: AtomicUsize,
}

impl ScratchRegion {
    /// Create the region for a page mapped at `user_base` and install the
    /// signal return trampolines.
    pub fn new(user_base: u64, config: &PlatformConfig) -> Result<Self, RegionError> {
        let page_size = config.page_size;
        if !page_size.is_power_of_two() || page_size < TRAMPOLINE_AREA_SIZE + FRAME_ROUNDED_SIZE {
            return Err(RegionError::PageTooSmall { size: page_size });
        }
        if user_base & (page_size as u64 - 1) != 0 {
            return Err(RegionError::Misaligned { base: user_base });
        }

        let mut page = vec![0u8; page_size];
        for (i, word) in trampoline_words().enumerate() {
            page[i * 4..i * 4 + 4].copy_from_slice(&config.endian.u32_bytes(word));
        }

        log::debug!(
            "dsemul: scratch region at {:#x}, {} frame slots",
            user_base,
            (page_size - TRAMPOLINE_AREA_SIZE) / FRAME_ROUNDED_SIZE
        );

        Ok(Self {
            user_base,
            page_size,
            endian: config.endian,
            page: Mutex::new(page),
            offset: AtomicUsize::new(page_size),
        })
    }

    pub fn user_base(&self) -> u64 {
        self.user_base
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current occupancy offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Acquire)
    }

    /// Number of frames that fit below the page end.
    pub fn capacity(&self) -> usize {
        (self.page_size - TRAMPOLINE_AREA_SIZE) / FRAME_ROUNDED_SIZE
    }

    /// Number of pending frames.
    pub fn depth(&self) -> usize {
        (self.page_size - self.offset()) / FRAME_ROUNDED_SIZE
    }

    /// User address of the byte at `offset`.
    #[inline]
    pub fn user_addr(&self, offset: usize) -> u64 {
        self.user_base + offset as u64
    }

    /// `addr` lies anywhere in the page.
    #[inline]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.user_base && addr < self.user_base + self.page_size as u64
    }

    /// `addr` lies in the part of the page reserved for frames.
    #[inline]
    pub fn in_frame_area(&self, addr: u64) -> bool {
        addr >= self.user_addr(TRAMPOLINE_AREA_SIZE) && self.contains(addr)
    }

    /// Reserve a frame slot. Returns the new offset, which is the slot.
    ///
    /// Fails without moving the offset if the slot would overlap the
    /// trampoline code.
    pub fn push(&self) -> Result<usize, DsemulError> {
        let mut current = self.offset.load(Ordering::Acquire);
        loop {
            let next = match current.checked_sub(FRAME_ROUNDED_SIZE) {
                Some(next) if next >= TRAMPOLINE_AREA_SIZE => next,
                _ => return Err(DsemulError::ScratchExhausted),
            };
            match self
                .offset
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// Release the most recent frame slot. Returns the new offset.
    ///
    /// Fails without moving the offset if it would pass the page end.
    pub fn pop(&self) -> Result<usize, DsemulError> {
        let mut current = self.offset.load(Ordering::Acquire);
        loop {
            let next = current + FRAME_ROUNDED_SIZE;
            if next > self.page_size {
                return Err(DsemulError::ScratchUnderflow);
            }
            match self
                .offset
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// Write a frame image at `offset` through the kernel mapping.
    pub(crate) fn write_frame(&self, offset: usize, image: &FrameImage) {
        let mut page = self.page.lock();
        page[offset..offset + image.len()].copy_from_slice(image);
    }

    /// Decode the frame at `offset`, built for ISA16 code if `isa16`.
    pub fn read_frame(&self, offset: usize, isa16: bool) -> EmuFrame {
        let mut image = [0u8; FRAME_ROUNDED_SIZE];
        {
            let page = self.page.lock();
            let end = core::cmp::min(offset + FRAME_ROUNDED_SIZE, self.page_size);
            image[..end - offset].copy_from_slice(&page[offset..end]);
        }
        EmuFrame::decode(&image, isa16, self.endian)
    }

    /// Read bytes at user address `addr` through the kernel mapping.
    ///
    /// Faults if any byte lies outside the page.
    pub fn read(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryFault> {
        if !self.contains(addr) {
            return Err(MemoryFault { addr });
        }
        let start = (addr - self.user_base) as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.page_size)
            .ok_or(MemoryFault {
                addr: self.user_addr(self.page_size),
            })?;
        buf.copy_from_slice(&self.page.lock()[start..end]);
        Ok(())
    }

    /// Overwrite bytes of the kernel mapping, bypassing frame bookkeeping.
    ///
    /// Used to model stray writes to the page.
    pub fn poke(&self, addr: u64, bytes: &[u8]) -> Result<(), MemoryFault> {
        if !self.contains(addr) {
            return Err(MemoryFault { addr });
        }
        let start = (addr - self.user_base) as usize;
        let end = start + bytes.len();
        if end > self.page_size {
            return Err(MemoryFault {
                addr: self.user_addr(self.page_size),
            });
        }
        self.page.lock()[start..end].copy_from_slice(bytes);
        Ok(())
    }
}

impl core::fmt::Debug for ScratchRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScratchRegion")
            .field("user_base", &format_args!("{:#x}", self.user_base))
            .field("page_size", &self.page_size)
            .field("offset", &self.offset())
            .finish()
    }
}
