//! Virtual Memory Area (VMA) backed user address space
//!
//! This module provides a software model of a thread's user address space:
//! a list of VMAs with permissions, and lazily allocated, zero-filled page
//! contents. It implements [`UserMemory`] with the same fault behaviour a
//! hardware MMU gives the kernel's user access primitives, which lets the
//! trampoline run inside instruction-set simulators and under test.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use super::uaccess::{user_range_ok, UserMemory};
use crate::error::MemoryFault;

/// Page size of the modelled address space
pub const PAGE_SIZE: u64 = 4096;

/// Memory protection flags (PROT_* constants from mmap)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protection(u32);

impl Protection {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(2);
    pub const EXEC: Self = Self(4);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0x7)
    }
}

impl core::ops::BitOr for Protection {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A Virtual Memory Area represents a contiguous mapped region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vma {
    /// Start address (page-aligned)
    pub start: u64,
    /// End address (exclusive, page-aligned)
    pub end: u64,
    /// Memory protection flags
    pub prot: Protection,
}

impl Vma {
    pub fn new(start: u64, end: u64, prot: Protection) -> Self {
        Self { start, end, prot }
    }

    /// Check if this VMA contains the given address
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Check if this VMA overlaps with another VMA
    pub fn overlaps(&self, other: &Vma) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Get the size of this VMA in bytes
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

#[inline]
fn round_down_to_page(addr: u64) -> u64 {
    addr & !(PAGE_SIZE - 1)
}

#[inline]
fn round_up_to_page(addr: u64) -> u64 {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Software model of a user address space
#[derive(Debug, Default)]
pub struct VmaSpace {
    vmas: Vec<Vma>,
    pages: BTreeMap<u64, Vec<u8>>,
}

impl VmaSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `[start, start + len)` rounded out to whole pages.
    ///
    /// Returns false if the range leaves userspace or overlaps an existing
    /// mapping.
    pub fn map(&mut self, start: u64, len: u64, prot: Protection) -> bool {
        let vma_start = round_down_to_page(start);
        let vma_end = round_up_to_page(start + len);
        if !user_range_ok(vma_start, (vma_end - vma_start) as usize) {
            return false;
        }

        let vma = Vma::new(vma_start, vma_end, prot);
        if self.vmas.iter().any(|existing| existing.overlaps(&vma)) {
            log::debug!("vma: {:#x}..{:#x} overlaps an existing mapping", vma_start, vma_end);
            return false;
        }

        self.vmas.push(vma);
        true
    }

    /// Change the protection of the VMA containing `addr`.
    pub fn protect(&mut self, addr: u64, prot: Protection) -> bool {
        match self.vmas.iter_mut().find(|vma| vma.contains(addr)) {
            Some(vma) => {
                vma.prot = prot;
                true
            }
            None => false,
        }
    }

    /// Remove the VMA containing `addr` and drop its page contents.
    pub fn unmap(&mut self, addr: u64) -> bool {
        let Some(index) = self.vmas.iter().position(|vma| vma.contains(addr)) else {
            return false;
        };
        let vma = self.vmas.remove(index);
        self.pages.retain(|&page, _| !vma.contains(page));
        true
    }

    pub fn find_vma(&self, addr: u64) -> Option<&Vma> {
        self.vmas.iter().find(|vma| vma.contains(addr))
    }

    /// Walk `[addr, addr + len)` one page chunk at a time, checking `prot`.
    ///
    /// Calls `f(page_base, offset_in_page, chunk_start_in_buffer, chunk_len)`.
    fn for_each_chunk(
        &self,
        addr: u64,
        len: usize,
        prot: Protection,
        mut f: impl FnMut(u64, usize, usize, usize),
    ) -> Result<(), MemoryFault> {
        if !user_range_ok(addr, len) {
            return Err(MemoryFault { addr });
        }

        let mut done = 0usize;
        while done < len {
            let cur = addr + done as u64;
            match self.find_vma(cur) {
                Some(vma) if vma.prot.contains(prot) => {}
                _ => return Err(MemoryFault { addr: cur }),
            }
            let page = round_down_to_page(cur);
            let offset = (cur - page) as usize;
            let chunk = core::cmp::min(len - done, PAGE_SIZE as usize - offset);
            f(page, offset, done, chunk);
            done += chunk;
        }

        Ok(())
    }
}

impl UserMemory for VmaSpace {
    fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryFault> {
        // Check the whole range before copying anything.
        self.for_each_chunk(addr, buf.len(), Protection::READ, |_, _, _, _| {})?;
        self.for_each_chunk(addr, buf.len(), Protection::READ, |page, offset, at, len| {
            match self.pages.get(&page) {
                Some(contents) => buf[at..at + len].copy_from_slice(&contents[offset..offset + len]),
                None => buf[at..at + len].fill(0),
            }
        })
    }

    fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), MemoryFault> {
        let mut chunks = Vec::new();
        let result = self.for_each_chunk(addr, bytes.len(), Protection::WRITE, |page, offset, at, len| {
            chunks.push((page, offset, at, len));
        });

        // Chunks before a fault are still written, as a real store sequence
        // would have done.
        for (page, offset, at, len) in chunks {
            let contents = self
                .pages
                .entry(page)
                .or_insert_with(|| vec![0u8; PAGE_SIZE as usize]);
            contents[offset..offset + len].copy_from_slice(&bytes[at..at + len]);
        }

        result
    }
}
