//! Userspace memory access for the trampoline
//!
//! Frames on the user stack live in memory the thread owns: it may be
//! unmapped, read-only, or deliberately forged. Every access therefore goes
//! through [`UserMemory`], which reports faults instead of taking them, and
//! every pointer is range-checked first to prevent:
//! - Reading/writing kernel memory via malicious userspace pointers
//! - Integer overflow attacks in pointer arithmetic

use crate::arch_impl::mips::USER_SPACE_END;
use crate::config::Endian;
use crate::error::MemoryFault;

/// A thread's view of its user address space.
pub trait UserMemory {
    /// Read `buf.len()` bytes starting at `addr`.
    fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<(), MemoryFault>;

    /// Write `bytes` starting at `addr`.
    ///
    /// Bytes before the faulting page may already have been written when
    /// this returns an error.
    fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), MemoryFault>;

    /// Range pre-check for `len` bytes at `addr`.
    ///
    /// Passing this check does not mean the memory is mapped, only that the
    /// range lies entirely in userspace.
    fn access_ok(&self, addr: u64, len: usize) -> bool {
        user_range_ok(addr, len)
    }
}

/// Validate that `[addr, addr + len)` lies in userspace
///
/// # Validation Checks
/// 1. Pointer is not null
/// 2. Pointer is within userspace address range
/// 3. Pointer + size doesn't overflow or cross into kernel space
pub fn user_range_ok(addr: u64, len: usize) -> bool {
    if addr == 0 || addr >= USER_SPACE_END {
        return false;
    }

    addr.checked_add(len as u64)
        .map_or(false, |end| end <= USER_SPACE_END)
}

pub fn get_user_u16<M: UserMemory + ?Sized>(
    mem: &M,
    addr: u64,
    endian: Endian,
) -> Result<u16, MemoryFault> {
    let mut buf = [0u8; 2];
    mem.read_bytes(addr, &mut buf)?;
    Ok(endian.read_u16(buf))
}

pub fn get_user_u32<M: UserMemory + ?Sized>(
    mem: &M,
    addr: u64,
    endian: Endian,
) -> Result<u32, MemoryFault> {
    let mut buf = [0u8; 4];
    mem.read_bytes(addr, &mut buf)?;
    Ok(endian.read_u32(buf))
}

pub fn get_user_u64<M: UserMemory + ?Sized>(
    mem: &M,
    addr: u64,
    endian: Endian,
) -> Result<u64, MemoryFault> {
    let mut buf = [0u8; 8];
    mem.read_bytes(addr, &mut buf)?;
    Ok(endian.read_u64(buf))
}

pub fn put_user_u16<M: UserMemory + ?Sized>(
    mem: &mut M,
    addr: u64,
    value: u16,
    endian: Endian,
) -> Result<(), MemoryFault> {
    mem.write_bytes(addr, &endian.u16_bytes(value))
}

pub fn put_user_u32<M: UserMemory + ?Sized>(
    mem: &mut M,
    addr: u64,
    value: u32,
    endian: Endian,
) -> Result<(), MemoryFault> {
    mem.write_bytes(addr, &endian.u32_bytes(value))
}

pub fn put_user_u64<M: UserMemory + ?Sized>(
    mem: &mut M,
    addr: u64,
    value: u64,
    endian: Endian,
) -> Result<(), MemoryFault> {
    mem.write_bytes(addr, &endian.u64_bytes(value))
}
