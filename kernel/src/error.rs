//! Error types for the delay-slot trampoline.

use core::fmt;

use crate::signal::constants::SIGBUS;

/// A user memory access that faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryFault {
    /// First address of the access that could not be completed.
    pub addr: u64,
}

impl fmt::Display for MemoryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memory fault at {:#x}", self.addr)
    }
}

/// Broad class of a [`DsemulError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The scratch region has no room for another frame.
    ResourceExhausted,
    /// A frame could not be written or read back.
    AccessViolation,
    /// Scratch region bookkeeping is inconsistent.
    Corruption,
}

/// Failures of the trampoline itself.
///
/// Every variant is fatal to the current emulation and is surfaced to the
/// thread as the signal returned by [`DsemulError::signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsemulError {
    /// Pushing a frame would overlap the trampoline code at the page start.
    ScratchExhausted,
    /// The stack slot below the stack pointer failed the access pre-check.
    StackNotWritable { addr: u64 },
    /// Writing the frame to the user stack faulted.
    StackWriteFault { addr: u64 },
    /// The trap was recognized but its continuation could not be read.
    FrameReadFault { addr: u64 },
    /// Popping a frame would move the occupancy offset past the page end.
    ScratchUnderflow,
}

impl DsemulError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DsemulError::ScratchExhausted => ErrorKind::ResourceExhausted,
            DsemulError::StackNotWritable { .. }
            | DsemulError::StackWriteFault { .. }
            | DsemulError::FrameReadFault { .. } => ErrorKind::AccessViolation,
            DsemulError::ScratchUnderflow => ErrorKind::Corruption,
        }
    }

    /// Signal the trap framework must force on the thread.
    pub fn signal(&self) -> u32 {
        SIGBUS
    }
}

impl fmt::Display for DsemulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DsemulError::ScratchExhausted => write!(f, "scratch region exhausted"),
            DsemulError::StackNotWritable { addr } => {
                write!(f, "stack frame at {:#x} is not writable", addr)
            }
            DsemulError::StackWriteFault { addr } => {
                write!(f, "fault writing stack frame at {:#x}", addr)
            }
            DsemulError::FrameReadFault { addr } => {
                write!(f, "fault reading continuation of frame at {:#x}", addr)
            }
            DsemulError::ScratchUnderflow => write!(f, "scratch region offset underflow"),
        }
    }
}

/// Failures installing a scratch region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// The address space already has a scratch region.
    AlreadyInstalled,
    /// The user base address is not page aligned.
    Misaligned { base: u64 },
    /// The page cannot hold the trampoline code and at least one frame.
    PageTooSmall { size: usize },
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::AlreadyInstalled => write!(f, "scratch region already installed"),
            RegionError::Misaligned { base } => {
                write!(f, "scratch region base {:#x} is not page aligned", base)
            }
            RegionError::PageTooSmall { size } => {
                write!(f, "page size {} too small for a scratch region", size)
            }
        }
    }
}
