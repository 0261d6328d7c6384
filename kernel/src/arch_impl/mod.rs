//! Architecture abstraction layer.
//!
//! This module provides the traits the trampoline uses to reach saved
//! register state and cache maintenance, the MIPS definitions of the emulated
//! ISA, and host cache maintenance for the architectures the crate runs on.

pub mod cache;
pub mod mips;
pub mod traits;

#[cfg(target_arch = "aarch64")]
pub mod aarch64;
#[cfg(target_arch = "x86_64")]
pub mod x86_64;

pub use cache::{CacheOp, HostCache, RecordingCache};
pub use traits::*;
