//! Out-of-line delay-slot emulation for a MIPS-style FPU emulator.
//!
//! See [`dsemul`] for how frames are built, resolved and unwound, and
//! [`DelaySlotEmulator`] for the entry points a trap framework calls.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch_impl;
pub mod config;
pub mod dsemul;
pub mod error;
pub mod logger;
pub mod memory;
pub mod signal;

pub use config::{Endian, PlatformConfig};
pub use dsemul::{DelaySlot, DelaySlotEmulator, Emulation, StatsSnapshot, TrapResolution};
pub use error::{DsemulError, ErrorKind, MemoryFault, RegionError};
