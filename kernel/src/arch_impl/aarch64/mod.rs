//! AArch64 (ARM64) architecture implementation.
//!
//! Host-side cache maintenance for embedders running the trampoline against
//! real mappings on ARM64.

pub mod cache;
