//! x86_64 architecture implementation.
//!
//! Host-side cache maintenance for embedders running the trampoline against
//! real mappings on x86_64.

pub mod cache;
