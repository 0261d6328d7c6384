//! Signal numbers and the signal return trampolines.
//!
//! Signal delivery itself belongs to the trap framework. This module only
//! names the signals the trampoline raises and provides the sigreturn code
//! that shares the scratch page with emulation frames.

pub mod constants;
pub mod trampoline;
