//! MIPS architecture support.
//!
//! The ISA whose branch delay slots the trampoline emulates.

pub mod constants;
pub mod exception_frame;
pub mod insn;

pub use constants::*;
pub use exception_frame::MipsTrapFrame;
