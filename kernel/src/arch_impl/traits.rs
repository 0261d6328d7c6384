//! Architecture-agnostic traits for the emulation trampoline.
//!
//! These traits define the interface between the delay-slot emulator and the
//! surrounding exception framework. The trap framework owns the saved register
//! state and the cache maintenance hardware; the emulator only talks to them
//! through these traits.

/// Saved processor context at the time of an exception.
///
/// Represents the register file the trap framework will restore when it
/// returns to the interrupted thread.
pub trait TrapFrame {
    /// Returns the saved program counter (EPC), including the ISA16 mode bit.
    fn instruction_pointer(&self) -> u64;

    /// Sets the saved program counter.
    fn set_instruction_pointer(&mut self, addr: u64);

    /// Returns the saved stack pointer.
    fn stack_pointer(&self) -> u64;

    /// Returns general purpose register `index`.
    ///
    /// Register 0 and indices past the register file read as zero.
    fn register(&self, index: usize) -> u64;

    /// Sets general purpose register `index`. Writes to register 0 or past
    /// the register file are dropped.
    fn set_register(&mut self, index: usize, value: u64);
}

/// Instruction cache synchronization.
///
/// Any write to memory that will later be fetched as an instruction must be
/// followed by one of these calls before it is executed.
pub trait CacheOps {
    /// Synchronize the instruction stream with data writes in
    /// `[start, start + len)`.
    fn synchronize_instructions(&self, start: u64, len: usize);

    /// Synchronize the single cache line containing `addr`.
    ///
    /// Only sufficient when the platform has no data cache aliasing and the
    /// written instructions share one line.
    fn synchronize_line(&self, addr: u64);
}

impl<C: CacheOps + ?Sized> CacheOps for &C {
    fn synchronize_instructions(&self, start: u64, len: usize) {
        (**self).synchronize_instructions(start, len)
    }

    fn synchronize_line(&self, addr: u64) {
        (**self).synchronize_line(addr)
    }
}
