//! MIPS architecture constants.
//!
//! Instruction encodings and register numbers used by the delay-slot
//! trampoline. The trap marker and cookie encodings are part of the frame
//! contract and must never change while frames can be pending.

// ============================================================================
// ISA mode
// ============================================================================

/// Bit 0 of a saved program counter selects the compact (microMIPS) ISA.
pub const ISA16_MODE: u64 = 1;

/// Width of a standard instruction word in bytes.
pub const INSN_SIZE: u64 = 4;

/// Returns the ISA16 mode bit of `pc`.
#[inline]
pub const fn isa16_mode(pc: u64) -> u64 {
    pc & ISA16_MODE
}

/// Returns `pc` with the ISA16 mode bit cleared.
#[inline]
pub const fn msk_isa16_mode(pc: u64) -> u64 {
    pc & !ISA16_MODE
}

// ============================================================================
// Instruction encodings
// ============================================================================

/// BREAK code reserved for math emulation returns.
pub const BRK_MEMU: u32 = 514;

/// `break 514`: the trap marker placed after the relocated instruction.
///
/// The compiler never emits this code, so executing it means a trampoline
/// frame has completed.
pub const BREAK_MATH: u32 = 0x0000_000d | (BRK_MEMU << 16);

/// Cookie stored after the trap marker (`sll $0, $0, 0x1` with a 0xbd tag).
pub const BD_COOKIE: u32 = 0x0000_bd36;

/// The canonical 32-bit no-op (`sll $0, $0, 0`).
pub const NOP32: u32 = 0;

/// microMIPS 16-bit no-op (`move16 $0, $0`), found in the upper half word.
pub const MM_NOP16: u32 = 0x0c00;

/// microMIPS major opcode of ADDIUPC.
pub const MM_ADDIUPC_OP: u32 = 0x1e;

/// `syscall`
pub const SYSCALL_INSN: u32 = 0x0000_000c;

/// `li v0, imm` (`addiu $v0, $zero, imm`) without the immediate.
pub const LI_V0: u32 = 0x2402_0000;

/// o32 sigreturn system call number.
pub const NR_SIGRETURN: u32 = 4119;

/// o32 rt_sigreturn system call number.
pub const NR_RT_SIGRETURN: u32 = 4193;

// ============================================================================
// Registers
// ============================================================================

/// Number of general purpose registers.
pub const NUM_GPRS: usize = 32;

/// `$sp`
pub const REG_SP: usize = 29;

/// `$ra`, written by jump-and-link branches.
pub const REG_RA: usize = 31;

// ============================================================================
// Address space
// ============================================================================

/// End of the user segment (xuseg with 40 segment bits).
pub const USER_SPACE_END: u64 = 0x0000_0100_0000_0000;
