//! Signal numbers raised or named by the trampoline (Linux MIPS numbering)

pub const SIGILL: u32 = 4;
pub const SIGTRAP: u32 = 5;
pub const SIGFPE: u32 = 8;
pub const SIGBUS: u32 = 10;
pub const SIGSEGV: u32 = 11;

/// Get signal name for debugging
pub fn signal_name(sig: u32) -> &'static str {
    match sig {
        SIGILL => "SIGILL",
        SIGTRAP => "SIGTRAP",
        SIGFPE => "SIGFPE",
        SIGBUS => "SIGBUS",
        SIGSEGV => "SIGSEGV",
        _ => "UNKNOWN",
    }
}
