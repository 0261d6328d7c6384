//! MIPS exception frame abstraction.
//!
//! Saved processor context on exceptions, laid out like the kernel's
//! `pt_regs`.

use crate::arch_impl::traits::TrapFrame;

use super::constants::{NUM_GPRS, REG_SP};

#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MipsTrapFrame {
    // General-purpose registers.
    pub regs: [u64; NUM_GPRS],
    // Multiply/divide results.
    pub hi: u64,
    pub lo: u64,
    // Coprocessor 0 state.
    pub cp0_status: u64,
    pub cp0_badvaddr: u64,
    pub cp0_cause: u64,
    pub cp0_epc: u64,
}

impl MipsTrapFrame {
    /// A frame for a thread stopped at `epc` with stack pointer `sp`.
    pub fn new(epc: u64, sp: u64) -> Self {
        let mut frame = Self {
            cp0_epc: epc,
            ..Self::default()
        };
        frame.regs[REG_SP] = sp;
        frame
    }
}

impl TrapFrame for MipsTrapFrame {
    fn instruction_pointer(&self) -> u64 {
        self.cp0_epc
    }

    fn set_instruction_pointer(&mut self, addr: u64) {
        self.cp0_epc = addr;
    }

    fn stack_pointer(&self) -> u64 {
        self.regs[REG_SP]
    }

    fn register(&self, index: usize) -> u64 {
        match index {
            0 => 0,
            _ => self.regs.get(index).copied().unwrap_or(0),
        }
    }

    fn set_register(&mut self, index: usize, value: u64) {
        if index == 0 {
            return;
        }
        if let Some(reg) = self.regs.get_mut(index) {
            *reg = value;
        }
    }
}
