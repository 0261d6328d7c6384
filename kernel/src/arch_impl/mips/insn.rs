//! Decoding of the few instruction forms the trampoline short-circuits.
//!
//! Full decoding of delay-slot instructions is left to the hardware; only the
//! forms that can be completed without executing them are recognized here.

use super::constants::*;

/// A delay-slot instruction that does not need a trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastPath {
    /// The instruction has no architectural effect.
    Nop,
    /// microMIPS ADDIUPC: writes `base + (simm << 2)` to `reg`.
    AddiuPc { reg: usize, simm: i32 },
}

/// Classify `ir` for the ISA selected by `isa16`.
///
/// In ISA16 mode the first (or only) 16-bit half of the instruction sits in
/// the upper half of `ir`.
pub fn classify(ir: u32, isa16: bool) -> Option<FastPath> {
    if ir == NOP32 {
        return Some(FastPath::Nop);
    }

    if !isa16 {
        return None;
    }

    if ir >> 16 == MM_NOP16 {
        return Some(FastPath::Nop);
    }

    if ir >> 26 == MM_ADDIUPC_OP {
        return Some(FastPath::AddiuPc {
            reg: addiupc_reg((ir >> 23) & 0x7),
            simm: sign_extend(ir & 0x7f_ffff, 23),
        });
    }

    None
}

/// Map the 3-bit ADDIUPC register field to a GPR number.
///
/// 0 and 1 select $s0/$s1 (16, 17); 2..=7 select $v0..$a3 directly.
#[inline]
pub const fn addiupc_reg(field: u32) -> usize {
    (((field + 0xe) & 0xf) + 2) as usize
}

/// Value ADDIUPC writes when completed against `base`.
#[inline]
pub const fn addiupc_value(base: u64, simm: i32) -> u64 {
    (base & !3).wrapping_add(((simm as i64) << 2) as u64)
}

#[inline]
const fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Encode a microMIPS ADDIUPC for `field` and a 23-bit signed immediate.
pub const fn encode_addiupc(field: u32, simm: i32) -> u32 {
    (MM_ADDIUPC_OP << 26) | ((field & 0x7) << 23) | (simm as u32 & 0x7f_ffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_is_fast_path_in_both_modes() {
        assert_eq!(classify(0, false), Some(FastPath::Nop));
        assert_eq!(classify(0, true), Some(FastPath::Nop));
    }

    #[test]
    fn test_nop16_only_in_isa16_mode() {
        let ir = (MM_NOP16 << 16) | 0x1234;
        assert_eq!(classify(ir, true), Some(FastPath::Nop));
        assert_eq!(classify(ir, false), None);
    }

    #[test]
    fn test_addiupc_register_mapping() {
        assert_eq!(addiupc_reg(0), 16);
        assert_eq!(addiupc_reg(1), 17);
        for field in 2..8 {
            assert_eq!(addiupc_reg(field), field as usize);
        }
    }

    #[test]
    fn test_addiupc_decoding() {
        let ir = encode_addiupc(3, -5);
        assert_eq!(classify(ir, true), Some(FastPath::AddiuPc { reg: 3, simm: -5 }));
        assert_eq!(classify(ir, false), None);
    }

    #[test]
    fn test_addiupc_immediate_extremes() {
        let max = (1 << 22) - 1;
        let min = -(1 << 22);
        assert_eq!(
            classify(encode_addiupc(0, max), true),
            Some(FastPath::AddiuPc { reg: 16, simm: max })
        );
        assert_eq!(
            classify(encode_addiupc(1, min), true),
            Some(FastPath::AddiuPc { reg: 17, simm: min })
        );
    }

    #[test]
    fn test_addiupc_value() {
        assert_eq!(addiupc_value(0x40_1003, 4), 0x40_1000 + 16);
        assert_eq!(addiupc_value(0x40_1000, -1), 0x40_1000 - 4);
        assert_eq!(addiupc_value(0x40_1002, 0), 0x40_1000);
    }

    #[test]
    fn test_ordinary_instruction_not_fast_path() {
        // lwc1 $f0, 0($sp)
        assert_eq!(classify(0xc7a0_0000, false), None);
        assert_eq!(classify(0xc7a0_0000, true), None);
    }
}
