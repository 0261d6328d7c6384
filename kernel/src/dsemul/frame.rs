//! Emulation frame layout.
//!
//! A frame holds the relocated instruction, the trap marker that follows it,
//! a cookie, and the addresses needed to leave the trampoline. The field
//! order and encodings are a fixed contract between the frame builder and the
//! code that later reads frames back, which treats the bytes as untrusted.

use core::mem::{offset_of, size_of};

use crate::arch_impl::mips::{BD_COOKIE, BREAK_MATH};
use crate::config::Endian;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuFrame {
    /// The relocated delay-slot instruction.
    pub emul: u32,
    /// Trap marker executed right after `emul`.
    pub badinst: u32,
    pub cookie: u32,
    /// Where execution continues once `emul` has run.
    pub epc: u64,
    /// Target of the branch owning the delay slot.
    pub bpc: u64,
    /// `$ra` when the frame was built.
    pub r31: u64,
}

pub const EMUL_OFFSET: usize = offset_of!(EmuFrame, emul);
pub const BADINST_OFFSET: usize = offset_of!(EmuFrame, badinst);
pub const COOKIE_OFFSET: usize = offset_of!(EmuFrame, cookie);
pub const EPC_OFFSET: usize = offset_of!(EmuFrame, epc);
pub const BPC_OFFSET: usize = offset_of!(EmuFrame, bpc);
pub const R31_OFFSET: usize = offset_of!(EmuFrame, r31);

pub const FRAME_SIZE: usize = size_of::<EmuFrame>();

/// Frame size rounded to 8 bytes so `emul` and `badinst` share a cache line.
pub const FRAME_ROUNDED_SIZE: usize = (FRAME_SIZE + 0x7) & !0x7;

/// Alignment of stack-placed frames.
pub const FRAME_ALIGN: u64 = 0x8;

const _: () = assert!(FRAME_SIZE == 40);
const _: () = assert!(BADINST_OFFSET == EMUL_OFFSET + 4);
const _: () = assert!(COOKIE_OFFSET == BADINST_OFFSET + 4);

/// Serialized frame bytes.
pub type FrameImage = [u8; FRAME_ROUNDED_SIZE];

/// Encode an instruction word for memory.
///
/// Compact-ISA code is addressed in half words, so in ISA16 mode the word is
/// stored as two 16-bit halves, high half first.
#[inline]
pub fn insn_bytes(insn: u32, isa16: bool, endian: Endian) -> [u8; 4] {
    if !isa16 {
        return endian.u32_bytes(insn);
    }
    let hi = endian.u16_bytes((insn >> 16) as u16);
    let lo = endian.u16_bytes(insn as u16);
    [hi[0], hi[1], lo[0], lo[1]]
}

/// Decode an instruction word stored by [`insn_bytes`].
#[inline]
pub fn read_insn(bytes: [u8; 4], isa16: bool, endian: Endian) -> u32 {
    if !isa16 {
        return endian.read_u32(bytes);
    }
    let hi = endian.read_u16([bytes[0], bytes[1]]) as u32;
    let lo = endian.read_u16([bytes[2], bytes[3]]) as u32;
    (hi << 16) | lo
}

impl EmuFrame {
    /// A frame relocating `insn`, resuming at `epc`.
    pub fn new(insn: u32, epc: u64, bpc: u64, r31: u64) -> Self {
        Self {
            emul: insn,
            badinst: BREAK_MATH,
            cookie: BD_COOKIE,
            epc,
            bpc,
            r31,
        }
    }

    /// Serialize the frame. Padding bytes are zero.
    pub fn encode(&self, isa16: bool, endian: Endian) -> FrameImage {
        let mut image = [0u8; FRAME_ROUNDED_SIZE];
        image[EMUL_OFFSET..EMUL_OFFSET + 4].copy_from_slice(&insn_bytes(self.emul, isa16, endian));
        image[BADINST_OFFSET..BADINST_OFFSET + 4]
            .copy_from_slice(&insn_bytes(self.badinst, isa16, endian));
        image[COOKIE_OFFSET..COOKIE_OFFSET + 4].copy_from_slice(&endian.u32_bytes(self.cookie));
        image[EPC_OFFSET..EPC_OFFSET + 8].copy_from_slice(&endian.u64_bytes(self.epc));
        image[BPC_OFFSET..BPC_OFFSET + 8].copy_from_slice(&endian.u64_bytes(self.bpc));
        image[R31_OFFSET..R31_OFFSET + 8].copy_from_slice(&endian.u64_bytes(self.r31));
        image
    }

    /// Parse a serialized frame. No field is validated.
    pub fn decode(image: &FrameImage, isa16: bool, endian: Endian) -> Self {
        let word = |at: usize| [image[at], image[at + 1], image[at + 2], image[at + 3]];
        let dword = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&image[at..at + 8]);
            endian.read_u64(bytes)
        };
        Self {
            emul: read_insn(word(EMUL_OFFSET), isa16, endian),
            badinst: read_insn(word(BADINST_OFFSET), isa16, endian),
            cookie: endian.read_u32(word(COOKIE_OFFSET)),
            epc: dword(EPC_OFFSET),
            bpc: dword(BPC_OFFSET),
            r31: dword(R31_OFFSET),
        }
    }

    /// The marker and cookie identify a frame built by this crate.
    pub fn is_genuine(&self) -> bool {
        self.badinst == BREAK_MATH && self.cookie == BD_COOKIE
    }
}
