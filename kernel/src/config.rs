//! Platform configuration for the delay-slot trampoline.
//!
//! Describes the properties of the emulated machine that change how frames
//! are laid out and flushed. Defaults describe a little-endian CPU with 4 KiB
//! pages and no data cache aliasing; the `big-endian` feature flips the
//! default byte order.

/// Byte order of frame fields in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order selected at build time.
    pub const fn build_default() -> Self {
        if cfg!(feature = "big-endian") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    #[inline]
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    #[inline]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    #[inline]
    pub fn u64_bytes(self, value: u64) -> [u8; 8] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    #[inline]
    pub fn read_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        }
    }
}

/// Default page size (4 KiB).
pub const DEFAULT_PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Size of the scratch region page in bytes. Must be a power of two.
    pub page_size: usize,
    /// Byte order used for every frame field.
    pub endian: Endian,
    /// The data cache can alias, so single-line flushes are not enough.
    pub dcache_aliases: bool,
}

impl PlatformConfig {
    pub const fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            endian: Endian::build_default(),
            dcache_aliases: false,
        }
    }

    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub const fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub const fn with_dcache_aliases(mut self, aliases: bool) -> Self {
        self.dcache_aliases = aliases;
        self
    }

    /// Mask selecting the page base of an address.
    #[inline]
    pub const fn page_mask(&self) -> u64 {
        !(self.page_size as u64 - 1)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::new()
    }
}
