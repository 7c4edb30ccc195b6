//! PMA Region Descriptors
//!
//! # Entry Encoding
//! ```text
//! pmacfg byte:  [7] reserved  [6] NAMO  [5:2] MTYP  [1:0] ETYP
//! pmaaddr:      (base >> 2) | ((size >> 3) - 1)      (NAPOT)
//! ```
//! Regions are naturally aligned powers of two, at least one 4 KiB page.

use crate::error::{Error, Result};

/// Smallest region the PMA unit can describe.
pub const PMA_GRANULE: usize = 4096;

/// Entry type field value for a naturally aligned power-of-two region.
pub const ETYP_NAPOT: u8 = 0b11;

/// Mask of the entry type field.
pub const ETYP_MASK: u8 = 0b11;

/// Memory type of a PMA region (the MTYP field).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum MemoryType {
    DeviceNonBufferable = 0,
    DeviceBufferable = 1,
    NonCacheableNonBufferable = 2,
    NonCacheableBufferable = 3,
    WriteThroughNoAlloc = 4,
    WriteThroughReadAlloc = 5,
    WriteBackNoAlloc = 8,
    WriteBackReadAlloc = 9,
    WriteBackWriteAlloc = 10,
    WriteBackReadWriteAlloc = 11,
}

impl MemoryType {
    /// Decode an MTYP value. Reserved encodings yield None.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::DeviceNonBufferable,
            1 => Self::DeviceBufferable,
            2 => Self::NonCacheableNonBufferable,
            3 => Self::NonCacheableBufferable,
            4 => Self::WriteThroughNoAlloc,
            5 => Self::WriteThroughReadAlloc,
            8 => Self::WriteBackNoAlloc,
            9 => Self::WriteBackReadAlloc,
            10 => Self::WriteBackWriteAlloc,
            11 => Self::WriteBackReadWriteAlloc,
            _ => return None,
        })
    }
}

/// Attribute of a PMA region as passed in a privileged call.
///
/// Argument layout: bits [3:0] memory type, bit 4 no-AMO. Any other bit set
/// makes the attribute invalid.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PmaAttribute {
    pub memory_type: MemoryType,
    pub no_amo: bool,
}

impl PmaAttribute {
    const MTYP_MASK: usize = 0xF;
    const NAMO: usize = 1 << 4;

    /// Non-cacheable bufferable memory, the type DMA-coherent buffers use.
    pub const NON_CACHEABLE: Self = Self {
        memory_type: MemoryType::NonCacheableBufferable,
        no_amo: false,
    };

    /// Decode an attribute argument.
    pub fn from_arg(arg: usize) -> Result<Self> {
        if arg & !(Self::MTYP_MASK | Self::NAMO) != 0 {
            return Err(Error::InvalidRegion);
        }
        let memory_type =
            MemoryType::from_raw((arg & Self::MTYP_MASK) as u8).ok_or(Error::InvalidRegion)?;
        Ok(Self {
            memory_type,
            no_amo: arg & Self::NAMO != 0,
        })
    }

    /// The `pmacfg` byte for a NAPOT entry with this attribute.
    #[inline]
    pub const fn cfg_byte(self) -> u8 {
        ETYP_NAPOT | ((self.memory_type as u8) << 2) | ((self.no_amo as u8) << 6)
    }
}

/// One programmed PMA region.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PmaRegion {
    base: usize,
    size: usize,
    attribute: PmaAttribute,
}

impl PmaRegion {
    /// Validate and build a region.
    ///
    /// # Errors
    /// `InvalidRegion` if the size is not a power of two of at least
    /// [`PMA_GRANULE`], the base is not aligned to the size, or the range
    /// wraps the address space.
    pub fn new(base: usize, size: usize, attribute: PmaAttribute) -> Result<Self> {
        if size < PMA_GRANULE || !size.is_power_of_two() {
            return Err(Error::InvalidRegion);
        }
        if base & (size - 1) != 0 {
            return Err(Error::InvalidRegion);
        }
        base.checked_add(size - 1).ok_or(Error::InvalidRegion)?;

        Ok(Self {
            base,
            size,
            attribute,
        })
    }

    #[inline]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn attribute(&self) -> PmaAttribute {
        self.attribute
    }

    /// Last byte covered by the region.
    #[inline]
    pub const fn last(&self) -> usize {
        self.base + (self.size - 1)
    }

    /// Check whether two regions share any address.
    #[inline]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.base <= other.last() && other.base <= self.last()
    }

    /// NAPOT encoding for the `pmaaddr` register.
    #[inline]
    pub const fn napot_addr(&self) -> usize {
        (self.base >> 2) | ((self.size >> 3) - 1)
    }
}
