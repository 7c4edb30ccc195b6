//! Cache Control Register Layouts
//!
//! Bit assignments from the Andes V5 core manuals. Values read from hardware
//! are wrapped with `from_bits_retain` so bits this crate does not name are
//! never dropped.

use bitflags::bitflags;

bitflags! {
    /// `mcache_ctl` bits owned by the platform layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CacheCtl: usize {
        /// Instruction cache enable.
        const IC_EN = 1 << 0;
        /// Data cache enable.
        const DC_EN = 1 << 1;
        /// Allow S/U-mode CCTL (cache maintenance) instructions.
        const CCTL_SUEN = 1 << 8;
        /// L1 instruction prefetch enable.
        const L1I_PREFETCH_EN = 1 << 9;
        /// L1 data prefetch enable.
        const L1D_PREFETCH_EN = 1 << 10;
        /// Write-around on streaming stores (threshold level 1).
        const DC_WAROUND_1 = 1 << 13;

        /// Bits enabled on every hart at boot.
        const BOOT_DEFAULT = Self::IC_EN.bits() | Self::DC_EN.bits() | Self::CCTL_SUEN.bits();
    }
}

bitflags! {
    /// `mmisc_ctl` bits owned by the platform layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MiscCtl: usize {
        /// Non-blocking load/store.
        const NON_BLOCKING_EN = 1 << 8;
    }
}

/// `mcctlcommand` value: write back and invalidate the whole L1 D-cache.
pub const L1D_WBINVAL_ALL: usize = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_keeps_vendor_bits() {
        let raw = 0x4000_0042usize;
        let ctl = CacheCtl::from_bits_retain(raw) | CacheCtl::IC_EN;
        assert_eq!(ctl.bits(), raw | 1);
    }

    #[test]
    fn test_boot_default() {
        assert_eq!(CacheCtl::BOOT_DEFAULT.bits(), 0x103);
    }
}
