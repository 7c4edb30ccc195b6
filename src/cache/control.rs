//! Cache Control Unit
//!
//! Operations on the current hart's cache and miscellaneous control
//! registers. None of them can fail here: if the hardware refuses a bit,
//! the next read simply shows the old value.

use crate::csr::{Csr, CsrAccess};

use super::registers::{CacheCtl, MiscCtl, L1D_WBINVAL_ALL};

/// Control registers visible to status queries and raw writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRegister {
    /// `mcache_ctl`
    Cache,
    /// `mmisc_ctl`
    Misc,
}

impl ControlRegister {
    #[inline]
    const fn csr(self) -> Csr {
        match self {
            Self::Cache => Csr::MCACHE_CTL,
            Self::Misc => Csr::MMISC_CTL,
        }
    }
}

/// Which L1 prefetcher an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchKind {
    Instruction,
    Data,
}

/// Cache control for one hart.
#[derive(Debug)]
pub struct CacheControl<C> {
    csr: C,
}

impl<C: CsrAccess> CacheControl<C> {
    /// Create a cache control unit over the given CSR accessor.
    pub const fn new(csr: C) -> Self {
        Self { csr }
    }

    /// Current `mcache_ctl`, vendor bits included.
    #[inline]
    pub fn cache_ctl(&self) -> CacheCtl {
        CacheCtl::from_bits_retain(self.csr.read(Csr::MCACHE_CTL))
    }

    /// Current `mmisc_ctl`, vendor bits included.
    #[inline]
    pub fn misc_ctl(&self) -> MiscCtl {
        MiscCtl::from_bits_retain(self.csr.read(Csr::MMISC_CTL))
    }

    /// Enable the I-cache, D-cache and S-mode cache maintenance.
    ///
    /// Writes only when at least one of the three bits is clear, so calling
    /// this on an already configured hart performs no write.
    ///
    /// # Returns
    /// `true` if the register was written.
    pub fn enable_caches(&self) -> bool {
        let current = self.cache_ctl();
        let missing = CacheCtl::BOOT_DEFAULT.difference(current);
        if missing.is_empty() {
            log::trace!("mcache_ctl already {:#x}", current.bits());
            return false;
        }

        let updated = current | missing;
        self.csr.write(Csr::MCACHE_CTL, updated.bits());
        log::debug!(
            "mcache_ctl {:#x} -> {:#x}",
            current.bits(),
            updated.bits()
        );
        true
    }

    /// Raw value of a control register.
    #[inline]
    pub fn read_status(&self, register: ControlRegister) -> usize {
        self.csr.read(register.csr())
    }

    /// Install a full register value verbatim.
    ///
    /// No validation: a privileged caller can disable caches or put the
    /// hart into a slow mode with this.
    pub fn apply(&self, register: ControlRegister, raw: usize) {
        log::debug!("{:?} control <- {:#x}", register, raw);
        self.csr.write(register.csr(), raw);
    }

    /// Enable or disable the L1 I-cache.
    ///
    /// Disabling is followed by `fence.i` so no stale fetch survives.
    pub fn icache_op(&self, enable: bool) {
        if enable {
            self.csr.set_bits(Csr::MCACHE_CTL, CacheCtl::IC_EN.bits());
        } else {
            self.csr.clear_bits(Csr::MCACHE_CTL, CacheCtl::IC_EN.bits());
            self.csr.fence_i();
        }
    }

    /// Enable or disable the L1 D-cache.
    ///
    /// Disabling writes back and invalidates every line.
    pub fn dcache_op(&self, enable: bool) {
        if enable {
            self.csr.set_bits(Csr::MCACHE_CTL, CacheCtl::DC_EN.bits());
        } else {
            self.csr.clear_bits(Csr::MCACHE_CTL, CacheCtl::DC_EN.bits());
            self.csr.write(Csr::MCCTL_COMMAND, L1D_WBINVAL_ALL);
        }
    }

    /// Enable or disable an L1 prefetcher.
    pub fn prefetch(&self, kind: PrefetchKind, enable: bool) {
        let bit = match kind {
            PrefetchKind::Instruction => CacheCtl::L1I_PREFETCH_EN,
            PrefetchKind::Data => CacheCtl::L1D_PREFETCH_EN,
        };
        self.update(Csr::MCACHE_CTL, bit.bits(), enable);
    }

    /// Enable or disable non-blocking loads and stores.
    pub fn non_blocking_load_store(&self, enable: bool) {
        self.update(Csr::MMISC_CTL, MiscCtl::NON_BLOCKING_EN.bits(), enable);
    }

    /// Enable or disable D-cache write-around.
    pub fn write_around(&self, enable: bool) {
        self.update(Csr::MCACHE_CTL, CacheCtl::DC_WAROUND_1.bits(), enable);
    }

    #[inline]
    fn update(&self, csr: Csr, bits: usize, enable: bool) {
        if enable {
            self.csr.set_bits(csr, bits);
        } else {
            self.csr.clear_bits(csr, bits);
        }
    }
}
