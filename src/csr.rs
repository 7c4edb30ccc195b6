//! Control and Status Register Access
//!
//! The platform layer never touches CSRs directly. Everything goes through
//! [`CsrAccess`], so the cache unit, PMA table and boot sequencer can run
//! against the real hart or against a recording double in tests.
//!
//! # Andes V5 vendor CSRs used here
//! ```text
//! 0x7CA  mcache_ctl    L1 cache control
//! 0x7CC  mcctlcommand  cache maintenance command
//! 0x7D0  mmisc_ctl     miscellaneous control
//! 0xBC0  pmacfg0       PMA entries 0-7 (RV64)
//! 0xBC2  pmacfg2       PMA entries 8-15 (RV64)
//! 0xBD0  pmaaddr0..15  PMA entry addresses
//! 0xFC2  mmsc_cfg      machine misc configuration (read-only)
//! ```

/// A CSR number.
///
/// Newtype over the 12-bit CSR address so arbitrary integers are not passed
/// where a register is expected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct Csr(u16);

impl Csr {
    /// Hart ID register.
    pub const MHARTID: Self = Self(0xF14);
    /// L1 cache control.
    pub const MCACHE_CTL: Self = Self(0x7CA);
    /// Cache maintenance command register.
    pub const MCCTL_COMMAND: Self = Self(0x7CC);
    /// Miscellaneous control.
    pub const MMISC_CTL: Self = Self(0x7D0);
    /// Machine misc configuration, advertises optional features.
    pub const MMSC_CFG: Self = Self(0xFC2);
    /// PMA configuration for entries 0-7.
    pub const PMACFG0: Self = Self(0xBC0);
    /// PMA configuration for entries 8-15.
    pub const PMACFG2: Self = Self(0xBC2);
    /// Address register of PMA entry 0.
    pub const PMAADDR0: Self = Self(0xBD0);

    /// Number of PMA address registers.
    pub const PMAADDR_COUNT: usize = 16;

    /// Address register of PMA entry `index`.
    ///
    /// Returns None if the index is past the last hardware entry.
    #[inline]
    pub const fn pmaaddr(index: usize) -> Option<Self> {
        if index < Self::PMAADDR_COUNT {
            Some(Self(Self::PMAADDR0.0 + index as u16))
        } else {
            None
        }
    }

    /// Configuration register holding PMA entry `index`, and the bit offset
    /// of that entry's byte within it.
    ///
    /// Each register packs one byte per entry, XLEN/8 entries per register.
    /// RV64 uses only the even-numbered `pmacfg` registers.
    #[inline]
    pub const fn pmacfg_for_entry(index: usize) -> Option<(Self, u32)> {
        const PER_REG: usize = core::mem::size_of::<usize>();
        if index >= Self::PMAADDR_COUNT {
            return None;
        }
        let reg = (index / PER_REG) * (PER_REG / 4);
        let shift = ((index % PER_REG) * 8) as u32;
        Some((Self(Self::PMACFG0.0 + reg as u16), shift))
    }

    /// Get the raw CSR address.
    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }
}

/// Access to the current hart's CSRs.
///
/// `set_bits` and `clear_bits` default to read-modify-write; the hardware
/// implementation overrides them with `csrs`/`csrc`.
pub trait CsrAccess {
    /// Read a CSR.
    fn read(&self, csr: Csr) -> usize;

    /// Write a CSR.
    fn write(&self, csr: Csr, value: usize);

    /// Set the given bits, leaving the rest untouched.
    fn set_bits(&self, csr: Csr, bits: usize) {
        let value = self.read(csr);
        self.write(csr, value | bits);
    }

    /// Clear the given bits, leaving the rest untouched.
    fn clear_bits(&self, csr: Csr, bits: usize) {
        let value = self.read(csr);
        self.write(csr, value & !bits);
    }

    /// Synchronise the instruction and data streams (`fence.i`).
    fn fence_i(&self);

    /// Hart ID of the calling hart.
    #[inline]
    fn hart_id(&self) -> usize {
        self.read(Csr::MHARTID)
    }
}

impl<T: CsrAccess + ?Sized> CsrAccess for &T {
    #[inline]
    fn read(&self, csr: Csr) -> usize {
        (**self).read(csr)
    }

    #[inline]
    fn write(&self, csr: Csr, value: usize) {
        (**self).write(csr, value)
    }

    #[inline]
    fn set_bits(&self, csr: Csr, bits: usize) {
        (**self).set_bits(csr, bits)
    }

    #[inline]
    fn clear_bits(&self, csr: Csr, bits: usize) {
        (**self).clear_bits(csr, bits)
    }

    #[inline]
    fn fence_i(&self) {
        (**self).fence_i()
    }
}

#[cfg(target_arch = "riscv64")]
pub use machine::MachineCsrs;

#[cfg(target_arch = "riscv64")]
mod machine {
    use core::arch::asm;

    use super::{Csr, CsrAccess};

    macro_rules! csrr {
        ($num:literal) => {{
            let value: usize;
            // SAFETY: reading a CSR has no memory side effects. Only CSRs
            // listed in `csr_table!` below are reachable.
            unsafe {
                asm!(
                    concat!("csrr {}, ", stringify!($num)),
                    out(reg) value,
                    options(nomem, nostack, preserves_flags)
                );
            }
            value
        }};
    }

    macro_rules! csrw {
        ($num:literal, $value:expr) => {{
            // SAFETY: we run in M-mode and the CSR exists on Andes V5 cores.
            unsafe {
                asm!(
                    concat!("csrw ", stringify!($num), ", {}"),
                    in(reg) $value,
                    options(nostack)
                );
            }
        }};
    }

    macro_rules! csrs {
        ($num:literal, $bits:expr) => {{
            // SAFETY: same as csrw
            unsafe {
                asm!(
                    concat!("csrs ", stringify!($num), ", {}"),
                    in(reg) $bits,
                    options(nostack)
                );
            }
        }};
    }

    macro_rules! csrc {
        ($num:literal, $bits:expr) => {{
            // SAFETY: same as csrw
            unsafe {
                asm!(
                    concat!("csrc ", stringify!($num), ", {}"),
                    in(reg) $bits,
                    options(nostack)
                );
            }
        }};
    }

    // CSR numbers are immediates in the instruction encoding, so every
    // register the platform layer uses needs its own arm.
    macro_rules! csr_table {
        (ro: [$($ro:literal),*], rw: [$($rw:literal),*]) => {
            fn read_raw(csr: u16) -> usize {
                match csr {
                    $($ro => csrr!($ro),)*
                    $($rw => csrr!($rw),)*
                    _ => 0,
                }
            }

            fn write_raw(csr: u16, value: usize) {
                match csr {
                    $($rw => csrw!($rw, value),)*
                    _ => log::warn!("write to unmapped CSR {:#x} ignored", csr),
                }
            }

            fn set_raw(csr: u16, bits: usize) {
                match csr {
                    $($rw => csrs!($rw, bits),)*
                    _ => log::warn!("set on unmapped CSR {:#x} ignored", csr),
                }
            }

            fn clear_raw(csr: u16, bits: usize) {
                match csr {
                    $($rw => csrc!($rw, bits),)*
                    _ => log::warn!("clear on unmapped CSR {:#x} ignored", csr),
                }
            }
        };
    }

    csr_table!(
        ro: [0xf14, 0xfc2],
        rw: [
            0x7ca, 0x7cc, 0x7d0, 0xbc0, 0xbc2,
            0xbd0, 0xbd1, 0xbd2, 0xbd3, 0xbd4, 0xbd5, 0xbd6, 0xbd7,
            0xbd8, 0xbd9, 0xbda, 0xbdb, 0xbdc, 0xbdd, 0xbde, 0xbdf
        ]
    );

    /// CSRs of the hart executing the call.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MachineCsrs;

    impl CsrAccess for MachineCsrs {
        #[inline]
        fn read(&self, csr: Csr) -> usize {
            read_raw(csr.number())
        }

        #[inline]
        fn write(&self, csr: Csr, value: usize) {
            write_raw(csr.number(), value)
        }

        #[inline]
        fn set_bits(&self, csr: Csr, bits: usize) {
            set_raw(csr.number(), bits)
        }

        #[inline]
        fn clear_bits(&self, csr: Csr, bits: usize) {
            clear_raw(csr.number(), bits)
        }

        #[inline]
        fn fence_i(&self) {
            // SAFETY: fence.i only orders instruction fetch
            unsafe {
                asm!("fence.i", options(nostack, preserves_flags));
            }
        }
    }
}
