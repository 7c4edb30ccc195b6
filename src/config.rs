//! Platform Configuration
//!
//! Static description of the board: where the interrupt controller, timer
//! and console live, and how many harts and PMA entries there are.

use log::LevelFilter;

/// 8250-compatible UART parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    /// MMIO base address.
    pub base: usize,
    /// Input clock in Hz.
    pub clock_frequency: u32,
    pub baud_rate: u32,
    /// Register index shift (stride = 1 << shift).
    pub reg_shift: u32,
    /// Register access width in bytes.
    pub reg_width: u32,
    /// Offset of register 0 from `base`.
    pub reg_offset: u32,
}

/// Board description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    pub name: &'static str,
    pub hart_count: u32,
    /// PLIC MMIO base.
    pub plic_base: usize,
    /// Number of PLIC interrupt sources.
    pub plic_num_sources: u32,
    /// PLMT (machine timer) MMIO base.
    pub plmt_base: usize,
    pub uart: UartConfig,
    /// PMA entries made available to supervisors.
    pub pma_entries: usize,
    /// Maximum level passed to the console logger.
    pub log_level: LevelFilter,
}

impl PlatformConfig {
    /// Picocom PC805.
    pub const PC805: Self = Self {
        name: "Picocom PC805",
        hart_count: 4,
        plic_base: 0xE400_0000,
        plic_num_sources: 71,
        plmt_base: 0xE600_0000,
        uart: UartConfig {
            base: 0xF030_0000,
            clock_frequency: 50_000_000,
            baud_rate: 115_200,
            reg_shift: 2,
            reg_width: 4,
            reg_offset: 0x20,
        },
        pma_entries: 16,
        log_level: LevelFilter::Info,
    };
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::PC805
    }
}
