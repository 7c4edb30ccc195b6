//! Boot Sequencer
//!
//! Brings one hart into a known state. Every hart runs its own sequencer;
//! exactly one is told it is the cold-boot hart and performs the
//! system-wide setup.
//!
//! # Sequence
//! ```text
//! NotStarted -> CachesEnabled -> FixupsApplied (cold) -> Ready
//!                             -> FixupsSkipped (warm) -> Ready
//! ```
//! 1. Enable L1 caches (every hart, always first)
//! 2. Device-tree fixups (cold only)
//! 3. Console (cold only)
//! 4. Interrupt controller: global setup (cold only), then per-hart lines
//! 5. Timer: global setup (cold only), then per-hart
//!
//! Any driver error aborts the sequence. Nothing is retried.
//!
//! A sequencer's [`BootPhase`] only tracks the calls made on that
//! sequencer. The runtime glue builds a fresh one for each entry point, so
//! there the phase covers the current call and nothing earlier.

use crate::cache::CacheControl;
use crate::config::PlatformConfig;
use crate::csr::CsrAccess;
use crate::error::{status, BootStage, Error, Result};

/// Result of an external driver call, carrying the driver's raw error code.
pub type DriverResult = core::result::Result<(), i32>;

/// Interrupt controller driver.
pub trait IrqChip {
    /// One-time global setup.
    fn cold_init(&mut self, base: usize, num_sources: u32) -> DriverResult;

    /// Per-hart setup for the hart's M-mode and S-mode interrupt lines.
    fn warm_init(&mut self, m_line: u32, s_line: u32) -> DriverResult;
}

/// Machine timer driver.
pub trait Timer {
    /// One-time global setup.
    fn cold_init(&mut self, base: usize, hart_count: u32) -> DriverResult;

    /// Per-hart setup.
    fn warm_init(&mut self) -> DriverResult;
}

/// Serial console driver.
pub trait Console {
    fn init(&mut self, uart: &crate::config::UartConfig) -> DriverResult;
}

/// Device-tree fixup provider.
pub trait DeviceTree {
    /// Address of the flattened device tree handed to the next stage.
    fn blob_address(&mut self) -> usize;

    /// Patch the blob for this platform.
    fn apply_fixups(&mut self, blob: usize);
}

/// External drivers the sequencer calls into.
pub struct Drivers<'a> {
    pub irqchip: &'a mut dyn IrqChip,
    pub timer: &'a mut dyn Timer,
    pub console: &'a mut dyn Console,
    pub fdt: &'a mut dyn DeviceTree,
}

/// Progress of one hart through the boot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    NotStarted,
    CachesEnabled,
    FixupsApplied,
    FixupsSkipped,
    Ready,
}

/// Interrupt lines owned by a hart: `2 * hart` (M-mode) and
/// `2 * hart + 1` (S-mode).
///
/// `None` if the line numbers don't fit the controller's 32-bit context ids.
#[inline]
pub fn irq_lines(hart_id: usize) -> Option<(u32, u32)> {
    let m_line = u32::try_from(hart_id).ok()?.checked_mul(2)?;
    Some((m_line, m_line + 1))
}

/// Per-hart boot sequencer.
pub struct BootSequencer<'a, C> {
    csr: C,
    config: &'a PlatformConfig,
    drivers: Drivers<'a>,
    phase: BootPhase,
}

impl<'a, C: CsrAccess> BootSequencer<'a, C> {
    pub fn new(csr: C, config: &'a PlatformConfig, drivers: Drivers<'a>) -> Self {
        Self {
            csr,
            config,
            drivers,
            phase: BootPhase::NotStarted,
        }
    }

    #[inline]
    pub fn phase(&self) -> BootPhase {
        self.phase
    }

    /// Run the whole sequence for this hart.
    pub fn run(&mut self, cold_boot: bool) -> Result<()> {
        self.final_init(cold_boot)?;
        if cold_boot {
            self.console_init()?;
        }
        self.irqchip_init(cold_boot)?;
        self.timer_init(cold_boot)?;

        self.phase = BootPhase::Ready;
        log::info!("hart {} ready", self.csr.hart_id());
        Ok(())
    }

    /// Enable caches and, on the cold-boot hart, apply device-tree fixups.
    pub fn final_init(&mut self, cold_boot: bool) -> Result<()> {
        CacheControl::new(&self.csr).enable_caches();
        self.phase = BootPhase::CachesEnabled;

        if !cold_boot {
            self.phase = BootPhase::FixupsSkipped;
            return Ok(());
        }

        let blob = self.drivers.fdt.blob_address();
        self.drivers.fdt.apply_fixups(blob);
        self.phase = BootPhase::FixupsApplied;
        log::info!("{}: device tree at {:#x} fixed up", self.config.name, blob);
        Ok(())
    }

    /// Initialise the serial console.
    pub fn console_init(&mut self) -> Result<()> {
        self.drivers
            .console
            .init(&self.config.uart)
            .map_err(|code| failed(BootStage::Console, code))
    }

    /// Set up the interrupt controller for this hart.
    pub fn irqchip_init(&mut self, cold_boot: bool) -> Result<()> {
        if cold_boot {
            self.drivers
                .irqchip
                .cold_init(self.config.plic_base, self.config.plic_num_sources)
                .map_err(|code| failed(BootStage::IrqChipCold, code))?;
        }

        let hart = self.csr.hart_id();
        let (m_line, s_line) = irq_lines(hart).ok_or_else(|| {
            log::error!("hart {:#x} has no interrupt lines", hart);
            Error::CollaboratorInitFailed {
                stage: BootStage::IrqChipWarm,
                code: status::ERR_INVALID_PARAM as i32,
            }
        })?;
        self.drivers
            .irqchip
            .warm_init(m_line, s_line)
            .map_err(|code| failed(BootStage::IrqChipWarm, code))
    }

    /// Set up the machine timer for this hart.
    pub fn timer_init(&mut self, cold_boot: bool) -> Result<()> {
        if cold_boot {
            self.drivers
                .timer
                .cold_init(self.config.plmt_base, self.config.hart_count)
                .map_err(|code| failed(BootStage::TimerCold, code))?;
        }

        self.drivers
            .timer
            .warm_init()
            .map_err(|code| failed(BootStage::TimerWarm, code))
    }
}

fn failed(stage: BootStage, code: i32) -> Error {
    log::error!("{} init failed: {}", stage, code);
    Error::CollaboratorInitFailed { stage, code }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::cache::CacheCtl;
    use crate::config::UartConfig;
    use crate::csr::fake::FakeCsrs;
    use crate::csr::Csr;

    const BLOB: usize = 0x8220_0000;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Fixups { blob: usize, caches_on: bool },
        Console(UartConfig),
        IrqCold(usize, u32),
        IrqWarm(u32, u32),
        TimerCold(usize, u32),
        TimerWarm,
    }

    type Trace = RefCell<Vec<Event>>;

    struct FakeIrq<'t> {
        trace: &'t Trace,
        fail_cold: Option<i32>,
    }

    impl IrqChip for FakeIrq<'_> {
        fn cold_init(&mut self, base: usize, num_sources: u32) -> DriverResult {
            if let Some(code) = self.fail_cold {
                return Err(code);
            }
            self.trace.borrow_mut().push(Event::IrqCold(base, num_sources));
            Ok(())
        }

        fn warm_init(&mut self, m_line: u32, s_line: u32) -> DriverResult {
            self.trace.borrow_mut().push(Event::IrqWarm(m_line, s_line));
            Ok(())
        }
    }

    struct FakeTimer<'t> {
        trace: &'t Trace,
        fail_warm: Option<i32>,
    }

    impl Timer for FakeTimer<'_> {
        fn cold_init(&mut self, base: usize, hart_count: u32) -> DriverResult {
            self.trace.borrow_mut().push(Event::TimerCold(base, hart_count));
            Ok(())
        }

        fn warm_init(&mut self) -> DriverResult {
            if let Some(code) = self.fail_warm {
                return Err(code);
            }
            self.trace.borrow_mut().push(Event::TimerWarm);
            Ok(())
        }
    }

    struct FakeConsole<'t> {
        trace: &'t Trace,
    }

    impl Console for FakeConsole<'_> {
        fn init(&mut self, uart: &UartConfig) -> DriverResult {
            self.trace.borrow_mut().push(Event::Console(*uart));
            Ok(())
        }
    }

    struct FakeFdt<'t> {
        trace: &'t Trace,
        csrs: &'t FakeCsrs,
    }

    impl DeviceTree for FakeFdt<'_> {
        fn blob_address(&mut self) -> usize {
            BLOB
        }

        fn apply_fixups(&mut self, blob: usize) {
            let ctl = CacheCtl::from_bits_retain(self.csrs.value(Csr::MCACHE_CTL));
            self.trace.borrow_mut().push(Event::Fixups {
                blob,
                caches_on: ctl.contains(CacheCtl::BOOT_DEFAULT),
            });
        }
    }

    /// Run a full boot on `hart` and return the driver trace.
    fn boot(
        hart: usize,
        cold_boot: bool,
        fail_irq_cold: Option<i32>,
        fail_timer_warm: Option<i32>,
    ) -> (Result<()>, BootPhase, Vec<Event>, usize) {
        let csrs = FakeCsrs::new().with(Csr::MHARTID, hart);
        let trace = Trace::default();
        let config = PlatformConfig::PC805;

        let mut irq = FakeIrq {
            trace: &trace,
            fail_cold: fail_irq_cold,
        };
        let mut timer = FakeTimer {
            trace: &trace,
            fail_warm: fail_timer_warm,
        };
        let mut console = FakeConsole { trace: &trace };
        let mut fdt = FakeFdt {
            trace: &trace,
            csrs: &csrs,
        };

        let mut seq = BootSequencer::new(
            &csrs,
            &config,
            Drivers {
                irqchip: &mut irq,
                timer: &mut timer,
                console: &mut console,
                fdt: &mut fdt,
            },
        );
        let result = seq.run(cold_boot);
        let phase = seq.phase();
        drop(seq);

        let cache_ctl = csrs.value(Csr::MCACHE_CTL);
        (result, phase, trace.into_inner(), cache_ctl)
    }

    #[test]
    fn test_cold_boot_order() {
        let cfg = PlatformConfig::PC805;
        let (result, phase, trace, cache_ctl) = boot(0, true, None, None);

        assert_eq!(result, Ok(()));
        assert_eq!(phase, BootPhase::Ready);
        assert_eq!(cache_ctl & 0x103, 0x103);
        assert_eq!(
            trace,
            vec![
                Event::Fixups {
                    blob: BLOB,
                    caches_on: true
                },
                Event::Console(cfg.uart),
                Event::IrqCold(cfg.plic_base, cfg.plic_num_sources),
                Event::IrqWarm(0, 1),
                Event::TimerCold(cfg.plmt_base, cfg.hart_count),
                Event::TimerWarm,
            ]
        );
    }

    #[test]
    fn test_warm_boot_skips_global_setup() {
        let (result, phase, trace, cache_ctl) = boot(3, false, None, None);

        assert_eq!(result, Ok(()));
        assert_eq!(phase, BootPhase::Ready);
        assert_eq!(cache_ctl & 0x103, 0x103);
        assert_eq!(trace, vec![Event::IrqWarm(6, 7), Event::TimerWarm]);
    }

    #[test]
    fn test_irq_lines() {
        assert_eq!(irq_lines(0), Some((0, 1)));
        assert_eq!(irq_lines(3), Some((6, 7)));
        assert_eq!(irq_lines(0x7FFF_FFFF), Some((0xFFFF_FFFE, 0xFFFF_FFFF)));
        assert_eq!(irq_lines(0x8000_0000), None);
        assert_eq!(irq_lines(usize::MAX), None);
    }

    #[test]
    fn test_oversized_hart_id_fails_irqchip() {
        let (result, phase, trace, _) = boot(usize::MAX, false, None, None);

        assert_eq!(
            result,
            Err(Error::CollaboratorInitFailed {
                stage: BootStage::IrqChipWarm,
                code: status::ERR_INVALID_PARAM as i32
            })
        );
        assert_eq!(phase, BootPhase::FixupsSkipped);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_driver_failure_with_zero_code() {
        let (result, _, _, _) = boot(0, true, Some(0), None);

        let err = result.unwrap_err();
        assert_eq!(err.boot_status(), status::ERR_FAILED as i32);
    }

    #[test]
    fn test_cold_irq_failure_aborts() {
        let (result, phase, trace, _) = boot(0, true, Some(-3), None);

        assert_eq!(
            result,
            Err(Error::CollaboratorInitFailed {
                stage: BootStage::IrqChipCold,
                code: -3
            })
        );
        assert_eq!(phase, BootPhase::FixupsApplied);
        assert!(!trace.iter().any(|e| matches!(e, Event::IrqWarm(..))));
        assert!(!trace.iter().any(|e| matches!(e, Event::TimerCold(..))));
    }

    #[test]
    fn test_warm_timer_failure_propagates() {
        let (result, phase, trace, _) = boot(1, false, None, Some(-5));

        assert_eq!(
            result,
            Err(Error::CollaboratorInitFailed {
                stage: BootStage::TimerWarm,
                code: -5
            })
        );
        assert_ne!(phase, BootPhase::Ready);
        assert_eq!(trace, vec![Event::IrqWarm(2, 3)]);
    }

    #[test]
    fn test_final_init_alone() {
        let csrs = FakeCsrs::new().with(Csr::MCACHE_CTL, 0x103);
        let trace = Trace::default();
        let config = PlatformConfig::PC805;
        let mut irq = FakeIrq {
            trace: &trace,
            fail_cold: None,
        };
        let mut timer = FakeTimer {
            trace: &trace,
            fail_warm: None,
        };
        let mut console = FakeConsole { trace: &trace };
        let mut fdt = FakeFdt {
            trace: &trace,
            csrs: &csrs,
        };
        let mut seq = BootSequencer::new(
            &csrs,
            &config,
            Drivers {
                irqchip: &mut irq,
                timer: &mut timer,
                console: &mut console,
                fdt: &mut fdt,
            },
        );

        assert_eq!(seq.phase(), BootPhase::NotStarted);
        seq.final_init(false).unwrap();
        assert_eq!(seq.phase(), BootPhase::FixupsSkipped);
        drop(seq);

        // caches were already on: no write, no fixups
        assert_eq!(csrs.write_count(), 0);
        assert!(trace.borrow().is_empty());
    }
}
