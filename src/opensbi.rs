//! OpenSBI Platform Glue
//!
//! Entry points with the signatures OpenSBI's `sbi_platform_operations`
//! expects, and bindings to the C drivers the boot sequencer calls.
//! The platform descriptor table itself lives on the C side and points at
//! the `pc805_*` functions exported here.
//!
//! # Safety Considerations
//! - Every extern call passes values taken from [`PlatformConfig::PC805`]
//! - The trap register pointer from OpenSBI is only read, never stored

use core::ffi::c_void;

use crate::boot::{BootSequencer, Console, DeviceTree, DriverResult, Drivers, IrqChip, Timer};
use crate::config::{PlatformConfig, UartConfig};
use crate::csr::MachineCsrs;
use crate::pma::{PmaTable, SharedPmaTable};
use crate::sbi::{ExtensionCall, VendorExtension};

const CONFIG: PlatformConfig = PlatformConfig::PC805;

/// PMA slots, shared by every hart.
static PMA: SharedPmaTable = SharedPmaTable::new(PmaTable::new(CONFIG.pma_entries));

/// OpenSBI `struct plic_data`.
#[repr(C)]
#[allow(dead_code)]
struct PlicData {
    addr: usize,
    num_src: usize,
}

/// Leading part of OpenSBI `struct sbi_trap_regs`, up to a3.
#[repr(C)]
#[allow(dead_code)]
pub struct TrapRegs {
    zero: usize,
    ra: usize,
    sp: usize,
    gp: usize,
    tp: usize,
    t0: usize,
    t1: usize,
    t2: usize,
    s0: usize,
    s1: usize,
    a0: usize,
    a1: usize,
    a2: usize,
    a3: usize,
}

extern "C" {
    fn plic_cold_irqchip_init(plic: *mut PlicData) -> i32;
    fn plic_warm_irqchip_init(plic: *mut PlicData, m_cntx_id: i32, s_cntx_id: i32) -> i32;
    fn plmt_cold_timer_init(base: usize, hart_count: u32) -> i32;
    fn plmt_warm_timer_init() -> i32;
    fn uart8250_init(
        base: usize,
        in_freq: u32,
        baudrate: u32,
        reg_shift: u32,
        reg_width: u32,
        reg_offset: u32,
    ) -> i32;
    fn fdt_get_address() -> *mut c_void;
    fn fdt_fixups(fdt: *mut c_void);
    fn sbi_putc(ch: u8);
}

#[inline]
fn check(ret: i32) -> DriverResult {
    if ret == 0 {
        Ok(())
    } else {
        Err(ret)
    }
}

struct Plic {
    data: PlicData,
}

impl IrqChip for Plic {
    fn cold_init(&mut self, base: usize, num_sources: u32) -> DriverResult {
        self.data = PlicData {
            addr: base,
            num_src: num_sources as usize,
        };
        // SAFETY: data describes the PLIC from the board configuration
        check(unsafe { plic_cold_irqchip_init(&mut self.data) })
    }

    fn warm_init(&mut self, m_line: u32, s_line: u32) -> DriverResult {
        // SAFETY: same as cold_init
        check(unsafe { plic_warm_irqchip_init(&mut self.data, m_line as i32, s_line as i32) })
    }
}

struct Plmt;

impl Timer for Plmt {
    fn cold_init(&mut self, base: usize, hart_count: u32) -> DriverResult {
        // SAFETY: base is the PLMT MMIO address from the board configuration
        check(unsafe { plmt_cold_timer_init(base, hart_count) })
    }

    fn warm_init(&mut self) -> DriverResult {
        // SAFETY: only valid after cold init, which OpenSBI orders for us
        check(unsafe { plmt_warm_timer_init() })
    }
}

struct Uart8250;

impl Console for Uart8250 {
    fn init(&mut self, uart: &UartConfig) -> DriverResult {
        // SAFETY: UART parameters come from the board configuration
        check(unsafe {
            uart8250_init(
                uart.base,
                uart.clock_frequency,
                uart.baud_rate,
                uart.reg_shift,
                uart.reg_width,
                uart.reg_offset,
            )
        })
    }
}

struct Fdt;

impl DeviceTree for Fdt {
    fn blob_address(&mut self) -> usize {
        // SAFETY: returns the blob address OpenSBI recorded at entry
        unsafe { fdt_get_address() as usize }
    }

    fn apply_fixups(&mut self, blob: usize) {
        // SAFETY: blob came from fdt_get_address
        unsafe { fdt_fixups(blob as *mut c_void) }
    }
}

fn console_puts(s: &str) {
    for byte in s.bytes() {
        // SAFETY: sbi_putc is callable once the console is initialised
        unsafe { sbi_putc(byte) }
    }
}

/// Build a sequencer over the real drivers and run `f` on it.
fn with_sequencer<R>(f: impl FnOnce(&mut BootSequencer<'_, MachineCsrs>) -> R) -> R {
    let mut plic = Plic {
        data: PlicData {
            addr: CONFIG.plic_base,
            num_src: CONFIG.plic_num_sources as usize,
        },
    };
    let mut plmt = Plmt;
    let mut uart = Uart8250;
    let mut fdt = Fdt;
    let mut seq = BootSequencer::new(
        MachineCsrs,
        &CONFIG,
        Drivers {
            irqchip: &mut plic,
            timer: &mut plmt,
            console: &mut uart,
            fdt: &mut fdt,
        },
    );
    f(&mut seq)
}

fn to_status(result: crate::error::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.boot_status(),
    }
}

/// Platform final initialization.
#[no_mangle]
pub extern "C" fn pc805_final_init(cold_boot: bool) -> i32 {
    to_status(with_sequencer(|seq| seq.final_init(cold_boot)))
}

/// Initialize the platform console and hook up logging.
#[no_mangle]
pub extern "C" fn pc805_console_init() -> i32 {
    let result = with_sequencer(|seq| seq.console_init());
    if result.is_ok() {
        // A logger installed earlier by the runtime keeps precedence
        let _ = crate::logger::init(console_puts, CONFIG.log_level);
        crate::kprintln!("{} platform v{}", CONFIG.name, crate::VERSION);
    }
    to_status(result)
}

/// Initialize the interrupt controller for the current hart.
#[no_mangle]
pub extern "C" fn pc805_irqchip_init(cold_boot: bool) -> i32 {
    to_status(with_sequencer(|seq| seq.irqchip_init(cold_boot)))
}

/// Initialize the timer for the current hart.
#[no_mangle]
pub extern "C" fn pc805_timer_init(cold_boot: bool) -> i32 {
    to_status(with_sequencer(|seq| seq.timer_init(cold_boot)))
}

/// Vendor-specific SBI handler.
///
/// # Safety
/// `regs` must point to the trap frame of the current call and `out_value`
/// must be writable. Both are guaranteed by OpenSBI's ecall path.
#[no_mangle]
pub unsafe extern "C" fn pc805_vendor_ext_provider(
    extid: usize,
    funcid: usize,
    regs: *const TrapRegs,
    out_value: *mut usize,
    _out_trap: *mut c_void,
) -> i32 {
    // SAFETY: caller contract
    let regs = unsafe { &*regs };
    let call = ExtensionCall::new(extid, funcid, [regs.a0, regs.a1, regs.a2, regs.a3]);

    let outcome = VendorExtension::new(MachineCsrs, &PMA).dispatch(&call);

    // SAFETY: caller contract
    unsafe { out_value.write(outcome.value) };
    outcome.status as i32
}
