//! Vendor Extension Handler
//!
//! Decodes a vendor call and routes it to the cache unit or PMA table.
//!
//! # Safety Considerations
//! - The caller is not trusted: every id and argument is checked
//! - Unknown calls return NOT_SUPPORTED and touch no register
//! - No path halts the hart on bad input

use crate::cache::{CacheControl, ControlRegister, PrefetchKind};
use crate::csr::CsrAccess;
use crate::error::{status, Error, Result};
use crate::pma::{PmaAttribute, PmaTable, SharedPmaTable};

use super::function::{VendorFunction, ANDES_EXTENSION_ID};

/// One privileged call as received from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionCall {
    pub extension_id: usize,
    pub function_id: usize,
    /// a0..a3
    pub args: [usize; 4],
}

impl ExtensionCall {
    pub const fn new(extension_id: usize, function_id: usize, args: [usize; 4]) -> Self {
        Self {
            extension_id,
            function_id,
            args,
        }
    }
}

/// Trap to be redirected to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapInfo {
    pub cause: usize,
    pub tval: usize,
}

/// Result of a vendor call in wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOutcome {
    /// Value returned in a1.
    pub value: usize,
    /// SBI status returned in a0.
    pub status: i64,
    /// Never set by this platform; kept for the runtime's calling convention.
    pub trap: Option<TrapInfo>,
}

impl CallOutcome {
    const fn success(value: usize) -> Self {
        Self {
            value,
            status: status::SUCCESS,
            trap: None,
        }
    }

    const fn failure(err: Error) -> Self {
        Self {
            value: 0,
            status: err.sbi_status(),
            trap: None,
        }
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        self.status == status::SUCCESS
    }
}

/// Vendor extension dispatcher.
///
/// Holds no state of its own between calls. The CSR accessor is the calling
/// hart's; the PMA table is shared by every hart.
#[derive(Debug)]
pub struct VendorExtension<'a, C> {
    csr: C,
    pma: &'a SharedPmaTable,
}

impl<'a, C: CsrAccess> VendorExtension<'a, C> {
    pub const fn new(csr: C, pma: &'a SharedPmaTable) -> Self {
        Self { csr, pma }
    }

    /// Dispatch a vendor call.
    ///
    /// # Returns
    /// The value and status to place in a1/a0
    pub fn dispatch(&self, call: &ExtensionCall) -> CallOutcome {
        match self.handle(call) {
            Ok(value) => CallOutcome::success(value),
            Err(e) => {
                log::debug!(
                    "vendor call {:#x}/{} failed: {}",
                    call.extension_id,
                    call.function_id,
                    e
                );
                CallOutcome::failure(e)
            }
        }
    }

    fn handle(&self, call: &ExtensionCall) -> Result<usize> {
        let function = match VendorFunction::from_id(call.function_id) {
            Some(f) if call.extension_id == ANDES_EXTENSION_ID => f,
            _ => {
                log::warn!(
                    "Unsupported vendor sbi call: {:#x} - {}",
                    call.extension_id,
                    call.function_id
                );
                return Err(Error::UnsupportedExtensionFunction);
            }
        };

        let cache = CacheControl::new(&self.csr);
        let [a0, a1, a2, a3] = call.args;
        let enable = a0 != 0;

        match function {
            VendorFunction::GetCacheCtlStatus => Ok(cache.read_status(ControlRegister::Cache)),
            VendorFunction::GetMiscCtlStatus => Ok(cache.read_status(ControlRegister::Misc)),
            VendorFunction::SetCacheCtl => {
                cache.apply(ControlRegister::Cache, a0);
                Ok(0)
            }
            VendorFunction::SetMiscCtl => {
                cache.apply(ControlRegister::Misc, a0);
                Ok(0)
            }
            VendorFunction::ICacheOp => {
                cache.icache_op(enable);
                Ok(0)
            }
            VendorFunction::DCacheOp => {
                cache.dcache_op(enable);
                Ok(0)
            }
            VendorFunction::InstructionPrefetch => {
                cache.prefetch(PrefetchKind::Instruction, enable);
                Ok(0)
            }
            VendorFunction::DataPrefetch => {
                cache.prefetch(PrefetchKind::Data, enable);
                Ok(0)
            }
            VendorFunction::NonBlockingLoadStore => {
                cache.non_blocking_load_store(enable);
                Ok(0)
            }
            VendorFunction::WriteAround => {
                cache.write_around(enable);
                Ok(0)
            }
            // Power-brake control is not wired up on PC805. Both calls
            // succeed without touching any register.
            VendorFunction::ReadPowerBrake | VendorFunction::WritePowerBrake => Ok(0),
            VendorFunction::SetPma => {
                let attribute = PmaAttribute::from_arg(a3)?;
                log::trace!("set PMA pa={:#x} va={:#x} size={:#x}", a0, a1, a2);
                self.pma.lock().allocate(&self.csr, a0, a2, attribute)
            }
            VendorFunction::FreePma => self.pma.lock().free(&self.csr, a0).map(|()| 0),
            VendorFunction::ProbePma => Ok(PmaTable::probe_capability(&self.csr) as usize),
        }
    }
}
