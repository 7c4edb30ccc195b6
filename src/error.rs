//! Platform Error Types
//!
//! Every failure the platform layer can report, and the SBI status code each
//! one becomes when it crosses the privileged-call boundary.

use core::fmt;

/// SBI status codes.
///
/// Values from the RISC-V SBI specification, chapter "Binary Encoding".
pub mod status {
    pub const SUCCESS: i64 = 0;
    pub const ERR_FAILED: i64 = -1;
    pub const ERR_NOT_SUPPORTED: i64 = -2;
    pub const ERR_INVALID_PARAM: i64 = -3;
    pub const ERR_DENIED: i64 = -4;
    pub const ERR_INVALID_ADDRESS: i64 = -5;
}

/// Boot stage that a collaborator failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    /// Serial console setup.
    Console,
    /// Global interrupt controller setup (cold boot only).
    IrqChipCold,
    /// Per-hart interrupt controller setup.
    IrqChipWarm,
    /// Global timer setup (cold boot only).
    TimerCold,
    /// Per-hart timer setup.
    TimerWarm,
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Console => "console",
            Self::IrqChipCold => "irqchip (cold)",
            Self::IrqChipWarm => "irqchip (warm)",
            Self::TimerCold => "timer (cold)",
            Self::TimerWarm => "timer (warm)",
        };
        f.write_str(name)
    }
}

/// Error type for platform operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// PMA base, size or attribute is malformed, or the range overlaps an
    /// occupied region.
    InvalidRegion,
    /// Every PMA slot is occupied.
    OutOfSlots,
    /// PMA slot index is out of range or not allocated.
    InvalidSlot,
    /// The hardware did not latch a PMA entry after programming it.
    HardwareRejected,
    /// The extension or function id is not implemented.
    UnsupportedExtensionFunction,
    /// An external driver failed during boot.
    CollaboratorInitFailed {
        /// Stage that failed.
        stage: BootStage,
        /// Raw code returned by the driver.
        code: i32,
    },
}

impl Error {
    /// SBI status reported to the caller of a privileged call.
    pub const fn sbi_status(self) -> i64 {
        match self {
            Self::InvalidRegion => status::ERR_INVALID_ADDRESS,
            Self::OutOfSlots => status::ERR_FAILED,
            Self::InvalidSlot => status::ERR_INVALID_PARAM,
            Self::HardwareRejected => status::ERR_DENIED,
            Self::UnsupportedExtensionFunction => status::ERR_NOT_SUPPORTED,
            Self::CollaboratorInitFailed { code, .. } => failure_code(code) as i64,
        }
    }

    /// Status returned from a boot entry point.
    ///
    /// Collaborator codes pass through so the runtime sees the driver's own
    /// error. A driver that reports failure with code 0 becomes
    /// `ERR_FAILED`.
    pub const fn boot_status(self) -> i32 {
        match self {
            Self::CollaboratorInitFailed { code, .. } => failure_code(code),
            other => other.sbi_status() as i32,
        }
    }
}

/// A failed call must never report 0.
#[inline]
const fn failure_code(code: i32) -> i32 {
    if code == 0 {
        status::ERR_FAILED as i32
    } else {
        code
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegion => write!(f, "invalid PMA region"),
            Self::OutOfSlots => write!(f, "no free PMA slot"),
            Self::InvalidSlot => write!(f, "invalid or free PMA slot"),
            Self::HardwareRejected => write!(f, "PMA entry not enabled by hardware"),
            Self::UnsupportedExtensionFunction => {
                write!(f, "unsupported vendor extension function")
            }
            Self::CollaboratorInitFailed { stage, code } => {
                write!(f, "{} init failed with code {}", stage, code)
            }
        }
    }
}

/// Result alias for platform operations.
pub type Result<T> = core::result::Result<T, Error>;
