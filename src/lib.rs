//! Picocom PC805 Platform Layer
//!
//! Platform support for the PC805 (Andes V5 cores) underneath an
//! OpenSBI-style runtime.
//!
//! # Responsibilities
//! - Per-hart boot: L1 caches, then device tree, console, PLIC and PLMT
//! - Andes vendor SBI extension: cache control, prefetch, ordering,
//!   write-around, and PMA region management
//!
//! # Design
//! - Hardware state is reached through [`csr::CsrAccess`], injected into
//!   every component, so the whole layer runs on the host under test
//! - The PMA table is the only state shared between harts and sits behind
//!   one spinlock
//! - Bad privileged calls return an SBI error; nothing here halts the hart
//!
//! # Target
//! - `riscv64`: [`opensbi`] exports the C entry points
//! - anything else: library only, for tests

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod boot;
pub mod cache;
pub mod config;
pub mod csr;
pub mod error;
pub mod logger;
#[cfg(target_arch = "riscv64")]
pub mod opensbi;
pub mod pma;
pub mod sbi;

pub use boot::{BootPhase, BootSequencer, Drivers};
pub use config::PlatformConfig;
pub use error::{Error, Result};
pub use pma::{PmaTable, SharedPmaTable};
pub use sbi::{CallOutcome, ExtensionCall, VendorExtension};

/// Platform layer version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
