//! L1 Cache Control
//!
//! Manages the Andes V5 `mcache_ctl` and `mmisc_ctl` registers of the
//! current hart.
//!
//! # Register Ownership
//! - Only the bits named in [`CacheCtl`] and [`MiscCtl`] are modified
//! - Vendor-reserved bits are carried through every read-modify-write
//! - [`CacheControl::apply`] is the one verbatim write, for trusted callers

mod control;
mod registers;

pub use control::{CacheControl, ControlRegister, PrefetchKind};
pub use registers::{CacheCtl, MiscCtl, L1D_WBINVAL_ALL};
