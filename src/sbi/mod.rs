//! Andes Vendor SBI Extension
//!
//! Privileged calls a supervisor issues to control non-architectural
//! features of the Andes V5 cores.
//!
//! # Calling Convention
//! - a7: extension id (`0x0900_031E`)
//! - a6: function id
//! - a0-a3: arguments
//! - returns status in a0, value in a1
//!
//! # Security Model
//! - Whitelist: only the functions listed in [`function::numbers`] exist
//! - Unknown ids return NOT_SUPPORTED; they never trap or halt

pub mod function;
mod handler;

pub use function::{VendorFunction, ANDES_EXTENSION_ID};
pub use handler::{CallOutcome, ExtensionCall, TrapInfo, VendorExtension};
