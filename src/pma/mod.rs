//! Physical Memory Attribute (PMA) Regions
//!
//! The Andes PMA unit overrides the memory type of up to 16 naturally
//! aligned address ranges, independently of page tables. Supervisor
//! software uses it to get non-cacheable DMA buffers.
//!
//! # Lifecycle
//! - `allocate` validates a region, claims the lowest free slot, and
//!   programs `pmaaddrN` and the slot's `pmacfg` byte
//! - the slot index is the handle from then on
//! - `free` clears the hardware entry and releases the slot

mod region;
mod table;

pub use region::{MemoryType, PmaAttribute, PmaRegion, PMA_GRANULE};
pub use table::{PmaTable, SharedPmaTable, PMA_MAX_ENTRIES};
