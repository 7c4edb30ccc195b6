//! PMA Region Table
//!
//! Tracks which hardware PMA entries are in use and programs them.
//!
//! # Design
//! - Fixed-size array indexed by slot, occupancy kept in a bitset
//! - Allocation takes the lowest free slot, so slot numbers are
//!   reproducible for a given call sequence
//! - Freeing a free slot is an error, never a silent success

use crate::csr::{Csr, CsrAccess};
use crate::error::{Error, Result};

use super::region::{PmaAttribute, PmaRegion, ETYP_MASK, ETYP_NAPOT};

/// Number of PMA entries implemented by the hardware.
pub const PMA_MAX_ENTRIES: usize = Csr::PMAADDR_COUNT;

/// `mmsc_cfg` bit advertising programmable PMA.
const MMSC_CFG_PPMA: usize = 1 << 30;

/// Table of PMA slots.
#[derive(Debug)]
pub struct PmaTable {
    /// Usable slots, at most [`PMA_MAX_ENTRIES`].
    capacity: usize,
    /// Bit n set = slot n occupied.
    occupied: u32,
    /// Region programmed into each slot. Only meaningful when occupied.
    regions: [Option<PmaRegion>; PMA_MAX_ENTRIES],
}

impl PmaTable {
    /// Create an empty table with `capacity` usable slots.
    ///
    /// Capacities above the hardware entry count are clamped.
    pub const fn new(capacity: usize) -> Self {
        let capacity = if capacity > PMA_MAX_ENTRIES {
            PMA_MAX_ENTRIES
        } else {
            capacity
        };
        Self {
            capacity,
            occupied: 0,
            regions: [None; PMA_MAX_ENTRIES],
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    #[inline]
    pub const fn occupied_count(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    #[inline]
    pub const fn is_occupied(&self, slot: usize) -> bool {
        slot < self.capacity && self.occupied & (1 << slot) != 0
    }

    /// Region held by an occupied slot.
    pub fn region(&self, slot: usize) -> Option<&PmaRegion> {
        if self.is_occupied(slot) {
            self.regions[slot].as_ref()
        } else {
            None
        }
    }

    /// Whether the hardware implements programmable PMA at all.
    ///
    /// Reads the capability bit of `mmsc_cfg`; independent of table state.
    pub fn probe_capability<C: CsrAccess>(csr: &C) -> bool {
        csr.read(Csr::MMSC_CFG) & MMSC_CFG_PPMA != 0
    }

    /// Allocate the lowest free slot for a region and program it.
    ///
    /// # Errors
    /// - `UnsupportedExtensionFunction`: the core has no programmable PMA;
    ///   nothing is written
    /// - `InvalidRegion`: misaligned, undersized, or overlapping an occupied
    ///   region
    /// - `OutOfSlots`: every slot is taken (table left unchanged)
    /// - `HardwareRejected`: the entry did not latch; the slot is released
    pub fn allocate<C: CsrAccess>(
        &mut self,
        csr: &C,
        base: usize,
        size: usize,
        attribute: PmaAttribute,
    ) -> Result<usize> {
        // pmacfg/pmaaddr trap when PMA isn't implemented
        if !Self::probe_capability(csr) {
            log::warn!("PMA requested but mmsc_cfg reports no programmable PMA");
            return Err(Error::UnsupportedExtensionFunction);
        }

        let region = PmaRegion::new(base, size, attribute)?;

        if self.occupied_regions().any(|r| r.overlaps(&region)) {
            log::debug!("PMA [{:#x}, +{:#x}) overlaps an occupied slot", base, size);
            return Err(Error::InvalidRegion);
        }

        let slot = self.find_free().ok_or(Error::OutOfSlots)?;

        if let Err(e) = Self::program(csr, slot, &region) {
            Self::clear(csr, slot);
            log::warn!("PMA slot {} rejected by hardware", slot);
            return Err(e);
        }

        self.occupied |= 1 << slot;
        self.regions[slot] = Some(region);
        log::debug!(
            "PMA slot {} <- [{:#x}, +{:#x}) cfg {:#04x}",
            slot,
            base,
            size,
            attribute.cfg_byte()
        );
        Ok(slot)
    }

    /// Release a slot and clear its hardware entry.
    ///
    /// # Errors
    /// `InvalidSlot` if the index is out of range or the slot is free.
    pub fn free<C: CsrAccess>(&mut self, csr: &C, slot: usize) -> Result<()> {
        if !self.is_occupied(slot) {
            return Err(Error::InvalidSlot);
        }

        Self::clear(csr, slot);
        self.occupied &= !(1 << slot);
        self.regions[slot] = None;
        log::debug!("PMA slot {} freed", slot);
        Ok(())
    }

    fn find_free(&self) -> Option<usize> {
        (0..self.capacity).find(|&slot| self.occupied & (1 << slot) == 0)
    }

    fn occupied_regions(&self) -> impl Iterator<Item = &PmaRegion> {
        let occupied = self.occupied;
        self.regions
            .iter()
            .enumerate()
            .filter(move |(slot, _)| occupied & (1 << slot) != 0)
            .filter_map(|(_, region)| region.as_ref())
    }

    /// Write the address register, then this slot's byte of the config
    /// register, and verify the entry type latched.
    fn program<C: CsrAccess>(csr: &C, slot: usize, region: &PmaRegion) -> Result<()> {
        let addr_csr = Csr::pmaaddr(slot).ok_or(Error::InvalidSlot)?;
        let (cfg_csr, shift) = Csr::pmacfg_for_entry(slot).ok_or(Error::InvalidSlot)?;

        csr.write(addr_csr, region.napot_addr());

        let cfg = csr.read(cfg_csr) & !(0xFF << shift);
        csr.write(cfg_csr, cfg | (usize::from(region.attribute().cfg_byte()) << shift));

        let latched = (csr.read(cfg_csr) >> shift) as u8;
        if latched & ETYP_MASK != ETYP_NAPOT {
            return Err(Error::HardwareRejected);
        }
        Ok(())
    }

    fn clear<C: CsrAccess>(csr: &C, slot: usize) {
        if let Some((cfg_csr, shift)) = Csr::pmacfg_for_entry(slot) {
            csr.clear_bits(cfg_csr, 0xFF << shift);
        }
        if let Some(addr_csr) = Csr::pmaaddr(slot) {
            csr.write(addr_csr, 0);
        }
    }
}

/// PMA table shared by all harts.
///
/// One lock covers the whole table so a scan-then-program on one hart
/// cannot interleave with another hart's.
pub type SharedPmaTable = spin::Mutex<PmaTable>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::fake::FakeCsrs;

    const ATTR: PmaAttribute = PmaAttribute::NON_CACHEABLE;

    fn pma_csrs() -> FakeCsrs {
        FakeCsrs::new().with(Csr::MMSC_CFG, MMSC_CFG_PPMA)
    }

    #[test]
    fn test_allocation_is_lowest_first() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);

        assert_eq!(table.allocate(&csrs, 0x10_0000, 0x10_0000, ATTR), Ok(0));
        assert_eq!(table.allocate(&csrs, 0x1000, 0x1000, ATTR), Ok(1));
        assert_eq!(table.allocate(&csrs, 0x4_0000, 0x4_0000, ATTR), Ok(2));

        let csrs = pma_csrs();
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);

        assert_eq!(table.allocate(&csrs, 0x1000, 0x1000, ATTR), Ok(0));
        assert_eq!(table.allocate(&csrs, 0x4_0000, 0x4_0000, ATTR), Ok(1));
        assert_eq!(table.allocate(&csrs, 0x10_0000, 0x10_0000, ATTR), Ok(2));
    }

    #[test]
    fn test_freed_slot_is_reused_first() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(4);

        for i in 0..3 {
            table.allocate(&csrs, 0x1000 * (i + 1), 0x1000, ATTR).unwrap();
        }
        table.free(&csrs, 1).unwrap();
        assert_eq!(table.allocate(&csrs, 0x8000, 0x1000, ATTR), Ok(1));
    }

    #[test]
    fn test_double_free() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);
        for i in 0..3 {
            table.allocate(&csrs, 0x1000 * (i + 1), 0x1000, ATTR).unwrap();
        }

        assert_eq!(table.free(&csrs, 2), Ok(()));
        assert_eq!(table.free(&csrs, 2), Err(Error::InvalidSlot));
    }

    #[test]
    fn test_free_out_of_range() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(4);
        assert_eq!(table.free(&csrs, 4), Err(Error::InvalidSlot));
        assert_eq!(table.free(&csrs, usize::MAX), Err(Error::InvalidSlot));
        assert_eq!(csrs.write_count(), 0);
    }

    #[test]
    fn test_overlap_rejected() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);

        // [0x1800, 0x2800) is not naturally aligned, so the overlap case
        // runs on [0, 0x4000) occupied and [0x1000, 0x2000) requested
        assert_eq!(
            table.allocate(&csrs, 0x1800, 0x1000, ATTR),
            Err(Error::InvalidRegion)
        );

        table.allocate(&csrs, 0x0, 0x4000, ATTR).unwrap();
        let writes = csrs.write_count();
        assert_eq!(
            table.allocate(&csrs, 0x1000, 0x1000, ATTR),
            Err(Error::InvalidRegion)
        );
        assert_eq!(csrs.write_count(), writes);
        assert_eq!(table.occupied_count(), 1);

        // Adjacent is fine
        assert_eq!(table.allocate(&csrs, 0x4000, 0x1000, ATTR), Ok(1));
    }

    #[test]
    fn test_out_of_slots_leaves_table_unchanged() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);
        for i in 0..PMA_MAX_ENTRIES {
            assert_eq!(table.allocate(&csrs, 0x1000 * i, 0x1000, ATTR), Ok(i));
        }

        let writes = csrs.write_count();
        assert_eq!(
            table.allocate(&csrs, 0x100_0000, 0x1000, ATTR),
            Err(Error::OutOfSlots)
        );
        assert_eq!(table.occupied_count(), PMA_MAX_ENTRIES);
        assert_eq!(csrs.write_count(), writes);
    }

    #[test]
    fn test_smaller_capacity() {
        let csrs = pma_csrs();
        let mut table = PmaTable::new(2);
        table.allocate(&csrs, 0x1000, 0x1000, ATTR).unwrap();
        table.allocate(&csrs, 0x2000, 0x1000, ATTR).unwrap();
        assert_eq!(
            table.allocate(&csrs, 0x3000, 0x1000, ATTR),
            Err(Error::OutOfSlots)
        );
        assert_eq!(PmaTable::new(64).capacity(), PMA_MAX_ENTRIES);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_programming_preserves_neighbours() {
        let csrs = pma_csrs().with(Csr::PMACFG2, 0xAB);
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);
        for i in 0..9 {
            table.allocate(&csrs, 0x1000 * i, 0x1000, ATTR).unwrap();
        }

        // slot 8 is byte 0 of pmacfg2; the preloaded 0xAB was replaced
        assert_eq!(csrs.value(Csr::PMACFG2) & 0xFF, usize::from(ATTR.cfg_byte()));
        assert_eq!(
            csrs.value(Csr::pmaaddr(8).unwrap()),
            table.region(8).unwrap().napot_addr()
        );

        table.free(&csrs, 3).unwrap();
        let cfg0 = csrs.value(Csr::PMACFG0);
        assert_eq!((cfg0 >> 24) & 0xFF, 0);
        assert_eq!((cfg0 >> 16) & 0xFF, usize::from(ATTR.cfg_byte()));
        assert_eq!(csrs.value(Csr::pmaaddr(3).unwrap()), 0);
    }

    #[test]
    fn test_hardware_rejection_releases_slot() {
        let csrs = pma_csrs();
        csrs.ignore_writes(Csr::PMACFG0);
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);

        assert_eq!(
            table.allocate(&csrs, 0x1000, 0x1000, ATTR),
            Err(Error::HardwareRejected)
        );
        assert_eq!(table.occupied_count(), 0);
        assert_eq!(csrs.value(Csr::PMAADDR0), 0);
    }

    #[test]
    fn test_probe_capability() {
        let csrs = FakeCsrs::new();
        assert!(!PmaTable::probe_capability(&csrs));

        let csrs = FakeCsrs::new().with(Csr::MMSC_CFG, 1 << 30);
        assert!(PmaTable::probe_capability(&csrs));
    }

    #[test]
    fn test_allocate_without_pma_writes_nothing() {
        let csrs = FakeCsrs::new();
        let mut table = PmaTable::new(PMA_MAX_ENTRIES);

        assert_eq!(
            table.allocate(&csrs, 0x1000, 0x1000, ATTR),
            Err(Error::UnsupportedExtensionFunction)
        );
        assert_eq!(table.occupied_count(), 0);
        assert_eq!(csrs.write_count(), 0);
    }
}
