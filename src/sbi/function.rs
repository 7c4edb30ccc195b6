//! Andes Vendor Extension Function IDs
//!
//! Numbering follows the Andes SBI vendor extension. Only the functions
//! PC805 implements decode to a [`VendorFunction`]; every other id, assigned
//! or not, is unsupported.

/// Andes machine vendor ID (`mvendorid`).
pub const ANDES_VENDOR_ID: usize = 0x31E;

/// First extension id of the SBI vendor range.
pub const SBI_EXT_VENDOR_START: usize = 0x0900_0000;

/// Extension id the Andes vendor calls arrive under.
pub const ANDES_EXTENSION_ID: usize = SBI_EXT_VENDOR_START + ANDES_VENDOR_ID;

/// Function numbers.
pub mod numbers {
    pub const GET_MCACHE_CTL_STATUS: usize = 0;
    pub const GET_MMISC_CTL_STATUS: usize = 1;
    pub const SET_MCACHE_CTL: usize = 2;
    pub const SET_MMISC_CTL: usize = 3;
    pub const ICACHE_OP: usize = 4;
    pub const DCACHE_OP: usize = 5;
    pub const L1CACHE_I_PREFETCH: usize = 6;
    pub const L1CACHE_D_PREFETCH: usize = 7;
    pub const NON_BLOCKING_LOAD_STORE: usize = 8;
    pub const WRITE_AROUND: usize = 9;
    pub const READ_POWERBRAKE: usize = 12;
    pub const WRITE_POWERBRAKE: usize = 13;
    pub const SET_PMA: usize = 20;
    pub const FREE_PMA: usize = 21;
    pub const PROBE_PMA: usize = 22;
}

/// A vendor function implemented by this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorFunction {
    GetCacheCtlStatus,
    GetMiscCtlStatus,
    SetCacheCtl,
    SetMiscCtl,
    ICacheOp,
    DCacheOp,
    InstructionPrefetch,
    DataPrefetch,
    NonBlockingLoadStore,
    WriteAround,
    ReadPowerBrake,
    WritePowerBrake,
    SetPma,
    FreePma,
    ProbePma,
}

impl VendorFunction {
    /// Decode a function id.
    pub const fn from_id(id: usize) -> Option<Self> {
        use numbers::*;

        Some(match id {
            GET_MCACHE_CTL_STATUS => Self::GetCacheCtlStatus,
            GET_MMISC_CTL_STATUS => Self::GetMiscCtlStatus,
            SET_MCACHE_CTL => Self::SetCacheCtl,
            SET_MMISC_CTL => Self::SetMiscCtl,
            ICACHE_OP => Self::ICacheOp,
            DCACHE_OP => Self::DCacheOp,
            L1CACHE_I_PREFETCH => Self::InstructionPrefetch,
            L1CACHE_D_PREFETCH => Self::DataPrefetch,
            NON_BLOCKING_LOAD_STORE => Self::NonBlockingLoadStore,
            WRITE_AROUND => Self::WriteAround,
            READ_POWERBRAKE => Self::ReadPowerBrake,
            WRITE_POWERBRAKE => Self::WritePowerBrake,
            SET_PMA => Self::SetPma,
            FREE_PMA => Self::FreePma,
            PROBE_PMA => Self::ProbePma,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_id() {
        assert_eq!(ANDES_EXTENSION_ID, 0x0900_031E);
    }

    #[test]
    fn test_decode() {
        assert_eq!(VendorFunction::from_id(0), Some(VendorFunction::GetCacheCtlStatus));
        assert_eq!(VendorFunction::from_id(20), Some(VendorFunction::SetPma));
        assert_eq!(VendorFunction::from_id(22), Some(VendorFunction::ProbePma));
        // assigned by Andes but not implemented on PC805
        assert_eq!(VendorFunction::from_id(10), None);
        assert_eq!(VendorFunction::from_id(0xFFFF_FFFF), None);
    }
}
