//! Verification helpers for simulated hardware state.

use gsw_hal::regs::table;
use gsw_hal::RegisterBlock;
use thiserror::Error;

use crate::switch::SimSwitch;

/// Verification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("active VLAN slot {index} is not valid")]
    SlotInactive { index: u16 },

    #[error("active VLAN slot {index} is still valid")]
    SlotStillActive { index: u16 },

    #[error("slot {index} {field} is {actual:#06x}, expected {expected:#06x}")]
    SlotMismatch {
        index: u16,
        field: &'static str,
        expected: u16,
        actual: u16,
    },

    #[error("register {block}:{offset:#05x} is {actual:#06x}, expected {expected:#06x} under mask {mask:#06x}")]
    RegisterMismatch {
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        expected: u32,
        actual: u32,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Inspects VLAN tables and registers of a [`SimSwitch`].
pub struct TableVerifier<'a> {
    sim: &'a SimSwitch,
}

impl<'a> TableVerifier<'a> {
    pub fn new(sim: &'a SimSwitch) -> Self {
        Self { sim }
    }

    /// Active VLAN slot is valid with the given VID and flow id.
    pub fn assert_slot_active(&self, index: u16, vid: u16, fid: u16) -> VerifyResult<()> {
        let row = self.sim.row(table::ACTIVE_VLAN, index);
        if !row.valid {
            return Err(VerificationError::SlotInactive { index });
        }
        check(index, "vid", vid, row.key[0])?;
        check(index, "fid", fid, row.val[0])
    }

    pub fn assert_slot_inactive(&self, index: u16) -> VerifyResult<()> {
        if self.sim.row(table::ACTIVE_VLAN, index).valid {
            return Err(VerificationError::SlotStillActive { index });
        }
        Ok(())
    }

    /// VLAN mapping row has exactly the given member and tag maps.
    pub fn assert_mapping(&self, index: u16, members: u16, tagged: u16) -> VerifyResult<()> {
        let row = self.sim.row(table::VLAN_MAPPING, index);
        check(index, "members", members, row.val[1])?;
        check(index, "tagged", tagged, row.val[2])
    }

    /// Member port map of a mapping row.
    pub fn members(&self, index: u16) -> u16 {
        self.sim.row(table::VLAN_MAPPING, index).val[1]
    }

    /// Indices of valid active VLAN rows at or above `from`.
    pub fn active_slots(&self, from: u16) -> Vec<u16> {
        self.sim
            .table(table::ACTIVE_VLAN)
            .iter()
            .enumerate()
            .skip(usize::from(from))
            .filter(|(_, row)| row.valid)
            .map(|(index, _)| index as u16)
            .collect()
    }

    pub fn assert_bits(
        &self,
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        expected: u32,
    ) -> VerifyResult<()> {
        let actual = self.sim.reg(block, offset) & mask;
        if actual != expected {
            return Err(VerificationError::RegisterMismatch {
                block,
                offset,
                mask,
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn assert_bits_set(&self, block: RegisterBlock, offset: u32, bits: u32) -> VerifyResult<()> {
        self.assert_bits(block, offset, bits, bits)
    }

    pub fn assert_bits_clear(
        &self,
        block: RegisterBlock,
        offset: u32,
        bits: u32,
    ) -> VerifyResult<()> {
        self.assert_bits(block, offset, bits, 0)
    }
}

fn check(index: u16, field: &'static str, expected: u16, actual: u16) -> VerifyResult<()> {
    if expected != actual {
        return Err(VerificationError::SlotMismatch {
            index,
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
