//! Bridge and VLAN slot types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of rows in the active VLAN and VLAN mapping tables.
pub const VLAN_TABLE_SIZE: usize = 64;

/// Opaque identity of a host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BridgeId(pub u64);

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "br{}", self.0)
    }
}

/// Software record of an occupied shared VLAN slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VlanSlot {
    pub bridge: BridgeId,
    /// 0 for the slot of a VLAN-unaware bridge.
    pub vid: u16,
    /// Flow id, shared by every slot of one bridge.
    pub fid: u8,
}

/// Outcome of scanning a bridge's slots for a VID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeScan {
    /// Flow id of the first slot seen for the bridge.
    pub fid: Option<u8>,
    /// Slot already holding the VID.
    pub slot: Option<usize>,
    /// The bridge's slots disagree on the flow id.
    pub conflicting: bool,
}

/// Mirror of the active VLAN table.
///
/// Slots below `reserved` belong to the per-port domains and are never
/// handed out; `[reserved, VLAN_TABLE_SIZE)` is the shared pool.
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: [Option<VlanSlot>; VLAN_TABLE_SIZE],
    reserved: usize,
    allocations: u64,
    releases: u64,
}

impl SlotTable {
    pub fn new(reserved: u8) -> Self {
        Self {
            slots: [None; VLAN_TABLE_SIZE],
            reserved: usize::from(reserved),
            allocations: 0,
            releases: 0,
        }
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn get(&self, index: usize) -> Option<&VlanSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    fn pool(&self) -> impl Iterator<Item = (usize, &VlanSlot)> {
        self.slots
            .iter()
            .enumerate()
            .skip(self.reserved)
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (index, slot)))
    }

    /// Occupied shared slots in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &VlanSlot)> {
        self.pool()
    }

    /// First slot owned by `bridge`, regardless of VID.
    pub fn find_bridge(&self, bridge: BridgeId) -> Option<usize> {
        self.pool()
            .find(|(_, slot)| slot.bridge == bridge)
            .map(|(index, _)| index)
    }

    /// Slot owned by `bridge` for `vid`.
    pub fn find(&self, bridge: BridgeId, vid: u16) -> Option<usize> {
        self.pool()
            .find(|(_, slot)| slot.bridge == bridge && slot.vid == vid)
            .map(|(index, _)| index)
    }

    /// Flow id of the bridge's first slot.
    pub fn bridge_fid(&self, bridge: BridgeId) -> Option<u8> {
        self.find_bridge(bridge)
            .and_then(|index| self.get(index))
            .map(|slot| slot.fid)
    }

    /// Walks the bridge's slots up to the one holding `vid`.
    pub fn scan_bridge(&self, bridge: BridgeId, vid: u16) -> BridgeScan {
        let mut scan = BridgeScan::default();
        for (index, slot) in self.pool().filter(|(_, slot)| slot.bridge == bridge) {
            match scan.fid {
                Some(fid) if fid != slot.fid => scan.conflicting = true,
                Some(_) => {}
                None => scan.fid = Some(slot.fid),
            }
            if slot.vid == vid {
                scan.slot = Some(index);
                break;
            }
        }
        scan
    }

    pub fn first_free(&self) -> Option<usize> {
        (self.reserved..VLAN_TABLE_SIZE).find(|&index| self.slots[index].is_none())
    }

    pub(crate) fn claim(&mut self, index: usize, slot: VlanSlot) {
        if let Some(entry) = self.slots.get_mut(index) {
            *entry = Some(slot);
            self.allocations += 1;
        }
    }

    pub(crate) fn release(&mut self, index: usize) -> Option<VlanSlot> {
        let released = self.slots.get_mut(index).and_then(Option::take);
        if released.is_some() {
            self.releases += 1;
        }
        released
    }

    pub fn occupancy(&self) -> usize {
        self.pool().count()
    }

    pub fn capacity(&self) -> usize {
        VLAN_TABLE_SIZE - self.reserved
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }
}
