//! Forwarding-domain allocation on the active VLAN and VLAN mapping tables.

use gsw_hal::regs::switch;
use gsw_hal::{RegisterBackend, RegisterBlock};
use tracing::{debug, error, instrument, warn};

use super::types::{BridgeId, SlotTable, VlanSlot};
use crate::error::{GswError, GswResult};
use crate::pce::{TableEngine, TableEntry, TableId};
use crate::port_bit;

/// Hardware VID used for the slot of a VLAN-unaware bridge.
const UNAWARE_VID: u16 = 0;

/// Translates bridge membership into VLAN table rows.
///
/// Borrowed for the length of one operation while the caller holds the
/// switch state lock, so slot bookkeeping and the rows it mirrors change
/// together.
pub struct DomainAllocator<'a, B> {
    slots: &'a mut SlotTable,
    engine: &'a TableEngine<B>,
    cpu_port: u8,
    max_ports: u8,
}

impl<'a, B: RegisterBackend> DomainAllocator<'a, B> {
    pub fn new(slots: &'a mut SlotTable, engine: &'a TableEngine<B>, cpu_port: u8, max_ports: u8) -> Self {
        Self {
            slots,
            engine,
            cpu_port,
            max_ports,
        }
    }

    fn check_port(&self, port: u8) -> GswResult<()> {
        if port >= self.max_ports {
            return Err(GswError::invalid_config(format!(
                "port {} out of range (max {})",
                port,
                self.max_ports - 1
            )));
        }
        Ok(())
    }

    fn set_default_pvid(&self, port: u8, slot: usize) {
        self.engine
            .backend()
            .write(RegisterBlock::Switch, switch::pce_defpvid(port), slot as u32);
    }

    /// Enables or disables the private domain of a standalone port.
    ///
    /// Slot `port + 1` carries flow id `port + 1` with members {port, CPU}.
    /// Disabling only invalidates the active VLAN row.
    #[instrument(skip(self))]
    pub fn ensure_single_port_domain(&mut self, port: u8, enable: bool) -> GswResult<()> {
        self.check_port(port)?;
        if port == self.cpu_port {
            error!("CPU port {} has no single-port domain", port);
            return Err(GswError::not_supported("single-port domain on the CPU port"));
        }
        let index = u16::from(port) + 1;

        let mut active = TableEntry::new(TableId::ActiveVlan, index).with_valid(enable);
        active.key[0] = 0;
        active.val[0] = index;
        self.engine.write_entry(&active).map_err(|err| {
            error!("failed to write active VLAN {}: {}", index, err);
            err
        })?;

        if !enable {
            return Ok(());
        }

        let mut mapping = TableEntry::new(TableId::VlanMapping, index);
        mapping.val[0] = 0;
        mapping.val[1] = port_bit(port) | port_bit(self.cpu_port);
        mapping.val[2] = 0;
        self.engine.write_entry(&mapping).map_err(|err| {
            error!("failed to write VLAN mapping {}: {}", index, err);
            err
        })
    }

    /// Claims the first free shared slot for `(bridge, vid)`.
    ///
    /// The row is written before the slot is recorded, so a failed write
    /// leaves the bookkeeping untouched.
    fn create_active(&mut self, bridge: BridgeId, fid: Option<u8>, vid: u16) -> GswResult<usize> {
        let index = self.slots.first_free().ok_or_else(|| {
            warn!("no free VLAN slot for {} vid {}", bridge, vid);
            GswError::NoSpace
        })?;
        let fid = fid.unwrap_or(index as u8);

        let mut active = TableEntry::new(TableId::ActiveVlan, index as u16).with_valid(true);
        active.key[0] = vid;
        active.val[0] = u16::from(fid);
        self.engine.write_entry(&active).map_err(|err| {
            error!("failed to write active VLAN {}: {}", index, err);
            err
        })?;

        self.slots.claim(index, VlanSlot { bridge, vid, fid });
        debug!(slot = index, fid, "claimed VLAN slot for {}", bridge);
        Ok(index)
    }

    /// Invalidates a shared slot and forgets it, even if the write fails.
    fn remove_active(&mut self, index: usize) -> GswResult<()> {
        let active = TableEntry::new(TableId::ActiveVlan, index as u16);
        let result = self.engine.write_entry(&active);
        if let Err(err) = &result {
            error!("failed to invalidate active VLAN {}: {}", index, err);
        }
        if let Some(slot) = self.slots.release(index) {
            debug!(slot = index, "released VLAN slot of {}", slot.bridge);
        }
        result
    }

    /// Writes a mapping row, undoing a fresh slot claim if the write fails.
    fn commit_mapping(&mut self, mapping: &TableEntry, index: usize, created: bool) -> GswResult<()> {
        let Err(err) = self.engine.write_entry(mapping) else {
            return Ok(());
        };
        error!("failed to write VLAN mapping {}: {}", index, err);
        if created {
            if let Err(rollback) = self.remove_active(index) {
                error!("rollback of VLAN slot {} failed: {}", index, rollback);
            }
        }
        Err(err)
    }

    /// Adds a port to a VLAN-unaware bridge.
    ///
    /// The bridge's first slot is reused; otherwise a new slot with VID 0
    /// and flow id equal to its index is claimed. Returns the slot index.
    #[instrument(skip(self), fields(%bridge))]
    pub fn join_unaware(&mut self, bridge: BridgeId, port: u8) -> GswResult<usize> {
        self.check_port(port)?;

        let (index, mut mapping, created) = match self.slots.find_bridge(bridge) {
            Some(index) => {
                let mapping = self
                    .engine
                    .read_entry(TableId::VlanMapping, index as u16, false)?;
                (index, mapping, false)
            }
            None => {
                let index = self.create_active(bridge, None, UNAWARE_VID)?;
                let mut mapping = TableEntry::new(TableId::VlanMapping, index as u16);
                mapping.val[0] = 0;
                (index, mapping, true)
            }
        };

        mapping.val[1] |= port_bit(self.cpu_port) | port_bit(port);
        self.commit_mapping(&mapping, index, created)?;

        self.set_default_pvid(port, 0);
        Ok(index)
    }

    /// Adds a port to `vid` of a VLAN-aware bridge.
    ///
    /// New slots inherit the flow id of the bridge's existing slots so every
    /// VID of one bridge shares a MAC learning domain.
    #[instrument(skip(self), fields(%bridge))]
    pub fn add_aware(
        &mut self,
        bridge: BridgeId,
        port: u8,
        vid: u16,
        untagged: bool,
        pvid: bool,
    ) -> GswResult<usize> {
        self.check_port(port)?;

        let scan = self.slots.scan_bridge(bridge, vid);
        if scan.conflicting {
            warn!(
                "{} spans several flow ids, keeping {:?}",
                bridge, scan.fid
            );
        }

        let (index, mut mapping, created) = match scan.slot {
            Some(index) => {
                let mapping = self
                    .engine
                    .read_entry(TableId::VlanMapping, index as u16, false)?;
                (index, mapping, false)
            }
            None => {
                let index = self.create_active(bridge, scan.fid, vid)?;
                (index, TableEntry::new(TableId::VlanMapping, index as u16), true)
            }
        };

        let cpu = port_bit(self.cpu_port);
        let member = port_bit(port);
        mapping.val[0] = vid;
        mapping.val[1] |= cpu | member;
        mapping.val[2] |= cpu;
        if untagged {
            mapping.val[2] &= !member;
        } else {
            mapping.val[2] |= member;
        }
        self.commit_mapping(&mapping, index, created)?;

        if pvid {
            self.set_default_pvid(port, index);
        }
        Ok(index)
    }

    /// Removes a port from a bridge slot; frees the slot once only the CPU
    /// port is left. Returns true if the slot was freed.
    #[instrument(skip(self), fields(%bridge))]
    pub fn remove(
        &mut self,
        bridge: BridgeId,
        port: u8,
        vid: u16,
        pvid: bool,
        vlan_aware: bool,
    ) -> GswResult<bool> {
        self.check_port(port)?;

        let found = if vlan_aware {
            self.slots.find(bridge, vid)
        } else {
            self.slots.find_bridge(bridge)
        };
        let index = found.ok_or_else(|| {
            error!("{} has no VLAN slot for vid {}", bridge, vid);
            GswError::not_found(format!("VLAN slot for {} vid {}", bridge, vid))
        })?;

        let mut mapping = self
            .engine
            .read_entry(TableId::VlanMapping, index as u16, false)?;
        let member = port_bit(port);
        mapping.val[1] &= !member;
        mapping.val[2] &= !member;
        self.engine.write_entry(&mapping).map_err(|err| {
            error!("failed to write VLAN mapping {}: {}", index, err);
            err
        })?;

        let released = mapping.val[1] & !port_bit(self.cpu_port) == 0;
        if released {
            self.remove_active(index)?;
        }

        if pvid {
            self.set_default_pvid(port, 0);
        }
        Ok(released)
    }

    /// Checks that `(bridge, vid)` has or could get a slot. Claims nothing.
    pub fn prepare(&self, bridge: Option<BridgeId>, vid: u16) -> GswResult<()> {
        let existing = bridge.and_then(|bridge| self.slots.find(bridge, vid));
        existing
            .or_else(|| self.slots.first_free())
            .map(|_| ())
            .ok_or_else(|| {
                error!("no free VLAN slot for vid {}", vid);
                GswError::NoSpace
            })
    }
}
