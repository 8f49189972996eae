//! Register file and PCE table model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gsw_hal::regs::{
    self, table, MdioCtrl, OpMode, PceGctrl0, PceGctrl1, PceTblCtrl, SwRes, TableAddress,
};
use gsw_hal::{
    Generation, HalError, HalResult, HwVariant, PhyInterface, PollConfig, RegisterBackend,
    RegisterBlock,
};
use serde::Serialize;
use tracing::{debug, trace};

const KEY_WORDS: usize = 8;
const VAL_WORDS: usize = 5;

/// One PCE table row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimRow {
    pub key: [u16; KEY_WORDS],
    pub val: [u16; VAL_WORDS],
    pub mask: u16,
    pub valid: bool,
    pub entry_type: bool,
    pub gmap: u8,
}

/// A table transaction the model executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOp {
    pub table: TableAddress,
    pub index: u16,
    pub mode: OpMode,
}

#[derive(Debug)]
struct SimState {
    variant: HwVariant,
    version: u16,
    regs: HashMap<(RegisterBlock, u32), u32>,
    tables: HashMap<TableAddress, Vec<SimRow>>,
    phys: HashMap<(u8, u8), u16>,
    ops: Vec<TableOp>,
    /// Polls left before every poll times out; `None` when healthy.
    polls_until_stall: Option<usize>,
    flushes: usize,
    resets: usize,
}

fn table_len(table: TableAddress) -> usize {
    match table {
        table::MAC_BRIDGE => 2048,
        table::ACTIVE_VLAN | table::VLAN_MAPPING => 64,
        _ => 256,
    }
}

impl SimState {
    fn reg(&self, block: RegisterBlock, offset: u32) -> u32 {
        if block == RegisterBlock::Switch && offset == regs::switch::VERSION {
            return u32::from(self.version);
        }
        self.regs.get(&(block, offset)).copied().unwrap_or(0)
    }

    fn set(&mut self, block: RegisterBlock, offset: u32, value: u32) {
        self.regs.insert((block, offset), value);
    }

    fn rows(&mut self, table: TableAddress) -> &mut Vec<SimRow> {
        self.tables
            .entry(table)
            .or_insert_with(|| vec![SimRow::default(); table_len(table)])
    }

    fn row(&mut self, table: TableAddress, index: u16) -> SimRow {
        self.rows(table)
            .get(usize::from(index))
            .cloned()
            .unwrap_or_default()
    }

    fn store(&mut self, table: TableAddress, index: usize, row: SimRow) {
        let rows = self.rows(table);
        match rows.get_mut(index) {
            Some(slot) => *slot = row,
            None => debug!("table {:#04x} has no row {}", table.get(), index),
        }
    }

    fn find_key(&mut self, table: TableAddress, key: &[u16; KEY_WORDS]) -> Option<usize> {
        self.rows(table)
            .iter()
            .position(|row| row.valid && &row.key == key)
    }

    /// Entry currently staged in the key/value/mask registers.
    fn staged(&self, ctrl: u32) -> SimRow {
        let sw = RegisterBlock::Switch;
        let mut row = SimRow {
            mask: self.reg(sw, regs::switch::PCE_TBL_MASK) as u16,
            valid: ctrl & PceTblCtrl::VLD.bits() != 0,
            entry_type: ctrl & PceTblCtrl::TYPE.bits() != 0,
            gmap: regs::Gmap::decode(ctrl).get(),
            ..SimRow::default()
        };
        for (i, word) in row.key.iter_mut().enumerate() {
            *word = self.reg(sw, regs::switch::pce_tbl_key(i)) as u16;
        }
        for (i, word) in row.val.iter_mut().enumerate() {
            *word = self.reg(sw, regs::switch::pce_tbl_val(i)) as u16;
        }
        row
    }

    /// Copies a row into the access registers; returns the updated control word.
    fn load(&mut self, row: &SimRow, ctrl: u32) -> u32 {
        let sw = RegisterBlock::Switch;
        for (i, word) in row.key.iter().enumerate() {
            self.set(sw, regs::switch::pce_tbl_key(i), u32::from(*word));
        }
        for (i, word) in row.val.iter().enumerate() {
            self.set(sw, regs::switch::pce_tbl_val(i), u32::from(*word));
        }
        self.set(sw, regs::switch::PCE_TBL_MASK, u32::from(row.mask));

        let mut ctrl = ctrl & !(PceTblCtrl::TYPE | PceTblCtrl::VLD | PceTblCtrl::GMAP).bits();
        if row.valid {
            ctrl |= PceTblCtrl::VLD.bits();
        }
        if row.entry_type {
            ctrl |= PceTblCtrl::TYPE.bits();
        }
        ctrl | (u32::from(row.gmap) << regs::Gmap::SHIFT)
    }

    /// Runs the operation selected by a control word with BAS set.
    fn execute(&mut self, ctrl: u32) -> u32 {
        let table = TableAddress::decode(ctrl);
        let mode = OpMode::decode(ctrl);
        let index = self.reg(RegisterBlock::Switch, regs::switch::PCE_TBL_ADDR) as u16;
        self.ops.push(TableOp { table, index, mode });
        trace!(table = table.get(), index, ?mode, "table access");

        let ctrl = match mode {
            OpMode::AddressRead => {
                let row = self.row(table, index);
                self.load(&row, ctrl)
            }
            OpMode::AddressWrite => {
                let row = self.staged(ctrl);
                self.store(table, usize::from(index), row);
                ctrl
            }
            OpMode::KeyRead => {
                let staged = self.staged(ctrl);
                match self.find_key(table, &staged.key) {
                    Some(found) => {
                        let row = self.row(table, found as u16);
                        self.set(RegisterBlock::Switch, regs::switch::PCE_TBL_ADDR, found as u32);
                        self.load(&row, ctrl)
                    }
                    None => {
                        let miss = SimRow {
                            key: staged.key,
                            ..SimRow::default()
                        };
                        self.load(&miss, ctrl)
                    }
                }
            }
            OpMode::KeyWrite => {
                let row = self.staged(ctrl);
                let target = match self.find_key(table, &row.key) {
                    Some(found) => Some(found),
                    None if row.valid => self.rows(table).iter().position(|r| !r.valid),
                    None => None,
                };
                if let Some(target) = target {
                    self.store(table, target, row);
                }
                ctrl
            }
        };
        ctrl & !PceTblCtrl::BAS.bits()
    }

    fn flush_dynamic(&mut self) {
        self.flushes += 1;
        for row in self.rows(table::MAC_BRIDGE).iter_mut() {
            if row.valid && row.val[1] & table::MAC_BRIDGE_STATIC == 0 {
                *row = SimRow::default();
            }
        }
    }

    fn mdio_command(&mut self, ctrl: u32) {
        let phy = ((ctrl & MdioCtrl::PHYAD.bits()) >> 5) as u8;
        let reg = (ctrl & MdioCtrl::REGAD.bits()) as u8;
        if ctrl & MdioCtrl::RD.bits() != 0 {
            let value = self.phys.get(&(phy, reg)).copied().unwrap_or(0);
            self.set(RegisterBlock::Mdio, regs::mdio::READ, u32::from(value));
        } else if ctrl & MdioCtrl::WR.bits() != 0 {
            let value = self.reg(RegisterBlock::Mdio, regs::mdio::WRITE) as u16;
            self.phys.insert((phy, reg), value);
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.regs.clear();
        self.tables.clear();
        self.load_defaults();
    }

    /// Non-zero power-on register values.
    fn load_defaults(&mut self) {
        self.set(
            RegisterBlock::Switch,
            regs::switch::PCE_GCTRL_1,
            PceGctrl1::MAC_LRN_MOD.bits(),
        );
    }
}

/// Shared handle to a simulated switch.
///
/// Clones refer to the same register file, so a test can hand one clone to
/// the driver and inspect the hardware through another.
#[derive(Debug, Clone)]
pub struct SimSwitch {
    state: Arc<Mutex<SimState>>,
}

impl SimSwitch {
    pub fn new(variant: HwVariant) -> Self {
        let generation = match variant {
            HwVariant::Xrx200 => Generation::Gswip21,
            HwVariant::Xrx300 => Generation::Gswip22,
            HwVariant::Gsw1xx => Generation::Gswip23,
        };
        Self::with_version(variant, generation.raw())
    }

    /// Model reporting an arbitrary `VERSION` register value.
    pub fn with_version(variant: HwVariant, version: u16) -> Self {
        let mut state = SimState {
            variant,
            version,
            regs: HashMap::new(),
            tables: HashMap::new(),
            phys: HashMap::new(),
            ops: Vec::new(),
            polls_until_stall: None,
            flushes: 0,
            resets: 0,
        };
        state.load_defaults();
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn variant(&self) -> HwVariant {
        self.state().variant
    }

    pub fn reg(&self, block: RegisterBlock, offset: u32) -> u32 {
        self.state().reg(block, offset)
    }

    /// Writes a register without triggering any side effect.
    pub fn poke(&self, block: RegisterBlock, offset: u32, value: u32) {
        self.state().set(block, offset, value);
    }

    pub fn row(&self, table: TableAddress, index: u16) -> SimRow {
        self.state().row(table, index)
    }

    pub fn set_row(&self, table: TableAddress, index: u16, row: SimRow) {
        self.state().store(table, usize::from(index), row);
    }

    pub fn table(&self, table: TableAddress) -> Vec<SimRow> {
        self.state().rows(table).clone()
    }

    pub fn table_ops(&self) -> Vec<TableOp> {
        self.state().ops.clone()
    }

    pub fn op_count(&self) -> usize {
        self.state().ops.len()
    }

    pub fn flush_count(&self) -> usize {
        self.state().flushes
    }

    pub fn reset_count(&self) -> usize {
        self.state().resets
    }

    pub fn phy_reg(&self, phy: u8, reg: u8) -> u16 {
        self.state().phys.get(&(phy, reg)).copied().unwrap_or(0)
    }

    pub fn set_phy_reg(&self, phy: u8, reg: u8, value: u16) {
        self.state().phys.insert((phy, reg), value);
    }

    /// Lets `polls` more polls succeed, then reports every busy bit as stuck.
    pub fn stall_after(&self, polls: usize) {
        self.state().polls_until_stall = Some(polls);
    }

    /// Reports every busy bit as stuck from now on.
    pub fn stall(&self) {
        self.stall_after(0);
    }

    pub fn clear_faults(&self) {
        self.state().polls_until_stall = None;
    }
}

impl RegisterBackend for SimSwitch {
    fn read(&self, block: RegisterBlock, offset: u32) -> u32 {
        self.state().reg(block, offset)
    }

    fn write(&self, block: RegisterBlock, offset: u32, value: u32) {
        let mut state = self.state();
        let value = match (block, offset) {
            (RegisterBlock::Switch, regs::switch::SWRES) => {
                if value & SwRes::R0.bits() != 0 {
                    state.reset();
                }
                value
            }
            (RegisterBlock::Switch, regs::switch::PCE_TBL_CTRL)
                if value & PceTblCtrl::BAS.bits() != 0 =>
            {
                state.execute(value)
            }
            (RegisterBlock::Switch, regs::switch::PCE_GCTRL_0)
                if value & PceGctrl0::MTFL.bits() != 0 =>
            {
                state.flush_dynamic();
                value & !PceGctrl0::MTFL.bits()
            }
            (RegisterBlock::Mdio, regs::mdio::CTRL) if value & MdioCtrl::BUSY.bits() != 0 => {
                state.mdio_command(value);
                value & !MdioCtrl::BUSY.bits()
            }
            _ => value,
        };
        state.set(block, offset, value);
    }

    fn poll_until_cleared(
        &self,
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        poll: &PollConfig,
    ) -> HalResult<()> {
        let mut state = self.state();
        let stalled = match state.polls_until_stall {
            Some(0) => true,
            Some(left) => {
                state.polls_until_stall = Some(left - 1);
                false
            }
            None => false,
        };
        if stalled || state.reg(block, offset) & mask != 0 {
            return Err(HalError::Timeout {
                block,
                offset,
                mask,
                waited: poll.timeout,
            });
        }
        Ok(())
    }

    fn supports_interface(&self, port: u8, interface: PhyInterface) -> bool {
        self.state().variant.supports_interface(port, interface)
    }
}
