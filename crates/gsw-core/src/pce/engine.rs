//! Serialized access to the PCE table registers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gsw_hal::regs::{switch, table, Gmap, OpMode, PceGctrl0, PceTblCtrl};
use gsw_hal::{PollConfig, RegisterBackend, RegisterBlock};
use serde::Serialize;
use tracing::{debug, error, instrument};

use super::types::{TableEntry, TableId};
use crate::error::{GswError, GswResult};

const SW: RegisterBlock = RegisterBlock::Switch;

/// Counters kept by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub transactions: u64,
    pub timeouts: u64,
}

/// Table transaction engine.
///
/// The access registers are one shared window, so every read or write runs
/// start to finish under a single lock. The lock is released on every exit
/// path, including timeouts.
pub struct TableEngine<B> {
    backend: Arc<B>,
    poll: PollConfig,
    lock: Mutex<()>,
    transactions: AtomicU64,
    timeouts: AtomicU64,
}

impl<B: RegisterBackend> TableEngine<B> {
    pub fn new(backend: Arc<B>, poll: PollConfig) -> Self {
        Self {
            backend,
            poll,
            lock: Mutex::new(()),
            transactions: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            transactions: self.transactions.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle(&self) -> GswResult<()> {
        self.backend
            .poll_until_cleared(SW, switch::PCE_TBL_CTRL, PceTblCtrl::BAS.bits(), &self.poll)
            .map_err(|err| {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                error!("PCE table access stuck: {}", err);
                GswError::from(err)
            })
    }

    fn select(&self, entry: &TableEntry, write: bool) -> u32 {
        entry.table.address().encode() | OpMode::for_access(write, entry.key_addressed).bits()
    }

    /// Reads the row at `index`, or by key when `key_addressed` is set.
    pub fn read_entry(&self, table: TableId, index: u16, key_addressed: bool) -> GswResult<TableEntry> {
        let mut entry = TableEntry::new(table, index);
        entry.key_addressed = key_addressed;
        self.read_into(&mut entry)?;
        Ok(entry)
    }

    /// Looks up the row whose key matches `entry.key` and fills in the rest.
    pub fn read_keyed(&self, entry: &mut TableEntry) -> GswResult<()> {
        entry.key_addressed = true;
        self.read_into(entry)
    }

    fn read_into(&self, entry: &mut TableEntry) -> GswResult<()> {
        let b = &*self.backend;
        let _guard = self.lock();
        self.transactions.fetch_add(1, Ordering::Relaxed);

        self.wait_idle()?;
        b.write(SW, switch::PCE_TBL_ADDR, u32::from(entry.index));
        if entry.key_addressed {
            for (i, word) in entry.key.iter().enumerate() {
                b.write(SW, switch::pce_tbl_key(i), u32::from(*word));
            }
        }
        b.modify(
            SW,
            switch::PCE_TBL_CTRL,
            (PceTblCtrl::ADDR | PceTblCtrl::OPMOD).bits(),
            self.select(entry, false) | PceTblCtrl::BAS.bits(),
        );
        self.wait_idle()?;

        for (i, word) in entry.key.iter_mut().enumerate() {
            *word = b.read(SW, switch::pce_tbl_key(i)) as u16;
        }
        for (i, word) in entry.val.iter_mut().enumerate() {
            *word = b.read(SW, switch::pce_tbl_val(i)) as u16;
        }
        entry.mask = b.read(SW, switch::PCE_TBL_MASK) as u16;
        let ctrl = b.read(SW, switch::PCE_TBL_CTRL);
        entry.entry_type = ctrl & PceTblCtrl::TYPE.bits() != 0;
        entry.valid = ctrl & PceTblCtrl::VLD.bits() != 0;
        entry.gmap = Gmap::decode(ctrl);
        if entry.key_addressed {
            entry.index = b.read(SW, switch::PCE_TBL_ADDR) as u16;
        }
        Ok(())
    }

    /// Writes a row. Returns once the hardware has committed it.
    pub fn write_entry(&self, entry: &TableEntry) -> GswResult<()> {
        let b = &*self.backend;
        {
            let _guard = self.lock();
            self.transactions.fetch_add(1, Ordering::Relaxed);

            self.wait_idle()?;
            b.write(SW, switch::PCE_TBL_ADDR, u32::from(entry.index));
            let select = self.select(entry, true);
            let field_mask = (PceTblCtrl::ADDR | PceTblCtrl::OPMOD).bits();
            b.modify(SW, switch::PCE_TBL_CTRL, field_mask, select);

            for (i, word) in entry.key.iter().enumerate() {
                b.write(SW, switch::pce_tbl_key(i), u32::from(*word));
            }
            for (i, word) in entry.val.iter().enumerate() {
                b.write(SW, switch::pce_tbl_val(i), u32::from(*word));
            }

            b.modify(SW, switch::PCE_TBL_CTRL, field_mask, select);
            b.write(SW, switch::PCE_TBL_MASK, u32::from(entry.mask));

            let mut ctrl = b.read(SW, switch::PCE_TBL_CTRL);
            ctrl &= !(PceTblCtrl::TYPE | PceTblCtrl::VLD | PceTblCtrl::GMAP).bits();
            if entry.entry_type {
                ctrl |= PceTblCtrl::TYPE.bits();
            }
            if entry.valid {
                ctrl |= PceTblCtrl::VLD.bits();
            }
            ctrl |= entry.gmap.encode() | PceTblCtrl::BAS.bits();
            b.write(SW, switch::PCE_TBL_CTRL, ctrl);
        }
        self.wait_idle()
    }

    /// Programs the parser microcode and marks it valid.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn load_microcode(&self, rows: &[[u16; 4]]) -> GswResult<()> {
        let b = &*self.backend;
        let _guard = self.lock();

        b.modify(
            SW,
            switch::PCE_TBL_CTRL,
            (PceTblCtrl::ADDR | PceTblCtrl::OPMOD).bits(),
            table::PARSER.encode() | OpMode::AddressWrite.bits(),
        );
        b.write(SW, switch::PCE_TBL_MASK, 0);

        for (index, row) in rows.iter().enumerate() {
            self.transactions.fetch_add(1, Ordering::Relaxed);
            b.write(SW, switch::PCE_TBL_ADDR, index as u32);
            for (word, value) in row.iter().enumerate() {
                b.write(SW, switch::pce_tbl_val(word), u32::from(*value));
            }
            b.modify(SW, switch::PCE_TBL_CTRL, 0, PceTblCtrl::BAS.bits());
            self.wait_idle()?;
        }

        b.modify(SW, switch::PCE_GCTRL_0, 0, PceGctrl0::MC_VALID.bits());
        debug!("parser microcode loaded");
        Ok(())
    }
}
