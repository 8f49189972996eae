//! MAC bridge table operations.

use std::ops::ControlFlow;

use gsw_hal::regs::{table, LearnedPort};
use gsw_hal::RegisterBackend;
use tracing::{debug, error, instrument};

use super::types::{FdbDumpEntry, FdbEntryType, FdbRecord, MacAddress, MAC_BRIDGE_ENTRIES};
use crate::error::GswResult;
use crate::pce::{TableEngine, TableEntry, TableId};
use crate::port_bit;

/// View of the MAC bridge table through the transaction engine.
pub struct MacTable<'a, B> {
    engine: &'a TableEngine<B>,
}

fn decode(entry: &TableEntry) -> Option<FdbRecord> {
    if !entry.valid {
        return None;
    }
    let entry_type = if entry.val[1] & table::MAC_BRIDGE_STATIC != 0 {
        FdbEntryType::Static
    } else {
        FdbEntryType::Dynamic
    };
    let learned_port = match entry_type {
        FdbEntryType::Dynamic => Some(LearnedPort::decode(u32::from(entry.val[0])).get()),
        FdbEntryType::Static => None,
    };
    Some(FdbRecord {
        index: entry.index,
        mac: MacAddress::from_key_words(&entry.key),
        fid: entry.key[3],
        entry_type,
        port_map: entry.val[0],
        learned_port,
    })
}

impl<'a, B: RegisterBackend> MacTable<'a, B> {
    pub fn new(engine: &'a TableEngine<B>) -> Self {
        Self { engine }
    }

    /// Decoded row at `index`, `None` if the row is invalid.
    pub fn read_record(&self, index: u16) -> GswResult<Option<FdbRecord>> {
        let entry = self.engine.read_entry(TableId::MacBridge, index, false)?;
        Ok(decode(&entry))
    }

    /// Every valid row in index order.
    pub fn records(&self) -> GswResult<Vec<FdbRecord>> {
        let mut records = Vec::new();
        for index in 0..MAC_BRIDGE_ENTRIES {
            if let Some(record) = self.read_record(index)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Installs (`add`) or withdraws a static entry for `mac` in flow `fid`.
    #[instrument(skip(self), fields(%mac))]
    pub fn upsert(&self, port: u8, fid: u8, mac: MacAddress, add: bool) -> GswResult<()> {
        let mut entry = TableEntry::keyed(TableId::MacBridge).with_valid(add);
        entry.key[..3].copy_from_slice(&mac.to_key_words());
        entry.key[3] = u16::from(fid);
        entry.val[0] = if add { port_bit(port) } else { 0 };
        entry.val[1] = table::MAC_BRIDGE_STATIC;

        self.engine.write_entry(&entry).map_err(|err| {
            error!("failed to write MAC bridge entry for {}: {}", mac, err);
            err
        })
    }

    /// Reports every entry forwarding to `port` until the callback breaks.
    ///
    /// Static entries match on their port bitmap, dynamic ones on the
    /// learned port field. Returns the number of entries reported.
    pub fn dump<F>(&self, port: u8, mut callback: F) -> GswResult<usize>
    where
        F: FnMut(&FdbDumpEntry) -> ControlFlow<()>,
    {
        let mut reported = 0;
        for index in 0..MAC_BRIDGE_ENTRIES {
            let entry = self.engine.read_entry(TableId::MacBridge, index, false).map_err(|err| {
                error!("failed to read MAC bridge entry {}: {}", index, err);
                err
            })?;
            let Some(record) = decode(&entry) else {
                continue;
            };
            if !record.matches_port(port) {
                continue;
            }
            let dumped = FdbDumpEntry {
                mac: record.mac,
                vid: 0,
                is_static: record.is_static(),
            };
            reported += 1;
            if callback(&dumped).is_break() {
                debug!(reported, "FDB dump stopped by caller");
                break;
            }
        }
        Ok(reported)
    }

    /// Invalidates every dynamic entry learned on `port`.
    ///
    /// Static entries survive even when their port bitmap happens to encode
    /// `port` in the learned-port bits. Returns the number of entries aged.
    #[instrument(skip(self))]
    pub fn fast_age(&self, port: u8) -> GswResult<usize> {
        let mut aged = 0;
        for index in 0..MAC_BRIDGE_ENTRIES {
            let entry = self.engine.read_entry(TableId::MacBridge, index, false).map_err(|err| {
                error!("failed to read MAC bridge entry {}: {}", index, err);
                err
            })?;
            let Some(record) = decode(&entry) else {
                continue;
            };
            if record.is_static() || record.learned_port != Some(port) {
                continue;
            }
            self.engine.write_entry(&entry.with_valid(false))?;
            aged += 1;
        }
        debug!(aged, "fast age done");
        Ok(aged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GswError;
    use gsw_hal::{HwVariant, PollConfig};
    use gsw_sim::{learned_entry, mac_key, seed_mac_table, static_entry, test_mac, SimSwitch};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn setup() -> (SimSwitch, TableEngine<SimSwitch>) {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let engine = TableEngine::new(Arc::new(sim.clone()), PollConfig::TABLE);
        (sim, engine)
    }

    #[test]
    fn test_upsert_installs_static_entry() {
        let (sim, engine) = setup();
        let mac = MacAddress::new(test_mac(1));
        MacTable::new(&engine).upsert(2, 7, mac, true).unwrap();

        let row = sim.row(table::MAC_BRIDGE, 0);
        assert!(row.valid);
        assert_eq!(row.key, mac_key(test_mac(1), 7));
        assert_eq!(row.val[0], 0x0004);
        assert_eq!(row.val[1], table::MAC_BRIDGE_STATIC);

        MacTable::new(&engine).upsert(2, 7, mac, false).unwrap();
        assert!(!sim.row(table::MAC_BRIDGE, 0).valid);
    }

    #[test]
    fn test_read_record_decodes() {
        let (sim, engine) = setup();
        seed_mac_table(
            &sim,
            [
                (3, learned_entry(test_mac(1), 9, 4)),
                (4, static_entry(test_mac(2), 9, 0x0006)),
            ],
        );
        let table = MacTable::new(&engine);
        let learned = table.read_record(3).unwrap().unwrap();
        assert_eq!(learned.mac, MacAddress::new(test_mac(1)));
        assert_eq!(learned.fid, 9);
        assert_eq!(learned.learned_port, Some(4));
        let fixed = table.read_record(4).unwrap().unwrap();
        assert!(fixed.is_static());
        assert_eq!(fixed.port_map, 0x0006);
        assert!(table.read_record(5).unwrap().is_none());
        assert_eq!(table.records().unwrap().len(), 2);
    }

    #[test]
    fn test_dump_filters_by_port() {
        let (sim, engine) = setup();
        seed_mac_table(
            &sim,
            [
                (0, learned_entry(test_mac(1), 7, 2)),
                (1, learned_entry(test_mac(2), 7, 3)),
                (2, static_entry(test_mac(3), 7, 0x0004)),
                (3, static_entry(test_mac(4), 7, 0x0008)),
            ],
        );
        let mut seen = Vec::new();
        let count = MacTable::new(&engine)
            .dump(2, |entry| {
                seen.push(*entry);
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            seen,
            vec![
                FdbDumpEntry {
                    mac: MacAddress::new(test_mac(1)),
                    vid: 0,
                    is_static: false
                },
                FdbDumpEntry {
                    mac: MacAddress::new(test_mac(3)),
                    vid: 0,
                    is_static: true
                },
            ]
        );
    }

    #[test]
    fn test_dump_stops_on_break() {
        let (sim, engine) = setup();
        seed_mac_table(
            &sim,
            (0..4u8).map(|n| (u16::from(n), learned_entry(test_mac(n), 7, 1))),
        );
        let mut calls = 0;
        let count = MacTable::new(&engine)
            .dump(1, |_| {
                calls += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_fast_age_spares_static_entries() {
        let (sim, engine) = setup();
        seed_mac_table(
            &sim,
            [
                (0, learned_entry(test_mac(1), 7, 3)),
                (1, learned_entry(test_mac(2), 7, 1)),
                // Port bitmap 0x38 reads as learned port 3.
                (2, static_entry(test_mac(3), 7, 0x0038)),
                (9, learned_entry(test_mac(4), 8, 3)),
            ],
        );
        let aged = MacTable::new(&engine).fast_age(3).unwrap();
        assert_eq!(aged, 2);
        assert!(!sim.row(table::MAC_BRIDGE, 0).valid);
        assert!(sim.row(table::MAC_BRIDGE, 1).valid);
        assert!(sim.row(table::MAC_BRIDGE, 2).valid);
        assert!(!sim.row(table::MAC_BRIDGE, 9).valid);
    }

    #[test]
    fn test_fast_age_aborts_on_timeout() {
        let (sim, engine) = setup();
        seed_mac_table(&sim, [(100, learned_entry(test_mac(1), 7, 3))]);
        sim.stall_after(20);
        let err = MacTable::new(&engine).fast_age(3).unwrap_err();
        assert!(matches!(err, GswError::Timeout(_)));
        sim.clear_faults();
        assert!(sim.row(table::MAC_BRIDGE, 100).valid);
    }
}
