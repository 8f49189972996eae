//! PCE table types.

use std::fmt;

use gsw_hal::regs::{table, Gmap, TableAddress};

/// Key words per table entry.
pub const KEY_WORDS: usize = 8;
/// Value words per table entry.
pub const VAL_WORDS: usize = 5;

/// Tables of the packet classification engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    /// VID to flow id.
    ActiveVlan,
    /// Member and tag port maps per slot.
    VlanMapping,
    /// MAC forwarding entries.
    MacBridge,
    /// Any other table by raw selector.
    Raw(TableAddress),
}

impl TableId {
    pub fn address(self) -> TableAddress {
        match self {
            TableId::ActiveVlan => table::ACTIVE_VLAN,
            TableId::VlanMapping => table::VLAN_MAPPING,
            TableId::MacBridge => table::MAC_BRIDGE,
            TableId::Raw(address) => address,
        }
    }

    pub fn from_address(address: TableAddress) -> Self {
        match address {
            table::ACTIVE_VLAN => TableId::ActiveVlan,
            table::VLAN_MAPPING => TableId::VlanMapping,
            table::MAC_BRIDGE => TableId::MacBridge,
            other => TableId::Raw(other),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::ActiveVlan => f.write_str("active-vlan"),
            TableId::VlanMapping => f.write_str("vlan-mapping"),
            TableId::MacBridge => f.write_str("mac-bridge"),
            TableId::Raw(address) => write!(f, "table-{:#04x}", address.get()),
        }
    }
}

/// One table row as seen through the access registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub table: TableId,
    /// Row index; for key-addressed writes the hardware picks the row.
    pub index: u16,
    pub key: [u16; KEY_WORDS],
    pub val: [u16; VAL_WORDS],
    pub mask: u16,
    pub gmap: Gmap,
    pub entry_type: bool,
    pub valid: bool,
    /// Look up / place the row by key instead of by index.
    pub key_addressed: bool,
}

impl TableEntry {
    /// Zeroed, invalid row addressed by index.
    pub fn new(table: TableId, index: u16) -> Self {
        Self {
            table,
            index,
            key: [0; KEY_WORDS],
            val: [0; VAL_WORDS],
            mask: 0,
            gmap: Gmap::default(),
            entry_type: false,
            valid: false,
            key_addressed: false,
        }
    }

    /// Zeroed, invalid row addressed by key.
    pub fn keyed(table: TableId) -> Self {
        Self {
            key_addressed: true,
            ..Self::new(table, 0)
        }
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_round_trip_and_display() {
        for id in [TableId::ActiveVlan, TableId::VlanMapping, TableId::MacBridge] {
            assert_eq!(TableId::from_address(id.address()), id);
        }
        let raw = TableId::from_address(TableAddress::new(0x0e).unwrap());
        assert_eq!(raw, TableId::Raw(TableAddress::new(0x0e).unwrap()));
        assert_eq!(raw.to_string(), "table-0x0e");
        assert_eq!(TableId::MacBridge.to_string(), "mac-bridge");
    }

    #[test]
    fn test_entry_constructors() {
        let entry = TableEntry::new(TableId::ActiveVlan, 7).with_valid(true);
        assert_eq!(entry.index, 7);
        assert!(entry.valid);
        assert!(!entry.key_addressed);

        let keyed = TableEntry::keyed(TableId::MacBridge);
        assert!(keyed.key_addressed);
        assert!(!keyed.valid);
        assert_eq!(keyed.val, [0; VAL_WORDS]);
    }
}
