//! Test fixtures for PCE table contents.

use gsw_hal::regs::{table, LearnedPort};

use crate::switch::{SimRow, SimSwitch};

/// Packs a MAC address and flow id into MAC bridge key words.
pub fn mac_key(mac: [u8; 6], fid: u8) -> [u16; 8] {
    let word = |hi: u8, lo: u8| (u16::from(hi) << 8) | u16::from(lo);
    let mut key = [0u16; 8];
    key[0] = word(mac[4], mac[5]);
    key[1] = word(mac[2], mac[3]);
    key[2] = word(mac[0], mac[1]);
    key[3] = u16::from(fid);
    key
}

/// A dynamically learned entry pointing at `port`.
pub fn learned_entry(mac: [u8; 6], fid: u8, port: u8) -> SimRow {
    let mut row = SimRow {
        key: mac_key(mac, fid),
        valid: true,
        ..SimRow::default()
    };
    row.val[0] = (u16::from(port) << LearnedPort::SHIFT) & table::MAC_BRIDGE_PORT_MASK;
    row
}

/// A static entry forwarding to every port in `portmap`.
pub fn static_entry(mac: [u8; 6], fid: u8, portmap: u16) -> SimRow {
    let mut row = SimRow {
        key: mac_key(mac, fid),
        valid: true,
        ..SimRow::default()
    };
    row.val[0] = portmap;
    row.val[1] = table::MAC_BRIDGE_STATIC;
    row
}

/// Installs MAC bridge rows at fixed indices.
pub fn seed_mac_table<I>(sim: &SimSwitch, rows: I)
where
    I: IntoIterator<Item = (u16, SimRow)>,
{
    for (index, row) in rows {
        sim.set_row(table::MAC_BRIDGE, index, row);
    }
}

/// Locally administered test addresses, `02:00:00:00:00:nn`.
pub fn test_mac(n: u8) -> [u8; 6] {
    [0x02, 0x00, 0x00, 0x00, 0x00, n]
}
