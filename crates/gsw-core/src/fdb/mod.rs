//! Forwarding database on the MAC bridge table.
//!
//! Rows are keyed by MAC address and flow id. Static rows carry a port
//! bitmap in `val[0]`; dynamic rows learned by hardware carry the source
//! port in `val[0][7:4]`. The hardware has no notion of VID here, so dumps
//! always report VID 0.

mod manager;
mod types;

pub use manager::MacTable;
pub use types::{FdbDumpEntry, FdbEntryType, FdbRecord, MacAddress, MAC_BRIDGE_ENTRIES};
