//! Bridge to forwarding-domain translation.
//!
//! Each standalone port `p` owns active VLAN slot `p + 1` (flow id `p + 1`,
//! members {p, CPU}). Bridges share the pool `[max_ports, 64)`: an unaware
//! bridge gets one slot with VID 0, an aware bridge one slot per VID, and
//! all slots of a bridge carry the same flow id so MAC learning is shared.

mod domains;
mod types;

pub use domains::DomainAllocator;
pub use types::{BridgeId, BridgeScan, SlotTable, VlanSlot, VLAN_TABLE_SIZE};
