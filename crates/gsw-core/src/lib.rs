//! GSWIP switch core.
//!
//! This crate maps the host bridging model onto the switch's single shared
//! PCE table memory:
//!
//! - [`TableEngine`]: serialized, polled read/write transactions on the
//!   indirect PCE tables
//! - [`DomainAllocator`]: emulates independent bridges and VLANs on the
//!   64-entry active VLAN / VLAN mapping tables
//! - [`MacTable`]: static FDB entries, dumps and fast ageing on the MAC
//!   bridge table
//! - [`GswSwitch`]: the port, bridge, VLAN, STP and FDB operations a host
//!   switch framework calls
//!
//! # Example
//!
//! ```ignore
//! use gsw_core::{BridgeId, GswSwitch, SwitchConfig};
//!
//! let switch = GswSwitch::attach(backend, SwitchConfig::new(HwVariant::Xrx200))?;
//! switch.setup()?;
//! switch.port_enable(1, None)?;
//! switch.port_bridge_join(1, BridgeId(1), false)?;
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod fdb;
pub mod mdio;
pub mod pce;
pub mod port;
pub mod setup;
pub mod stp;
mod switch;
pub mod version;

pub use bridge::{BridgeId, DomainAllocator, SlotTable, VlanSlot};
pub use config::{PollSettings, SwitchConfig};
pub use error::{GswError, GswResult};
pub use fdb::{FdbDumpEntry, FdbRecord, MacAddress, MacTable};
pub use pce::{TableEngine, TableEntry, TableId};
pub use setup::ConfigStatus;
pub use stp::StpState;
pub use switch::{GswStats, GswSwitch, PortBinding, SlotSnapshot, SlotView};
pub use version::SwitchVersion;

/// Port bitmap bit for `port`; zero for ports past the 16-bit maps.
pub(crate) fn port_bit(port: u8) -> u16 {
    1u16.checked_shl(u32::from(port)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_bit() {
        assert_eq!(port_bit(0), 0x0001);
        assert_eq!(port_bit(6), 0x0040);
        assert_eq!(port_bit(15), 0x8000);
        assert_eq!(port_bit(16), 0);
    }
}
