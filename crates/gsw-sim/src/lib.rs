//! Simulated GSWIP switch for tests and dry runs.
//!
//! Provides:
//! - A register backend whose PCE tables execute the table-access protocol
//! - Self-clearing busy, flush and MDIO command bits
//! - Fault injection for stuck busy bits
//! - Fixtures for seeding learned and static MAC entries
//! - Verification helpers for VLAN slots and register bits

pub mod fixtures;
mod switch;
mod verification;

pub use fixtures::*;
pub use switch::{SimRow, SimSwitch, TableOp};
pub use verification::*;
