//! Packet classification engine table access.
//!
//! All PCE tables share one set of access registers: eight key words, five
//! value words, a mask, an address and a control register whose BAS bit
//! starts an operation and reads back as busy until it completes.

mod engine;
mod types;

pub use engine::{EngineStats, TableEngine};
pub use types::{TableEntry, TableId, KEY_WORDS, VAL_WORDS};
