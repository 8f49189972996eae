//! Spanning-tree port states.

mod control;
mod types;

pub use control::apply_stp_state;
pub use types::StpState;
