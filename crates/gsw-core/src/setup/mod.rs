//! Attach-time switch initialization and the parser microcode it loads.

pub mod microcode;
mod sequencer;
mod status;

pub use microcode::{DEFAULT_MICROCODE, MICROCODE_ROWS};
pub use sequencer::{Sequencer, MAX_FRAME_LEN};
pub use status::ConfigStatus;
