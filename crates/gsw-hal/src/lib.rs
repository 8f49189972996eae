//! Hardware access layer for GSWIP switch fabrics.
//!
//! This crate knows the register map of the Lantiq / Intel / MaxLinear
//! GSWIP family and nothing about bridges or VLANs. It provides:
//!
//! - [`regs`]: register offsets, bit definitions and typed multi-bit fields
//! - [`RegisterBackend`]: the capability used to touch the three register
//!   blocks (switch core, MDIO master, xMII)
//! - [`MmioBackend`]: memory-mapped access for SoC-integrated switches
//! - [`MdioBackend`]: windowed access over an MDIO bus for external chips
//! - [`HwVariant`]: per-family constants and interface predicates

pub mod backend;
pub mod error;
pub mod mdio;
pub mod mmio;
pub mod regs;
pub mod variant;

pub use backend::{poll_bounded, PollConfig, RegisterBackend, RegisterBlock};
pub use error::{HalError, HalResult};
pub use mdio::{MdioBackend, MdioBus};
pub use mmio::{MmioBackend, MmioWindow};
pub use variant::{Generation, HwVariant, PhyInterface};
