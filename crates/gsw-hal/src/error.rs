//! Error types for register access.

use std::time::Duration;

use thiserror::Error;

use crate::backend::RegisterBlock;

/// Result alias for hardware access.
pub type HalResult<T> = Result<T, HalError>;

/// Errors raised while talking to switch registers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// A busy bit did not clear within the poll budget.
    #[error("timed out after {waited:?} waiting for {block}:{offset:#05x} & {mask:#06x} to clear")]
    Timeout {
        /// Register block that was polled.
        block: RegisterBlock,
        /// Register offset within the block.
        offset: u32,
        /// Bits that were expected to clear.
        mask: u32,
        /// Time spent polling.
        waited: Duration,
    },

    /// The backend has no mapping for this register.
    #[error("register {block}:{offset:#05x} is not reachable through this backend")]
    Unmapped {
        /// Register block.
        block: RegisterBlock,
        /// Register offset within the block.
        offset: u32,
    },

    /// A value does not fit in the hardware field it targets.
    #[error("value {value:#x} does not fit field {field} (max {max:#x})")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: u32,
        /// Largest encodable value.
        max: u32,
    },
}

impl HalError {
    /// Returns true if the error is a poll timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HalError::Timeout { .. })
    }
}
