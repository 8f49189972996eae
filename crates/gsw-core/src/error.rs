//! Error types for switch operations.

use gsw_hal::HalError;
use thiserror::Error;

/// Result type for switch operations
pub type GswResult<T> = Result<T, GswError>;

/// Errors reported by the switch layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GswError {
    /// A table access or flush did not complete in time.
    #[error("hardware timeout: {0}")]
    Timeout(HalError),

    /// All shared VLAN slots are in use.
    #[error("no free VLAN table slot")]
    NoSpace,

    /// Lookup found nothing.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Bad port index, bad config value or invalid argument.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The port has no bridge or the bridge has no flow id.
    #[error("port {port} is not part of a bridge")]
    NotInBridge { port: u8 },

    /// Request the hardware or the current port mode cannot honour.
    #[error("not supported: {message}")]
    NotSupported { message: String },

    /// Other register access failure.
    #[error(transparent)]
    Hal(HalError),
}

impl From<HalError> for GswError {
    fn from(err: HalError) -> Self {
        if err.is_timeout() {
            GswError::Timeout(err)
        } else {
            GswError::Hal(err)
        }
    }
}

impl GswError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GswError::NotFound { what: what.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        GswError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        GswError::NotSupported {
            message: message.into(),
        }
    }

    /// Timeouts may succeed on a later attempt; nothing else will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GswError::Timeout(_))
    }
}
