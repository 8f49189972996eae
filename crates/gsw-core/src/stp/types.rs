//! STP types.

use std::fmt;

use gsw_hal::regs::PortState;
use serde::{Deserialize, Serialize};

/// STP port state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum StpState {
    Disabled = 0,
    Blocking = 1,
    Listening = 2,
    Learning = 3,
    Forwarding = 4,
}

impl StpState {
    /// Parses an STP state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "0" | "disabled" => Some(Self::Disabled),
            "1" | "blocking" => Some(Self::Blocking),
            "2" | "listening" => Some(Self::Listening),
            "3" | "learning" => Some(Self::Learning),
            "4" | "forwarding" => Some(Self::Forwarding),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Blocking => "blocking",
            Self::Listening => "listening",
            Self::Learning => "learning",
            Self::Forwarding => "forwarding",
        }
    }

    /// Hardware port state; `None` for a disabled port, which is handled by
    /// turning ingress DMA off instead.
    pub fn to_port_state(self) -> Option<PortState> {
        match self {
            Self::Disabled => None,
            Self::Blocking | Self::Listening => Some(PortState::LISTEN),
            Self::Learning => Some(PortState::LEARNING),
            Self::Forwarding => Some(PortState::FORWARDING),
        }
    }
}

impl fmt::Display for StpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
