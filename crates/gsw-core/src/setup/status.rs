//! Global configuration health check.

use std::fmt;

use gsw_hal::regs::{switch, PceGctrl1};
use gsw_hal::{RegisterBackend, RegisterBlock};
use serde::Serialize;

/// What `PCE_GCTRL_1` says about the switch's configuration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigStatus {
    /// Setup has run: VLAN mode and learning mode are both set.
    Ok,
    /// Registers are back at their reset defaults.
    Reset,
    /// Reads return all ones; the management interface is wedged.
    Lockup,
    Unknown,
}

impl ConfigStatus {
    pub fn classify(gctrl_1: u32) -> Self {
        let configured = (PceGctrl1::VLANMD | PceGctrl1::MAC_LRN_MOD).bits();
        match gctrl_1 {
            u32::MAX => ConfigStatus::Lockup,
            value if value == configured => ConfigStatus::Ok,
            value if value == PceGctrl1::MAC_LRN_MOD.bits() => ConfigStatus::Reset,
            _ => ConfigStatus::Unknown,
        }
    }

    pub fn read<B: RegisterBackend + ?Sized>(backend: &B) -> Self {
        Self::classify(backend.read(RegisterBlock::Switch, switch::PCE_GCTRL_1))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigStatus::Ok => "ok",
            ConfigStatus::Reset => "reset",
            ConfigStatus::Lockup => "lockup",
            ConfigStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ConfigStatus::classify(0x0201), ConfigStatus::Ok);
        assert_eq!(ConfigStatus::classify(0x0001), ConfigStatus::Reset);
        assert_eq!(ConfigStatus::classify(0xffff_ffff), ConfigStatus::Lockup);
        assert_eq!(ConfigStatus::classify(0x0000), ConfigStatus::Unknown);
        assert_eq!(ConfigStatus::classify(0x0200), ConfigStatus::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConfigStatus::Lockup.to_string(), "lockup");
    }
}
