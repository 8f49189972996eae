//! Switch IP version probe.

use std::fmt;

use gsw_hal::regs::switch;
use gsw_hal::{Generation, HwVariant, RegisterBackend, RegisterBlock};
use serde::Serialize;
use tracing::{error, info};

use crate::error::{GswError, GswResult};

/// Decoded `VERSION` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchVersion {
    pub raw: u16,
    pub generation: Generation,
}

impl SwitchVersion {
    /// Reads `VERSION` and checks it against the configured variant.
    ///
    /// An unknown revision is `NotFound`; a revision from another family is
    /// `InvalidConfig`.
    pub fn probe<B: RegisterBackend + ?Sized>(backend: &B, variant: HwVariant) -> GswResult<Self> {
        let raw = (backend.read(RegisterBlock::Switch, switch::VERSION) & 0xffff) as u16;
        let generation = Generation::from_raw(raw).ok_or_else(|| {
            error!("unknown GSWIP version: {:#05x}", raw);
            GswError::not_found(format!("GSWIP version {:#05x}", raw))
        })?;
        if !variant.accepts(generation) {
            error!("{} does not belong to {}", generation, variant);
            return Err(GswError::invalid_config(format!(
                "{} reported by a {} switch",
                generation, variant
            )));
        }
        let version = SwitchVersion { raw, generation };
        info!("probed {} (rev {}, mod {})", generation, version.revision(), version.module());
        Ok(version)
    }

    pub fn revision(&self) -> u8 {
        (u32::from(self.raw) & switch::VERSION_REV_MASK) as u8
    }

    pub fn module(&self) -> u8 {
        ((u32::from(self.raw) & switch::VERSION_MOD_MASK) >> switch::VERSION_MOD_SHIFT) as u8
    }
}

impl fmt::Display for SwitchVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#05x})", self.generation, self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsw_sim::SimSwitch;

    #[test]
    fn test_probe_accepts_family() {
        let sim = SimSwitch::new(HwVariant::Xrx300);
        let version = SwitchVersion::probe(&sim, HwVariant::Xrx300).unwrap();
        assert_eq!(version.generation, Generation::Gswip22);
        assert_eq!(version.revision(), 0x22);
        assert_eq!(version.module(), 0x01);
        assert_eq!(version.to_string(), "GSWIP 2.2 (0x122)");
    }

    #[test]
    fn test_probe_rejects_unknown_version() {
        let sim = SimSwitch::with_version(HwVariant::Xrx200, 0x0042);
        let err = SwitchVersion::probe(&sim, HwVariant::Xrx200).unwrap_err();
        assert!(matches!(err, GswError::NotFound { .. }));
    }

    #[test]
    fn test_probe_rejects_other_family() {
        let sim = SimSwitch::new(HwVariant::Gsw1xx);
        let err = SwitchVersion::probe(&sim, HwVariant::Xrx200).unwrap_err();
        assert!(matches!(err, GswError::InvalidConfig { .. }));
    }
}
