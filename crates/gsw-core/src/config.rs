//! Switch configuration.

use std::time::Duration;

use gsw_hal::{HwVariant, PollConfig};
use serde::{Deserialize, Serialize};

use crate::error::{GswError, GswResult};

/// Busy-bit poll settings for table access and MAC table flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_us: u64,
    pub timeout_us: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_us: 20,
            timeout_us: 50_000,
        }
    }
}

impl PollSettings {
    pub fn to_poll_config(self) -> PollConfig {
        PollConfig::new(
            Duration::from_micros(self.interval_us),
            Duration::from_micros(self.timeout_us),
        )
    }
}

/// Configuration for one switch instance.
///
/// ```yaml
/// variant: xrx200
/// poll:
///   interval_us: 20
///   timeout_us: 50000
/// flood_unknown: true
/// mdio_clock_div: 9
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub variant: HwVariant,
    /// Overrides the variant's port count.
    #[serde(default)]
    pub max_ports: Option<u8>,
    /// Overrides the variant's CPU port.
    #[serde(default)]
    pub cpu_port: Option<u8>,
    #[serde(default)]
    pub poll: PollSettings,
    /// Flood unknown multicast and unicast to all ports.
    #[serde(default = "default_flood_unknown")]
    pub flood_unknown: bool,
    /// Forces the transparent VLAN mode bit; detected from the version when unset.
    #[serde(default)]
    pub vlan_mode_gsw22: Option<bool>,
    /// MDC divider for the PHY management clock.
    #[serde(default = "default_mdio_clock_div")]
    pub mdio_clock_div: u16,
}

fn default_flood_unknown() -> bool {
    true
}

fn default_mdio_clock_div() -> u16 {
    9
}

impl SwitchConfig {
    pub fn new(variant: HwVariant) -> Self {
        Self {
            variant,
            max_ports: None,
            cpu_port: None,
            poll: PollSettings::default(),
            flood_unknown: default_flood_unknown(),
            vlan_mode_gsw22: None,
            mdio_clock_div: default_mdio_clock_div(),
        }
    }

    pub fn from_yaml(text: &str) -> GswResult<Self> {
        let config: SwitchConfig = serde_yaml::from_str(text)
            .map_err(|e| GswError::invalid_config(format!("malformed switch config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn max_ports(&self) -> u8 {
        self.max_ports
            .unwrap_or_else(|| self.variant.default_max_ports())
    }

    pub fn cpu_port(&self) -> u8 {
        self.cpu_port
            .unwrap_or_else(|| self.variant.default_cpu_port())
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll.to_poll_config()
    }

    /// Bitmap with one bit per switch port.
    pub fn all_ports_mask(&self) -> u16 {
        ((1u32 << self.max_ports()) - 1) as u16
    }

    /// Checks the port layout and poll settings.
    ///
    /// Port `p` owns reserved VLAN slot `p + 1` and the shared pool starts at
    /// `max_ports`, so the CPU port must be the highest port.
    pub fn validate(&self) -> GswResult<()> {
        let max_ports = self.max_ports();
        if !(2..=16).contains(&max_ports) {
            return Err(GswError::invalid_config(format!(
                "max_ports must be between 2 and 16, got {}",
                max_ports
            )));
        }
        let cpu_port = self.cpu_port();
        if u16::from(cpu_port) + 1 != u16::from(max_ports) {
            return Err(GswError::invalid_config(format!(
                "cpu_port must be the last port ({}), got {}",
                max_ports - 1,
                cpu_port
            )));
        }
        if self.poll.interval_us == 0 || self.poll.timeout_us < self.poll.interval_us {
            return Err(GswError::invalid_config(format!(
                "poll interval {}us and timeout {}us are inconsistent",
                self.poll.interval_us, self.poll.timeout_us
            )));
        }
        if self.mdio_clock_div > 0xff {
            return Err(GswError::invalid_config(format!(
                "mdio_clock_div {} does not fit 8 bits",
                self.mdio_clock_div
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_follow_variant() {
        let config = SwitchConfig::new(HwVariant::Xrx200);
        assert_eq!(config.max_ports(), 7);
        assert_eq!(config.cpu_port(), 6);
        assert_eq!(config.all_ports_mask(), 0x7f);
        assert!(config.flood_unknown);
        assert_eq!(config.poll_config(), PollConfig::TABLE);
        assert!(config.validate().is_ok());

        let gsw = SwitchConfig::new(HwVariant::Gsw1xx);
        assert_eq!(gsw.cpu_port(), 5);
        assert_eq!(gsw.all_ports_mask(), 0x3f);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
variant: xrx300
poll:
  timeout_us: 10000
flood_unknown: false
vlan_mode_gsw22: true
"#;
        let config = SwitchConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.variant, HwVariant::Xrx300);
        assert_eq!(config.poll.interval_us, 20);
        assert_eq!(config.poll.timeout_us, 10_000);
        assert!(!config.flood_unknown);
        assert_eq!(config.vlan_mode_gsw22, Some(true));
        assert_eq!(config.mdio_clock_div, 9);
    }

    #[test]
    fn test_from_yaml_rejects_unknown_variant() {
        let err = SwitchConfig::from_yaml("variant: rtl8365\n").unwrap_err();
        assert!(matches!(err, GswError::InvalidConfig { .. }));
    }

    #[test]
    fn test_validate_cpu_port_position() {
        let mut config = SwitchConfig::new(HwVariant::Xrx200);
        config.cpu_port = Some(0);
        assert!(config.validate().is_err());

        config.cpu_port = Some(4);
        config.max_ports = Some(5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_poll_and_clock() {
        let mut config = SwitchConfig::new(HwVariant::Xrx200);
        config.poll.interval_us = 0;
        assert!(config.validate().is_err());

        let mut config = SwitchConfig::new(HwVariant::Xrx200);
        config.mdio_clock_div = 0x100;
        assert!(config.validate().is_err());
    }
}
