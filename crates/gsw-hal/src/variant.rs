//! Silicon variants and their per-port capabilities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// GSWIP-based switch families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwVariant {
    /// xRX200 SoC (VR9), GSWIP 2.0 / 2.1.
    Xrx200,
    /// xRX300 / xRX330 SoC (AR10, GRX390), GSWIP 2.2.
    Xrx300,
    /// External GSW1xx chips (GSW140, GSW141, GSW145), GSWIP 2.3.
    Gsw1xx,
}

impl HwVariant {
    pub const ALL: [HwVariant; 3] = [HwVariant::Xrx200, HwVariant::Xrx300, HwVariant::Gsw1xx];

    pub fn as_str(&self) -> &'static str {
        match self {
            HwVariant::Xrx200 => "xrx200",
            HwVariant::Xrx300 => "xrx300",
            HwVariant::Gsw1xx => "gsw1xx",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xrx200" | "vr9" => Some(HwVariant::Xrx200),
            "xrx300" | "xrx330" | "ar10" | "grx390" => Some(HwVariant::Xrx300),
            "gsw1xx" | "gsw140" | "gsw141" | "gsw145" => Some(HwVariant::Gsw1xx),
            _ => None,
        }
    }

    /// Device-tree compatible strings handled by this variant.
    pub fn compatible(&self) -> &'static [&'static str] {
        match self {
            HwVariant::Xrx200 => &["lantiq,xrx200-gswip"],
            HwVariant::Xrx300 => &["lantiq,xrx300-gswip", "lantiq,xrx330-gswip"],
            HwVariant::Gsw1xx => &["maxlinear,gsw140", "maxlinear,gsw141", "maxlinear,gsw145"],
        }
    }

    pub fn default_max_ports(&self) -> u8 {
        match self {
            HwVariant::Xrx200 | HwVariant::Xrx300 => 7,
            HwVariant::Gsw1xx => 6,
        }
    }

    pub fn default_cpu_port(&self) -> u8 {
        match self {
            HwVariant::Xrx200 | HwVariant::Xrx300 => 6,
            HwVariant::Gsw1xx => 5,
        }
    }

    /// Whether a hardware revision belongs to this family.
    pub fn accepts(&self, generation: Generation) -> bool {
        match self {
            HwVariant::Xrx200 => matches!(generation, Generation::Gswip20 | Generation::Gswip21),
            HwVariant::Xrx300 => {
                matches!(generation, Generation::Gswip22 | Generation::Gswip22Etc)
            }
            HwVariant::Gsw1xx => generation == Generation::Gswip23,
        }
    }

    /// Per-port xMII wiring options.
    pub fn supports_interface(&self, port: u8, interface: PhyInterface) -> bool {
        use PhyInterface::*;

        let rgmii = interface.is_rgmii();
        match (self, port) {
            (HwVariant::Xrx200, 0 | 1) => rgmii || matches!(interface, Mii | RevMii | Rmii),
            (HwVariant::Xrx200, 2..=4) => interface == Internal,
            (HwVariant::Xrx200, 5) => rgmii || interface == Internal,

            (HwVariant::Xrx300, 0) => rgmii || matches!(interface, Gmii | Rmii),
            (HwVariant::Xrx300, 1..=4) => interface == Internal,
            (HwVariant::Xrx300, 5) => rgmii || matches!(interface, Internal | Rmii),

            (HwVariant::Gsw1xx, 0..=3) => interface == Internal,
            (HwVariant::Gsw1xx, 4) => interface == Sgmii,
            (HwVariant::Gsw1xx, 5) => rgmii,

            _ => false,
        }
    }
}

impl fmt::Display for HwVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switch IP revision as reported by the `VERSION` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Generation {
    Gswip20,
    Gswip21,
    Gswip22,
    Gswip22Etc,
    Gswip23,
}

impl Generation {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0x100 => Some(Generation::Gswip20),
            0x021 => Some(Generation::Gswip21),
            0x122 => Some(Generation::Gswip22),
            0x022 => Some(Generation::Gswip22Etc),
            0x023 => Some(Generation::Gswip23),
            _ => None,
        }
    }

    pub fn raw(&self) -> u16 {
        match self {
            Generation::Gswip20 => 0x100,
            Generation::Gswip21 => 0x021,
            Generation::Gswip22 => 0x122,
            Generation::Gswip22Etc => 0x022,
            Generation::Gswip23 => 0x023,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Gswip20 => "2.0",
            Generation::Gswip21 => "2.1",
            Generation::Gswip22 => "2.2",
            Generation::Gswip22Etc => "2.2 ETC",
            Generation::Gswip23 => "2.3",
        }
    }

    /// 2.2 and later support the transparent VLAN mode bit.
    pub fn has_vlan_mode(&self) -> bool {
        matches!(
            self,
            Generation::Gswip22 | Generation::Gswip22Etc | Generation::Gswip23
        )
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GSWIP {}", self.as_str())
    }
}

/// xMII interface modes a port can be wired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhyInterface {
    Internal,
    Mii,
    RevMii,
    Rmii,
    Gmii,
    Rgmii,
    RgmiiId,
    RgmiiRxid,
    RgmiiTxid,
    Sgmii,
}

impl PhyInterface {
    pub fn is_rgmii(&self) -> bool {
        matches!(
            self,
            PhyInterface::Rgmii
                | PhyInterface::RgmiiId
                | PhyInterface::RgmiiRxid
                | PhyInterface::RgmiiTxid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhyInterface::Internal => "internal",
            PhyInterface::Mii => "mii",
            PhyInterface::RevMii => "rev-mii",
            PhyInterface::Rmii => "rmii",
            PhyInterface::Gmii => "gmii",
            PhyInterface::Rgmii => "rgmii",
            PhyInterface::RgmiiId => "rgmii-id",
            PhyInterface::RgmiiRxid => "rgmii-rxid",
            PhyInterface::RgmiiTxid => "rgmii-txid",
            PhyInterface::Sgmii => "sgmii",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            PhyInterface::Internal,
            PhyInterface::Mii,
            PhyInterface::RevMii,
            PhyInterface::Rmii,
            PhyInterface::Gmii,
            PhyInterface::Rgmii,
            PhyInterface::RgmiiId,
            PhyInterface::RgmiiRxid,
            PhyInterface::RgmiiTxid,
            PhyInterface::Sgmii,
        ];
        let lower = s.to_ascii_lowercase();
        all.into_iter().find(|i| i.as_str() == lower)
    }
}

impl fmt::Display for PhyInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parse() {
        assert_eq!(HwVariant::parse("xrx200"), Some(HwVariant::Xrx200));
        assert_eq!(HwVariant::parse("XRX330"), Some(HwVariant::Xrx300));
        assert_eq!(HwVariant::parse("gsw145"), Some(HwVariant::Gsw1xx));
        assert_eq!(HwVariant::parse("rtl8366"), None);
        for variant in HwVariant::ALL {
            assert_eq!(HwVariant::parse(variant.as_str()), Some(variant));
        }
    }

    #[test]
    fn test_port_layout() {
        assert_eq!(HwVariant::Xrx200.default_max_ports(), 7);
        assert_eq!(HwVariant::Xrx300.default_cpu_port(), 6);
        assert_eq!(HwVariant::Gsw1xx.default_max_ports(), 6);
        assert_eq!(HwVariant::Gsw1xx.default_cpu_port(), 5);
    }

    #[test]
    fn test_generation_acceptance() {
        assert!(HwVariant::Xrx200.accepts(Generation::Gswip20));
        assert!(HwVariant::Xrx200.accepts(Generation::Gswip21));
        assert!(!HwVariant::Xrx200.accepts(Generation::Gswip22));
        assert!(HwVariant::Xrx300.accepts(Generation::Gswip22Etc));
        assert!(!HwVariant::Xrx300.accepts(Generation::Gswip23));
        assert!(HwVariant::Gsw1xx.accepts(Generation::Gswip23));
        assert_eq!(Generation::from_raw(0x0122), Some(Generation::Gswip22));
        assert_eq!(Generation::from_raw(0x0999), None);
        assert!(!Generation::Gswip21.has_vlan_mode());
        assert!(Generation::Gswip22Etc.has_vlan_mode());
    }

    #[test]
    fn test_xrx200_interfaces() {
        let v = HwVariant::Xrx200;
        assert!(v.supports_interface(0, PhyInterface::RevMii));
        assert!(v.supports_interface(1, PhyInterface::RgmiiTxid));
        assert!(!v.supports_interface(1, PhyInterface::Gmii));
        assert!(v.supports_interface(3, PhyInterface::Internal));
        assert!(!v.supports_interface(3, PhyInterface::Rgmii));
        assert!(v.supports_interface(5, PhyInterface::Internal));
        assert!(!v.supports_interface(5, PhyInterface::Rmii));
        assert!(!v.supports_interface(9, PhyInterface::Internal));
    }

    #[test]
    fn test_xrx300_and_gsw1xx_interfaces() {
        assert!(HwVariant::Xrx300.supports_interface(0, PhyInterface::Gmii));
        assert!(!HwVariant::Xrx300.supports_interface(0, PhyInterface::Mii));
        assert!(HwVariant::Xrx300.supports_interface(5, PhyInterface::Rmii));
        assert!(HwVariant::Gsw1xx.supports_interface(2, PhyInterface::Internal));
        assert!(HwVariant::Gsw1xx.supports_interface(4, PhyInterface::Sgmii));
        assert!(!HwVariant::Gsw1xx.supports_interface(4, PhyInterface::Rgmii));
        assert!(HwVariant::Gsw1xx.supports_interface(5, PhyInterface::RgmiiId));
    }

    #[test]
    fn test_interface_parse() {
        assert_eq!(PhyInterface::parse("rgmii-id"), Some(PhyInterface::RgmiiId));
        assert_eq!(PhyInterface::parse("SGMII"), Some(PhyInterface::Sgmii));
        assert_eq!(PhyInterface::parse("xaui"), None);
        assert!(PhyInterface::RgmiiRxid.is_rgmii());
        assert!(!PhyInterface::Rmii.is_rgmii());
    }
}
