//! GSWIP register map.
//!
//! Offsets are register numbers, not byte addresses. Single-bit controls are
//! [`bitflags`] types; multi-bit fields get a checked newtype so a value that
//! does not fit is rejected instead of silently truncated.

use bitflags::bitflags;

use crate::error::{HalError, HalResult};

macro_rules! bit_field {
    ($(#[$meta:meta])* $name:ident: $repr:ty, width = $width:expr, shift = $shift:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name($repr);

        impl $name {
            pub const MAX: $repr = ((1u32 << $width) - 1) as $repr;
            pub const MASK: u32 = ((1u32 << $width) - 1) << $shift;
            pub const SHIFT: u32 = $shift;

            /// Rejects values wider than the field.
            pub fn new(value: $repr) -> HalResult<Self> {
                if value > Self::MAX {
                    return Err(HalError::InvalidField {
                        field: stringify!($name),
                        value: u32::from(value),
                        max: u32::from(Self::MAX),
                    });
                }
                Ok(Self(value))
            }

            pub const fn get(self) -> $repr {
                self.0
            }

            /// Field value positioned within its register.
            pub const fn encode(self) -> u32 {
                (self.0 as u32) << $shift
            }

            /// Extracts the field from a raw register value.
            pub const fn decode(register: u32) -> Self {
                Self(((register & Self::MASK) >> $shift) as $repr)
            }
        }
    };
}

bit_field! {
    /// PCE table selector in `PCE_TBL_CTRL[4:0]`.
    TableAddress: u8, width = 5, shift = 0
}

bit_field! {
    /// Group map in `PCE_TBL_CTRL[10:7]`.
    Gmap: u8, width = 4, shift = 7
}

bit_field! {
    /// Port state in `PCE_PCTRL_0[2:0]`.
    PortState: u8, width = 3, shift = 0
}

bit_field! {
    /// PHY address in `MDIO_PHYp[4:0]` and `MDIO_CTRL[9:5]`.
    PhyAddress: u8, width = 5, shift = 0
}

bit_field! {
    /// PHY register number in `MDIO_CTRL[4:0]`.
    PhyRegister: u8, width = 5, shift = 0
}

bit_field! {
    /// MDC clock divider in `MDC_CFG1[7:0]`.
    MdcDivider: u16, width = 8, shift = 0
}

bit_field! {
    /// Learned source port in MAC bridge `val[0][7:4]`.
    LearnedPort: u8, width = 4, shift = 4
}

impl PortState {
    pub const LISTEN: PortState = PortState(0x0);
    pub const RX: PortState = PortState(0x1);
    pub const TX: PortState = PortState(0x2);
    pub const LEARNING: PortState = PortState(0x3);
    pub const FORWARDING: PortState = PortState(0x7);
}

impl PhyAddress {
    /// Position of the address inside `MDIO_CTRL`.
    pub const fn encode_ctrl(self) -> u32 {
        (self.0 as u32) << 5
    }
}

/// PCE table identifiers.
pub mod table {
    use super::TableAddress;

    /// Parser microcode.
    pub const PARSER: TableAddress = TableAddress(0x00);
    pub const ACTIVE_VLAN: TableAddress = TableAddress(0x01);
    pub const VLAN_MAPPING: TableAddress = TableAddress(0x02);
    pub const MAC_BRIDGE: TableAddress = TableAddress(0x0b);

    /// `val[1]` flag marking a MAC bridge entry as static.
    pub const MAC_BRIDGE_STATIC: u16 = 0x01;
    /// `val[0]` bits holding the learned port of a dynamic entry.
    pub const MAC_BRIDGE_PORT_MASK: u16 = 0xf0;
}

/// PCE table operation mode, `PCE_TBL_CTRL[6:5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpMode {
    /// Address-based read.
    AddressRead,
    /// Address-based write.
    AddressWrite,
    /// Key-based read.
    KeyRead,
    /// Key-based write.
    KeyWrite,
}

impl OpMode {
    pub const fn for_access(write: bool, key_addressed: bool) -> Self {
        match (write, key_addressed) {
            (false, false) => OpMode::AddressRead,
            (true, false) => OpMode::AddressWrite,
            (false, true) => OpMode::KeyRead,
            (true, true) => OpMode::KeyWrite,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            OpMode::AddressRead => 0x00,
            OpMode::AddressWrite => 0x20,
            OpMode::KeyRead => 0x40,
            OpMode::KeyWrite => 0x60,
        }
    }

    pub const fn decode(register: u32) -> Self {
        match register & PceTblCtrl::OPMOD.bits() {
            0x00 => OpMode::AddressRead,
            0x20 => OpMode::AddressWrite,
            0x40 => OpMode::KeyRead,
            _ => OpMode::KeyWrite,
        }
    }
}

bitflags! {
    /// `SWRES` software reset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SwRes: u32 {
        /// Register reset.
        const R0 = 1 << 0;
        /// Hardware reset.
        const R1 = 1 << 1;
    }
}

bitflags! {
    /// `PCE_TBL_CTRL` table access control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PceTblCtrl: u32 {
        /// Access busy / start.
        const BAS = 1 << 15;
        const TYPE = 1 << 13;
        const VLD = 1 << 12;
        const KEYFORM = 1 << 11;
        const GMAP = 0xf << 7;
        const OPMOD = 0x3 << 5;
        const ADDR = 0x1f;
    }
}

bitflags! {
    /// `PCE_GCTRL_0` global control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PceGctrl0: u32 {
        /// MAC table flush, self-clearing.
        const MTFL = 1 << 0;
        /// Parser microcode valid.
        const MC_VALID = 1 << 3;
        /// VLAN-aware switching.
        const VLAN = 1 << 14;
    }
}

bitflags! {
    /// `PCE_GCTRL_1` global control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PceGctrl1: u32 {
        const MAC_LRN_MOD = 1 << 0;
        const MAC_GLOCK = 1 << 2;
        const MAC_GLOCK_MOD = 1 << 3;
        /// Transparent VLAN mode (GSWIP 2.2 and later).
        const VLANMD = 1 << 9;
    }
}

bitflags! {
    /// `PCE_PCTRL_0` per-port classification control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PcePctrl0: u32 {
        const PSTATE = 0x7;
        /// Transparent VLAN mode.
        const TVM = 1 << 5;
        const VREP = 1 << 6;
        /// Accept special tag on ingress.
        const INGRESS = 1 << 11;
    }
}

bitflags! {
    /// `PCE_VCTRL` per-port VLAN control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PceVctrl: u32 {
        /// Unknown VLAN rule.
        const UVR = 1 << 0;
        /// Ingress member violation rule.
        const VIMR = 1 << 3;
        /// Egress member violation rule.
        const VEMR = 1 << 4;
        /// VLAN security rule.
        const VSR = 1 << 5;
        const VID0 = 1 << 6;
    }
}

bitflags! {
    /// `BM_PCFG` buffer manager port configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BmPcfg: u32 {
        /// RMON counters enable.
        const CNTEN = 1 << 0;
    }
}

bitflags! {
    /// `BM_QUEUE_GCTRL` queue global control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BmQueueGctrl: u32 {
        /// Global buffer mode.
        const GL_MOD = 1 << 10;
    }
}

bitflags! {
    /// `MAC_CTRL_2` per-port MAC control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MacCtrl2: u32 {
        /// Accept frames up to `MAC_FLEN`.
        const MLEN = 1 << 3;
    }
}

bitflags! {
    /// `FDMA_PCTRL` per-port egress DMA control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FdmaPctrl: u32 {
        const EN = 1 << 0;
        /// Insert special tag on egress.
        const STEN = 1 << 1;
        const VLANMOD_MASK = 0x3 << 3;
        const VLANMOD_BOTH = 0x3 << 3;
    }
}

bitflags! {
    /// `SDMA_PCTRL` per-port ingress DMA control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SdmaPctrl: u32 {
        const EN = 1 << 0;
        const FCEN = 1 << 1;
        const PAUFWD = 1 << 3;
    }
}

bitflags! {
    /// `MDIO_GLOB` MDIO master global control.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MdioGlob: u32 {
        const ENABLE = 1 << 15;
    }
}

bitflags! {
    /// `MDIO_CTRL` MDIO master command register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MdioCtrl: u32 {
        const BUSY = 1 << 12;
        const RD = 1 << 11;
        const WR = 1 << 10;
        const PHYAD = 0x1f << 5;
        const REGAD = 0x1f;
    }
}

bitflags! {
    /// `MII_CFGp` per-port xMII configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MiiCfg: u32 {
        const RESET = 1 << 15;
        const EN = 1 << 14;
        const ISOLATE = 1 << 13;
        const LDCLKDIS = 1 << 12;
        const RGMII_IBS = 1 << 8;
        const RMII_CLK = 1 << 7;
        const MODE_MASK = 0xf;
    }
}

/// Switch core block offsets.
pub mod switch {
    pub const SWRES: u32 = 0x000;
    pub const VERSION: u32 = 0x013;
    pub const VERSION_REV_MASK: u32 = 0x00ff;
    pub const VERSION_MOD_MASK: u32 = 0xff00;
    pub const VERSION_MOD_SHIFT: u32 = 8;
    pub const BM_QUEUE_GCTRL: u32 = 0x04a;
    pub const PCE_TBL_MASK: u32 = 0x448;
    pub const PCE_TBL_ADDR: u32 = 0x44e;
    pub const PCE_TBL_CTRL: u32 = 0x44f;
    pub const PCE_PMAP1: u32 = 0x453;
    /// Multicast flood port map.
    pub const PCE_PMAP2: u32 = 0x454;
    /// Unknown unicast flood port map.
    pub const PCE_PMAP3: u32 = 0x455;
    pub const PCE_GCTRL_0: u32 = 0x456;
    pub const PCE_GCTRL_1: u32 = 0x457;
    pub const MAC_FLEN: u32 = 0x8c5;

    pub const fn bm_pcfg(port: u8) -> u32 {
        0x080 + (port as u32) * 2
    }

    /// Key word `x`, counted downwards from 0x447.
    pub const fn pce_tbl_key(word: usize) -> u32 {
        0x447 - word as u32
    }

    /// Value word `x`, counted downwards from 0x44d.
    pub const fn pce_tbl_val(word: usize) -> u32 {
        0x44d - word as u32
    }

    pub const fn pce_pctrl_0(port: u8) -> u32 {
        0x480 + (port as u32) * 0xa
    }

    pub const fn pce_vctrl(port: u8) -> u32 {
        0x485 + (port as u32) * 0xa
    }

    pub const fn pce_defpvid(port: u8) -> u32 {
        0x486 + (port as u32) * 0xa
    }

    pub const fn mac_ctrl_2(port: u8) -> u32 {
        0x905 + (port as u32) * 0xc
    }

    pub const fn fdma_pctrl(port: u8) -> u32 {
        0xa80 + (port as u32) * 0x6
    }

    pub const fn sdma_pctrl(port: u8) -> u32 {
        0xbc0 + (port as u32) * 0x6
    }
}

/// MDIO master block offsets.
pub mod mdio {
    pub const GLOB: u32 = 0x00;
    pub const CTRL: u32 = 0x08;
    pub const READ: u32 = 0x09;
    pub const WRITE: u32 = 0x0a;
    pub const MDC_CFG0: u32 = 0x0b;
    pub const MDC_CFG1: u32 = 0x0c;

    /// Per-port PHY address for link polling.
    pub const fn phy(port: u8) -> u32 {
        0x15 - port as u32
    }
}

/// xMII block offsets.
pub mod mii {
    pub const PCDU0: u32 = 0x01;
    pub const PCDU1: u32 = 0x03;
    pub const PCDU5: u32 = 0x05;

    pub const fn cfg(port: u8) -> u32 {
        (port as u32) * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_rejects_overflow() {
        assert!(Gmap::new(0xf).is_ok());
        let err = Gmap::new(0x10).unwrap_err();
        assert_eq!(
            err,
            HalError::InvalidField {
                field: "Gmap",
                value: 0x10,
                max: 0xf
            }
        );
        assert!(TableAddress::new(0x20).is_err());
        assert!(PortState::new(0x8).is_err());
    }

    #[test]
    fn test_field_encode_decode() {
        let gmap = Gmap::new(0x5).unwrap();
        assert_eq!(gmap.encode(), 0x5 << 7);
        assert_eq!(Gmap::decode(0x8000 | (0x5 << 7) | 0x0b), gmap);
        assert_eq!(PceTblCtrl::GMAP.bits(), Gmap::MASK);

        assert_eq!(LearnedPort::decode(0x0035).get(), 3);
        assert_eq!(table::MAC_BRIDGE.encode(), 0x0b);
    }

    #[test]
    fn test_opmode_bits() {
        assert_eq!(OpMode::for_access(false, false).bits(), 0x00);
        assert_eq!(OpMode::for_access(true, false).bits(), 0x20);
        assert_eq!(OpMode::for_access(false, true).bits(), 0x40);
        assert_eq!(OpMode::for_access(true, true).bits(), 0x60);
        assert_eq!(OpMode::decode(0x8000 | 0x60 | 0x0b), OpMode::KeyWrite);
        assert_eq!(PceTblCtrl::OPMOD.bits(), 0x60);
    }

    #[test]
    fn test_register_offsets() {
        assert_eq!(switch::pce_tbl_key(0), 0x447);
        assert_eq!(switch::pce_tbl_key(7), 0x440);
        assert_eq!(switch::pce_tbl_val(0), 0x44d);
        assert_eq!(switch::pce_tbl_val(4), 0x449);
        assert_eq!(switch::pce_pctrl_0(6), 0x4bc);
        assert_eq!(switch::pce_vctrl(1), 0x48f);
        assert_eq!(switch::pce_defpvid(2), 0x49a);
        assert_eq!(switch::bm_pcfg(3), 0x086);
        assert_eq!(switch::mac_ctrl_2(6), 0x94d);
        assert_eq!(switch::fdma_pctrl(6), 0xaa4);
        assert_eq!(switch::sdma_pctrl(1), 0xbc6);
        assert_eq!(mdio::phy(5), 0x10);
        assert_eq!(mii::cfg(5), 0x0a);
    }

    #[test]
    fn test_port_state_constants() {
        assert_eq!(PortState::FORWARDING.encode(), 0x7);
        assert_eq!(PortState::LEARNING.get(), 0x3);
        assert_eq!(PortState::LISTEN.get(), 0x0);
        assert_eq!(PcePctrl0::PSTATE.bits(), PortState::MASK);
    }

    #[test]
    fn test_phy_address_ctrl_position() {
        let addr = PhyAddress::new(0x11).unwrap();
        assert_eq!(addr.encode_ctrl(), 0x11 << 5);
        assert_eq!(addr.encode_ctrl() & !MdioCtrl::PHYAD.bits(), 0);
    }
}
