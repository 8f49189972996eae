//! Per-port DMA, VLAN filter and xMII register control.

use gsw_hal::regs::{
    mdio, mii, switch, BmPcfg, FdmaPctrl, MacCtrl2, MiiCfg, PcePctrl0, PceVctrl, PhyAddress,
    SdmaPctrl,
};
use gsw_hal::{RegisterBackend, RegisterBlock};
use tracing::debug;

const SW: RegisterBlock = RegisterBlock::Switch;

/// Register-level port operations.
///
/// Table state (the single-port domain) is the caller's business; this
/// only touches per-port control registers.
pub struct PortControl<'a, B: ?Sized> {
    backend: &'a B,
    cpu_port: u8,
}

impl<'a, B: RegisterBackend + ?Sized> PortControl<'a, B> {
    pub fn new(backend: &'a B, cpu_port: u8) -> Self {
        Self { backend, cpu_port }
    }

    fn is_cpu(&self, port: u8) -> bool {
        port == self.cpu_port
    }

    /// Turns on RMON counters and both DMA directions. User ports also get
    /// their PHY address programmed for link polling.
    pub fn enable(&self, port: u8, phy: Option<PhyAddress>) {
        let b = self.backend;
        b.write(SW, switch::bm_pcfg(port), BmPcfg::CNTEN.bits());
        b.modify(
            SW,
            switch::fdma_pctrl(port),
            0,
            (FdmaPctrl::EN | FdmaPctrl::VLANMOD_BOTH).bits(),
        );
        b.modify(SW, switch::sdma_pctrl(port), 0, SdmaPctrl::EN.bits());

        if !self.is_cpu(port) {
            let addr = phy.map(PhyAddress::encode).unwrap_or(0);
            b.modify(RegisterBlock::Mdio, mdio::phy(port), PhyAddress::MASK, addr);
        }
        debug!(port, "port DMA enabled");
    }

    /// Clears both DMA enables. The CPU port is never disabled.
    pub fn disable(&self, port: u8) {
        if self.is_cpu(port) {
            return;
        }
        self.backend
            .modify(SW, switch::fdma_pctrl(port), FdmaPctrl::EN.bits(), 0);
        self.backend
            .modify(SW, switch::sdma_pctrl(port), SdmaPctrl::EN.bits(), 0);
        debug!(port, "port DMA disabled");
    }

    /// Filtering on drops unknown and non-member VLANs; off classifies all
    /// ingress traffic into the port-based VLAN.
    pub fn set_vlan_filtering(&self, port: u8, enabled: bool) {
        let rules = (PceVctrl::UVR | PceVctrl::VIMR | PceVctrl::VEMR).bits();
        let security = PceVctrl::VSR.bits();
        let tvm = PcePctrl0::TVM.bits();
        let b = self.backend;

        if enabled {
            b.modify(SW, switch::pce_vctrl(port), security, rules);
            b.modify(SW, switch::pce_pctrl_0(port), tvm, 0);
        } else {
            b.modify(SW, switch::pce_vctrl(port), rules, security);
            b.modify(SW, switch::pce_pctrl_0(port), 0, tvm);
        }
        debug!(port, enabled, "VLAN filtering set");
    }

    /// Read-modify-write of `MII_CFG(port)`; the CPU port has no such
    /// register and is skipped.
    pub fn mii_modify(&self, port: u8, clear: MiiCfg, set: MiiCfg) {
        if self.is_cpu(port) {
            return;
        }
        self.backend
            .modify(RegisterBlock::Mii, mii::cfg(port), clear.bits(), set.bits());
    }

    /// Enables special tag handling and jumbo length on the CPU port.
    pub fn configure_cpu_port(&self) {
        let b = self.backend;
        let cpu = self.cpu_port;
        b.modify(SW, switch::fdma_pctrl(cpu), 0, FdmaPctrl::STEN.bits());
        b.modify(SW, switch::pce_pctrl_0(cpu), 0, PcePctrl0::INGRESS.bits());
        b.modify(SW, switch::mac_ctrl_2(cpu), 0, MacCtrl2::MLEN.bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsw_hal::HwVariant;
    use gsw_sim::{SimSwitch, TableVerifier};

    const CPU: u8 = 6;

    #[test]
    fn test_enable_user_port() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let phy = PhyAddress::new(0x11).unwrap();
        PortControl::new(&sim, CPU).enable(2, Some(phy));

        let verifier = TableVerifier::new(&sim);
        verifier
            .assert_bits_set(SW, switch::bm_pcfg(2), BmPcfg::CNTEN.bits())
            .unwrap();
        verifier
            .assert_bits_set(
                SW,
                switch::fdma_pctrl(2),
                (FdmaPctrl::EN | FdmaPctrl::VLANMOD_BOTH).bits(),
            )
            .unwrap();
        verifier
            .assert_bits_set(SW, switch::sdma_pctrl(2), SdmaPctrl::EN.bits())
            .unwrap();
        assert_eq!(sim.reg(RegisterBlock::Mdio, mdio::phy(2)) & 0x1f, 0x11);
    }

    #[test]
    fn test_enable_cpu_port_skips_phy() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        sim.poke(RegisterBlock::Mdio, mdio::phy(CPU), 0x1f);
        PortControl::new(&sim, CPU).enable(CPU, None);
        assert_eq!(sim.reg(RegisterBlock::Mdio, mdio::phy(CPU)), 0x1f);
        assert_ne!(sim.reg(SW, switch::sdma_pctrl(CPU)) & SdmaPctrl::EN.bits(), 0);
    }

    #[test]
    fn test_disable_leaves_cpu_port() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let ports = PortControl::new(&sim, CPU);
        ports.enable(1, None);
        ports.enable(CPU, None);
        ports.disable(1);
        ports.disable(CPU);

        let verifier = TableVerifier::new(&sim);
        verifier
            .assert_bits_clear(SW, switch::fdma_pctrl(1), FdmaPctrl::EN.bits())
            .unwrap();
        verifier
            .assert_bits_clear(SW, switch::sdma_pctrl(1), SdmaPctrl::EN.bits())
            .unwrap();
        verifier
            .assert_bits_set(SW, switch::sdma_pctrl(CPU), SdmaPctrl::EN.bits())
            .unwrap();
    }

    #[test]
    fn test_vlan_filtering_toggles_rules() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let ports = PortControl::new(&sim, CPU);
        let verifier = TableVerifier::new(&sim);
        let rules = (PceVctrl::UVR | PceVctrl::VIMR | PceVctrl::VEMR).bits();
        let all = rules | PceVctrl::VSR.bits();

        ports.set_vlan_filtering(3, true);
        verifier
            .assert_bits(SW, switch::pce_vctrl(3), all, rules)
            .unwrap();
        verifier
            .assert_bits_clear(SW, switch::pce_pctrl_0(3), PcePctrl0::TVM.bits())
            .unwrap();

        ports.set_vlan_filtering(3, false);
        verifier
            .assert_bits(SW, switch::pce_vctrl(3), all, PceVctrl::VSR.bits())
            .unwrap();
        verifier
            .assert_bits_set(SW, switch::pce_pctrl_0(3), PcePctrl0::TVM.bits())
            .unwrap();
    }

    #[test]
    fn test_mii_modify_skips_cpu_port() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let all = (MiiCfg::EN | MiiCfg::ISOLATE).bits();
        sim.poke(RegisterBlock::Mii, mii::cfg(0), all | 0x1);
        sim.poke(RegisterBlock::Mii, mii::cfg(CPU), all);

        let ports = PortControl::new(&sim, CPU);
        ports.mii_modify(0, MiiCfg::EN | MiiCfg::ISOLATE, MiiCfg::empty());
        ports.mii_modify(CPU, MiiCfg::EN | MiiCfg::ISOLATE, MiiCfg::empty());

        assert_eq!(sim.reg(RegisterBlock::Mii, mii::cfg(0)), 0x1);
        assert_eq!(sim.reg(RegisterBlock::Mii, mii::cfg(CPU)), all);
    }
}
