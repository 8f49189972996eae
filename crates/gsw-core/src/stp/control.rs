//! Programs STP states into the port registers.

use gsw_hal::regs::{switch, PcePctrl0, SdmaPctrl};
use gsw_hal::{RegisterBackend, RegisterBlock};
use tracing::debug;

use super::types::StpState;

const SW: RegisterBlock = RegisterBlock::Switch;

/// Disabled ports lose ingress DMA and keep their classification state;
/// every other state turns ingress DMA on and sets `PSTATE`.
pub fn apply_stp_state<B: RegisterBackend + ?Sized>(backend: &B, port: u8, state: StpState) {
    let Some(port_state) = state.to_port_state() else {
        backend.modify(SW, switch::sdma_pctrl(port), SdmaPctrl::EN.bits(), 0);
        debug!(port, "STP disabled, ingress DMA off");
        return;
    };

    backend.modify(SW, switch::sdma_pctrl(port), 0, SdmaPctrl::EN.bits());
    backend.modify(
        SW,
        switch::pce_pctrl_0(port),
        PcePctrl0::PSTATE.bits(),
        port_state.encode(),
    );
    debug!(port, %state, "STP state applied");
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsw_hal::HwVariant;
    use gsw_sim::SimSwitch;

    fn pstate(sim: &SimSwitch, port: u8) -> u32 {
        sim.reg(SW, switch::pce_pctrl_0(port)) & PcePctrl0::PSTATE.bits()
    }

    fn sdma_enabled(sim: &SimSwitch, port: u8) -> bool {
        sim.reg(SW, switch::sdma_pctrl(port)) & SdmaPctrl::EN.bits() != 0
    }

    #[test]
    fn test_states_map_to_pstate() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        sim.poke(SW, switch::pce_pctrl_0(1), PcePctrl0::INGRESS.bits());

        apply_stp_state(&sim, 1, StpState::Forwarding);
        assert_eq!(pstate(&sim, 1), 7);
        assert!(sdma_enabled(&sim, 1));

        apply_stp_state(&sim, 1, StpState::Learning);
        assert_eq!(pstate(&sim, 1), 3);

        apply_stp_state(&sim, 1, StpState::Blocking);
        assert_eq!(pstate(&sim, 1), 0);
        apply_stp_state(&sim, 1, StpState::Listening);
        assert_eq!(pstate(&sim, 1), 0);

        assert_ne!(
            sim.reg(SW, switch::pce_pctrl_0(1)) & PcePctrl0::INGRESS.bits(),
            0
        );
    }

    #[test]
    fn test_disabled_only_clears_sdma() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        apply_stp_state(&sim, 2, StpState::Forwarding);
        apply_stp_state(&sim, 2, StpState::Disabled);
        assert!(!sdma_enabled(&sim, 2));
        assert_eq!(pstate(&sim, 2), 7);
    }
}
