//! One-time global initialization.

use std::thread;
use std::time::Duration;

use gsw_hal::regs::{
    mdio, switch, BmQueueGctrl, MdcDivider, MdioGlob, MiiCfg, PceGctrl0, PceGctrl1, SwRes,
};
use gsw_hal::{HwVariant, RegisterBackend, RegisterBlock};
use tracing::{debug, error, info, instrument, warn};

use super::microcode::DEFAULT_MICROCODE;
use crate::config::SwitchConfig;
use crate::error::GswResult;
use crate::pce::TableEngine;
use crate::port::PortControl;
use crate::port_bit;
use crate::version::SwitchVersion;

const SW: RegisterBlock = RegisterBlock::Switch;

/// Hold time of the register reset.
const RESET_HOLD: Duration = Duration::from_millis(5);

/// Largest frame the CPU port accepts: VLAN frame, special tag and FCS.
pub const MAX_FRAME_LEN: u32 = 1518 + 8 + 4;

/// Runs the attach-time register sequence.
///
/// Every step either succeeds or aborts the whole sequence; nothing is
/// retried.
pub struct Sequencer<'a, B> {
    engine: &'a TableEngine<B>,
    config: &'a SwitchConfig,
    version: SwitchVersion,
}

impl<'a, B: RegisterBackend> Sequencer<'a, B> {
    pub fn new(engine: &'a TableEngine<B>, config: &'a SwitchConfig, version: SwitchVersion) -> Self {
        Self {
            engine,
            config,
            version,
        }
    }

    /// Whether `PCE_GCTRL_1.VLANMD` gets set: on by default for the
    /// MaxLinear parts, overridable, and never on silicon without it.
    pub fn vlan_mode_enabled(&self) -> bool {
        let wanted = self
            .config
            .vlan_mode_gsw22
            .unwrap_or(self.config.variant == HwVariant::Gsw1xx);
        if wanted && !self.version.generation.has_vlan_mode() {
            warn!("{} has no GSWIP 2.2 VLAN mode, leaving it off", self.version);
            return false;
        }
        wanted
    }

    fn flood_map(&self) -> u32 {
        let map = if self.config.flood_unknown {
            self.config.all_ports_mask()
        } else {
            port_bit(self.config.cpu_port())
        };
        u32::from(map)
    }

    #[instrument(skip(self), fields(variant = %self.config.variant))]
    pub fn run(&self) -> GswResult<()> {
        let b = self.engine.backend();
        let cpu_port = self.config.cpu_port();
        let ports = PortControl::new(b, cpu_port);

        b.write(SW, switch::SWRES, SwRes::R0.bits());
        thread::sleep(RESET_HOLD);
        b.write(SW, switch::SWRES, 0);

        for port in 0..self.config.max_ports() {
            ports.disable(port);
            ports.set_vlan_filtering(port, false);
        }

        b.modify(RegisterBlock::Mdio, mdio::GLOB, 0, MdioGlob::ENABLE.bits());

        self.engine
            .load_microcode(&DEFAULT_MICROCODE)
            .map_err(|err| {
                error!("writing PCE microcode failed: {}", err);
                err
            })?;
        debug!("microcode loaded");

        let flood = self.flood_map();
        b.write(SW, switch::PCE_PMAP2, flood);
        b.write(SW, switch::PCE_PMAP3, flood);

        // PHY auto polling off.
        b.write(RegisterBlock::Mdio, mdio::MDC_CFG0, 0);
        let divider = MdcDivider::new(self.config.mdio_clock_div)?;
        b.modify(RegisterBlock::Mdio, mdio::MDC_CFG1, MdcDivider::MASK, divider.encode());

        for port in 0..self.config.max_ports() {
            ports.mii_modify(port, MiiCfg::EN | MiiCfg::ISOLATE, MiiCfg::empty());
        }

        ports.configure_cpu_port();
        b.write(SW, switch::MAC_FLEN, MAX_FRAME_LEN);
        b.modify(SW, switch::BM_QUEUE_GCTRL, 0, BmQueueGctrl::GL_MOD.bits());

        if self.vlan_mode_enabled() {
            b.modify(SW, switch::PCE_GCTRL_1, 0, PceGctrl1::VLANMD.bits());
        }
        b.modify(SW, switch::PCE_GCTRL_0, 0, PceGctrl0::VLAN.bits());

        b.modify(SW, switch::PCE_GCTRL_0, 0, PceGctrl0::MTFL.bits());
        b.poll_until_cleared(
            SW,
            switch::PCE_GCTRL_0,
            PceGctrl0::MTFL.bits(),
            self.engine.poll_config(),
        )
        .map_err(|err| {
            error!("MAC flushing didn't finish");
            err
        })?;

        ports.enable(cpu_port, None);

        info!("switch {} set up", self.version);
        Ok(())
    }
}
