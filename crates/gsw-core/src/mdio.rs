//! MDIO master of the switch, used to reach the PHYs behind its ports.

use gsw_hal::regs::{mdio, MdioCtrl, PhyAddress, PhyRegister};
use gsw_hal::{PollConfig, RegisterBackend, RegisterBlock};
use tracing::{error, trace};

use crate::error::GswResult;

const MDIO: RegisterBlock = RegisterBlock::Mdio;

/// Clause 22 access through `MDIO_CTRL` / `MDIO_READ` / `MDIO_WRITE`.
///
/// Not serialized against the table engine: the command registers are
/// separate from the PCE block.
pub struct SlaveMdio<'a, B: ?Sized> {
    backend: &'a B,
    poll: PollConfig,
}

impl<'a, B: RegisterBackend + ?Sized> SlaveMdio<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            poll: PollConfig::MDIO,
        }
    }

    fn wait_idle(&self) -> GswResult<()> {
        self.backend
            .poll_until_cleared(MDIO, mdio::CTRL, MdioCtrl::BUSY.bits(), &self.poll)
            .map_err(|err| {
                error!("waiting for MDIO bus busy timed out");
                err.into()
            })
    }

    fn command(op: MdioCtrl, phy: PhyAddress, reg: PhyRegister) -> u32 {
        (MdioCtrl::BUSY | op).bits() | phy.encode_ctrl() | reg.encode()
    }

    pub fn read(&self, phy: u8, reg: u8) -> GswResult<u16> {
        let phy = PhyAddress::new(phy)?;
        let reg = PhyRegister::new(reg)?;

        self.wait_idle()?;
        self.backend
            .write(MDIO, mdio::CTRL, Self::command(MdioCtrl::RD, phy, reg));
        self.wait_idle()?;

        let value = (self.backend.read(MDIO, mdio::READ) & 0xffff) as u16;
        trace!(phy = phy.get(), reg = reg.get(), value, "phy read");
        Ok(value)
    }

    /// Issues the write and returns without waiting for it to finish.
    pub fn write(&self, phy: u8, reg: u8, value: u16) -> GswResult<()> {
        let phy = PhyAddress::new(phy)?;
        let reg = PhyRegister::new(reg)?;

        self.wait_idle()?;
        self.backend.write(MDIO, mdio::WRITE, u32::from(value));
        self.backend
            .write(MDIO, mdio::CTRL, Self::command(MdioCtrl::WR, phy, reg));
        trace!(phy = phy.get(), reg = reg.get(), value, "phy write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GswError;
    use gsw_hal::HwVariant;
    use gsw_sim::SimSwitch;

    #[test]
    fn test_read_write_phy() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        sim.set_phy_reg(0x11, 2, 0x67c9);

        let bus = SlaveMdio::new(&sim);
        assert_eq!(bus.read(0x11, 2).unwrap(), 0x67c9);

        bus.write(0x11, 0, 0x1140).unwrap();
        assert_eq!(sim.phy_reg(0x11, 0), 0x1140);
    }

    #[test]
    fn test_command_encoding() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        SlaveMdio::new(&sim).write(0x05, 0x1f, 0).unwrap();
        // BUSY has self-cleared, the rest of the command stays readable.
        assert_eq!(sim.reg(MDIO, mdio::CTRL), 0x0400 | (0x05 << 5) | 0x1f);
    }

    #[test]
    fn test_rejects_wide_address() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let err = SlaveMdio::new(&sim).read(0x20, 0).unwrap_err();
        assert!(matches!(err, GswError::Hal(_)));
        assert_eq!(sim.reg(MDIO, mdio::CTRL), 0);
    }

    #[test]
    fn test_busy_bus_times_out() {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        sim.stall();
        let err = SlaveMdio::new(&sim).read(1, 1).unwrap_err();
        assert!(err.is_retryable());
    }
}
