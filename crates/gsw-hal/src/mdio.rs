//! Windowed register backend for switches reached over MDIO.
//!
//! External GSWIP chips expose their register file through a 30 register
//! window on a single MDIO address. Register 31 (`TBAR`) holds the base of
//! the window; an access outside the current window first moves it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::backend::{poll_bounded, PollConfig, RegisterBackend, RegisterBlock};
use crate::error::{HalError, HalResult};
use crate::regs::{mii, switch};
use crate::variant::{HwVariant, PhyInterface};

const TBAR_REG: u8 = 31;
const WINDOW_REGS: u32 = 30;

const SWITCH_BASE: u32 = 0xe000;
const MDIO_BASE: u32 = 0xf400;
const MII_CFG5: u32 = 0xf100;
const MII_PCDU5: u32 = 0xf101;

/// A raw MDIO bus.
pub trait MdioBus: Send {
    fn read(&mut self, phy: u8, reg: u8) -> u16;
    fn write(&mut self, phy: u8, reg: u8, value: u16);
}

/// Register backend tunnelling every access through the `TBAR` window.
///
/// The bus lock is held for the whole window move and access, so two
/// accesses can never interleave their `TBAR` updates.
pub struct MdioBackend<M> {
    bus: Mutex<M>,
    phy: u8,
    variant: HwVariant,
}

impl<M: MdioBus> MdioBackend<M> {
    pub fn new(bus: M, phy: u8, variant: HwVariant) -> Self {
        Self {
            bus: Mutex::new(bus),
            phy,
            variant,
        }
    }

    pub fn variant(&self) -> HwVariant {
        self.variant
    }

    pub fn into_inner(self) -> M {
        self.bus.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, M> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Absolute chip address of a block register.
    fn translate(block: RegisterBlock, offset: u32) -> Option<u32> {
        match block {
            // The reset register sits in the MDIO area on external chips.
            RegisterBlock::Switch if offset == switch::SWRES => Some(MDIO_BASE + offset),
            RegisterBlock::Switch => Some(SWITCH_BASE + offset),
            RegisterBlock::Mdio => Some(MDIO_BASE + offset),
            RegisterBlock::Mii if offset == mii::cfg(5) => Some(MII_CFG5),
            RegisterBlock::Mii if offset == mii::PCDU5 => Some(MII_PCDU5),
            RegisterBlock::Mii => None,
        }
    }

    /// Moves the window if needed and returns the in-window register.
    fn select(&self, bus: &mut M, address: u32) -> u8 {
        let tbar = u32::from(bus.read(self.phy, TBAR_REG));
        let base = if address < tbar || address > tbar + WINDOW_REGS {
            // Chip addresses are 16 bits wide.
            bus.write(self.phy, TBAR_REG, address as u16);
            address
        } else {
            tbar
        };
        (address - base) as u8
    }

    fn read_locked(&self, bus: &mut M, address: u32) -> u32 {
        let reg = self.select(bus, address);
        u32::from(bus.read(self.phy, reg))
    }
}

impl<M: MdioBus> RegisterBackend for MdioBackend<M> {
    fn read(&self, block: RegisterBlock, offset: u32) -> u32 {
        let Some(address) = Self::translate(block, offset) else {
            warn!("{} register {:#05x} is not mapped over MDIO", block, offset);
            return 0;
        };
        let mut bus = self.lock();
        self.read_locked(&mut bus, address)
    }

    fn write(&self, block: RegisterBlock, offset: u32, value: u32) {
        let Some(address) = Self::translate(block, offset) else {
            warn!("{} register {:#05x} is not mapped over MDIO", block, offset);
            return;
        };
        let mut bus = self.lock();
        let reg = self.select(&mut bus, address);
        bus.write(self.phy, reg, value as u16);
    }

    fn poll_until_cleared(
        &self,
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        poll: &PollConfig,
    ) -> HalResult<()> {
        let address = Self::translate(block, offset).ok_or(HalError::Unmapped { block, offset })?;
        let mut bus = self.lock();
        poll_bounded(poll, || self.read_locked(&mut bus, address) & mask == 0).map_err(|waited| {
            debug!("{}:{:#05x} still busy after {:?}", block, offset, waited);
            HalError::Timeout {
                block,
                offset,
                mask,
                waited,
            }
        })
    }

    fn supports_interface(&self, port: u8, interface: PhyInterface) -> bool {
        self.variant.supports_interface(port, interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Chip model: a flat register file behind the TBAR window.
    #[derive(Default)]
    struct WindowedChip {
        tbar: u16,
        regs: HashMap<u32, u16>,
        tbar_writes: usize,
    }

    impl MdioBus for WindowedChip {
        fn read(&mut self, phy: u8, reg: u8) -> u16 {
            assert_eq!(phy, 0x1f);
            if reg == TBAR_REG {
                return self.tbar;
            }
            let address = u32::from(self.tbar) + u32::from(reg);
            self.regs.get(&address).copied().unwrap_or(0)
        }

        fn write(&mut self, phy: u8, reg: u8, value: u16) {
            assert_eq!(phy, 0x1f);
            if reg == TBAR_REG {
                self.tbar = value;
                self.tbar_writes += 1;
                return;
            }
            let address = u32::from(self.tbar) + u32::from(reg);
            self.regs.insert(address, value);
        }
    }

    #[test]
    fn test_translation() {
        type Backend = MdioBackend<WindowedChip>;
        assert_eq!(Backend::translate(RegisterBlock::Switch, 0x44f), Some(0xe44f));
        assert_eq!(Backend::translate(RegisterBlock::Switch, 0x000), Some(0xf400));
        assert_eq!(Backend::translate(RegisterBlock::Mdio, 0x08), Some(0xf408));
        assert_eq!(Backend::translate(RegisterBlock::Mii, mii::cfg(5)), Some(0xf100));
        assert_eq!(Backend::translate(RegisterBlock::Mii, mii::PCDU5), Some(0xf101));
        assert_eq!(Backend::translate(RegisterBlock::Mii, mii::cfg(0)), None);
    }

    #[test]
    fn test_window_moves_only_when_needed() {
        let backend = MdioBackend::new(WindowedChip::default(), 0x1f, HwVariant::Gsw1xx);
        backend.write(RegisterBlock::Switch, 0x440, 0x1111);
        backend.write(RegisterBlock::Switch, 0x44f, 0x2222);
        assert_eq!(backend.read(RegisterBlock::Switch, 0x440), 0x1111);
        assert_eq!(backend.read(RegisterBlock::Switch, 0x44f), 0x2222);
        backend.write(RegisterBlock::Mdio, 0x08, 0x3333);

        let chip = backend.into_inner();
        assert_eq!(chip.regs.get(&0xe440), Some(&0x1111));
        assert_eq!(chip.regs.get(&0xe44f), Some(&0x2222));
        assert_eq!(chip.regs.get(&0xf408), Some(&0x3333));
        assert_eq!(chip.tbar_writes, 2);
    }

    #[test]
    fn test_unmapped_mii_register() {
        let backend = MdioBackend::new(WindowedChip::default(), 0x1f, HwVariant::Gsw1xx);
        backend.write(RegisterBlock::Mii, mii::cfg(0), 0x4000);
        assert_eq!(backend.read(RegisterBlock::Mii, mii::cfg(0)), 0);
        let err = backend
            .poll_until_cleared(RegisterBlock::Mii, mii::cfg(0), 0x1, &PollConfig::MDIO)
            .unwrap_err();
        assert!(matches!(err, HalError::Unmapped { .. }));
    }
}
