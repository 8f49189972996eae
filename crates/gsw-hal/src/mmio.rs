//! Memory-mapped backend for SoC-integrated switches.

use std::ptr::{read_volatile, write_volatile};

use log::warn;

use crate::backend::{poll_bounded, PollConfig, RegisterBackend, RegisterBlock};
use crate::error::{HalError, HalResult};
use crate::variant::{HwVariant, PhyInterface};

/// One memory-mapped register block.
///
/// Register `n` lives at `base + n * 4`.
#[derive(Debug, Clone, Copy)]
pub struct MmioWindow {
    base: usize,
    size: usize,
}

impl MmioWindow {
    /// # Safety
    ///
    /// `base` must point to a mapped device region of at least `size` bytes
    /// with non-cacheable attributes that stays mapped for the lifetime of
    /// every backend built from this window.
    pub const unsafe fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    fn address(&self, offset: u32) -> Option<usize> {
        let byte = (offset as usize).checked_mul(4)?;
        if byte.checked_add(4)? > self.size {
            return None;
        }
        Some(self.base + byte)
    }

    fn read(&self, offset: u32) -> Option<u32> {
        let addr = self.address(offset)?;
        // SAFETY: in bounds of a region the constructor's caller vouched for.
        Some(unsafe { read_volatile(addr as *const u32) })
    }

    fn write(&self, offset: u32, value: u32) -> bool {
        match self.address(offset) {
            Some(addr) => {
                // SAFETY: in bounds of a region the constructor's caller vouched for.
                unsafe { write_volatile(addr as *mut u32, value) };
                true
            }
            None => false,
        }
    }
}

/// Register backend over three memory-mapped windows.
#[derive(Debug)]
pub struct MmioBackend {
    switch: MmioWindow,
    mdio: MmioWindow,
    mii: MmioWindow,
    variant: HwVariant,
}

impl MmioBackend {
    pub fn new(switch: MmioWindow, mdio: MmioWindow, mii: MmioWindow, variant: HwVariant) -> Self {
        Self {
            switch,
            mdio,
            mii,
            variant,
        }
    }

    pub fn variant(&self) -> HwVariant {
        self.variant
    }

    fn window(&self, block: RegisterBlock) -> &MmioWindow {
        match block {
            RegisterBlock::Switch => &self.switch,
            RegisterBlock::Mdio => &self.mdio,
            RegisterBlock::Mii => &self.mii,
        }
    }
}

impl RegisterBackend for MmioBackend {
    fn read(&self, block: RegisterBlock, offset: u32) -> u32 {
        self.window(block).read(offset).unwrap_or_else(|| {
            warn!("read outside {} window at {:#05x}", block, offset);
            0
        })
    }

    fn write(&self, block: RegisterBlock, offset: u32, value: u32) {
        if !self.window(block).write(offset, value) {
            warn!("write outside {} window at {:#05x}", block, offset);
        }
    }

    fn poll_until_cleared(
        &self,
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        poll: &PollConfig,
    ) -> HalResult<()> {
        let window = self.window(block);
        if window.address(offset).is_none() {
            return Err(HalError::Unmapped { block, offset });
        }
        poll_bounded(poll, || window.read(offset).unwrap_or(0) & mask == 0).map_err(|waited| {
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
    use std::time::Duration;

    struct Backing {
        switch: Vec<u32>,
        mdio: Vec<u32>,
        mii: Vec<u32>,
    }

    impl Backing {
        fn new() -> Self {
            Self {
                switch: vec![0; 0x1000],
                mdio: vec![0; 0x20],
                mii: vec![0; 0x10],
            }
        }

        fn backend(&mut self) -> MmioBackend {
            // SAFETY: the vectors outlive the backend within each test.
            unsafe {
                MmioBackend::new(
                    MmioWindow::new(self.switch.as_mut_ptr() as usize, self.switch.len() * 4),
                    MmioWindow::new(self.mdio.as_mut_ptr() as usize, self.mdio.len() * 4),
                    MmioWindow::new(self.mii.as_mut_ptr() as usize, self.mii.len() * 4),
                    HwVariant::Xrx200,
                )
            }
        }
    }

    #[test]
    fn test_backend_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MmioBackend>();
    }

    #[test]
    fn test_read_write_stride() {
        let mut backing = Backing::new();
        let backend = backing.backend();
        backend.write(RegisterBlock::Switch, 0x44e, 0x1234);
        assert_eq!(backend.read(RegisterBlock::Switch, 0x44e), 0x1234);
        backend.write(RegisterBlock::Mii, 0x0a, 0x4000);
        drop(backend);
        assert_eq!(backing.switch[0x44e], 0x1234);
        assert_eq!(backing.mii[0x0a], 0x4000);
    }

    #[test]
    fn test_out_of_window_access_is_ignored() {
        let mut backing = Backing::new();
        let backend = backing.backend();
        backend.write(RegisterBlock::Mdio, 0x40, 0xffff);
        assert_eq!(backend.read(RegisterBlock::Mdio, 0x40), 0);
        let err = backend
            .poll_until_cleared(RegisterBlock::Mdio, 0x40, 0x1000, &PollConfig::MDIO)
            .unwrap_err();
        assert_eq!(
            err,
            HalError::Unmapped {
                block: RegisterBlock::Mdio,
                offset: 0x40
            }
        );
    }

    #[test]
    fn test_modify_and_poll() {
        let mut backing = Backing::new();
        let backend = backing.backend();
        backend.write(RegisterBlock::Switch, 0x44f, 0x807f);
        backend.modify(RegisterBlock::Switch, 0x44f, 0x007f, 0x000b);
        assert_eq!(backend.read(RegisterBlock::Switch, 0x44f), 0x800b);

        let quick = PollConfig::new(Duration::from_micros(10), Duration::from_micros(200));
        let err = backend
            .poll_until_cleared(RegisterBlock::Switch, 0x44f, 0x8000, &quick)
            .unwrap_err();
        assert!(err.is_timeout());

        backend.modify(RegisterBlock::Switch, 0x44f, 0x8000, 0);
        assert!(backend
            .poll_until_cleared(RegisterBlock::Switch, 0x44f, 0x8000, &quick)
            .is_ok());
    }
}
