//! Register backend capability and bounded polling.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::HalResult;
use crate::variant::PhyInterface;

/// The three register blocks of a GSWIP switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterBlock {
    /// Switch core: PCE, buffer manager, MAC, DMA.
    Switch,
    /// Management MDIO master towards the PHYs.
    Mdio,
    /// xMII interface configuration.
    Mii,
}

impl RegisterBlock {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterBlock::Switch => "switch",
            RegisterBlock::Mdio => "mdio",
            RegisterBlock::Mii => "mii",
        }
    }
}

impl fmt::Display for RegisterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poll interval and overall budget for a busy-bit wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    /// PCE table access and MAC table flush: 20 µs steps, 50 ms budget.
    pub const TABLE: Self = Self {
        interval: Duration::from_micros(20),
        timeout: Duration::from_millis(50),
    };

    /// Slave MDIO master: 100 tries of 20 µs.
    pub const MDIO: Self = Self {
        interval: Duration::from_micros(20),
        timeout: Duration::from_micros(2_000),
    };

    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::TABLE
    }
}

/// Calls `done` until it returns true or the budget runs out.
///
/// On timeout the elapsed time is returned so callers can report it.
pub fn poll_bounded<F>(config: &PollConfig, mut done: F) -> Result<(), Duration>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if done() {
            return Ok(());
        }
        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(elapsed);
        }
        thread::sleep(config.interval.min(config.timeout - elapsed));
    }
}

/// Access to the switch register file.
///
/// Offsets are in register units (16-bit registers on a 32-bit stride for
/// MMIO, direct register numbers behind the MDIO window). Reads and writes
/// are infallible: a backend that cannot reach a register logs it and
/// returns zero. Polling is the only fallible primitive.
pub trait RegisterBackend: Send + Sync {
    fn read(&self, block: RegisterBlock, offset: u32) -> u32;

    fn write(&self, block: RegisterBlock, offset: u32, value: u32);

    /// Waits until `read(block, offset) & mask == 0`.
    fn poll_until_cleared(
        &self,
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        poll: &PollConfig,
    ) -> HalResult<()>;

    /// Whether `port` can be wired to `interface` on this silicon.
    fn supports_interface(&self, port: u8, interface: PhyInterface) -> bool;

    /// Read-modify-write: clears `clear`, then sets `set`.
    fn modify(&self, block: RegisterBlock, offset: u32, clear: u32, set: u32) {
        let value = self.read(block, offset);
        self.write(block, offset, (value & !clear) | set);
    }
}

impl<T: RegisterBackend + ?Sized> RegisterBackend for Arc<T> {
    fn read(&self, block: RegisterBlock, offset: u32) -> u32 {
        (**self).read(block, offset)
    }

    fn write(&self, block: RegisterBlock, offset: u32, value: u32) {
        (**self).write(block, offset, value)
    }

    fn poll_until_cleared(
        &self,
        block: RegisterBlock,
        offset: u32,
        mask: u32,
        poll: &PollConfig,
    ) -> HalResult<()> {
        (**self).poll_until_cleared(block, offset, mask, poll)
    }

    fn supports_interface(&self, port: u8, interface: PhyInterface) -> bool {
        (**self).supports_interface(port, interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_poll_bounded_succeeds_after_retries() {
        let calls = Cell::new(0);
        let config = PollConfig::new(Duration::from_micros(1), Duration::from_millis(100));
        let result = poll_bounded(&config, || {
            calls.set(calls.get() + 1);
            calls.get() >= 3
        });
        assert!(result.is_ok());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_poll_bounded_times_out() {
        let config = PollConfig::new(Duration::from_micros(50), Duration::from_millis(1));
        let waited = poll_bounded(&config, || false).unwrap_err();
        assert!(waited >= Duration::from_millis(1));
    }

    #[test]
    fn test_poll_presets() {
        assert_eq!(PollConfig::TABLE.interval, Duration::from_micros(20));
        assert_eq!(PollConfig::TABLE.timeout, Duration::from_millis(50));
        assert_eq!(PollConfig::MDIO.timeout.as_micros(), 100 * 20);
        assert_eq!(PollConfig::default(), PollConfig::TABLE);
    }

    #[test]
    fn test_block_display() {
        assert_eq!(RegisterBlock::Switch.to_string(), "switch");
        assert_eq!(RegisterBlock::Mdio.as_str(), "mdio");
        assert_eq!(RegisterBlock::Mii.as_str(), "mii");
    }
}
