//! Switch instance and the operations the host switch framework calls.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gsw_hal::regs::PhyAddress;
use gsw_hal::{PhyInterface, RegisterBackend};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::bridge::{BridgeId, DomainAllocator, SlotTable, VLAN_TABLE_SIZE};
use crate::config::SwitchConfig;
use crate::error::{GswError, GswResult};
use crate::fdb::{FdbDumpEntry, MacAddress, MacTable};
use crate::mdio::SlaveMdio;
use crate::pce::{TableEngine, TableId};
use crate::port::PortControl;
use crate::port_bit;
use crate::setup::{ConfigStatus, Sequencer};
use crate::stp::{apply_stp_state, StpState};
use crate::version::SwitchVersion;

/// Bridge a port currently belongs to, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    pub bridge: Option<BridgeId>,
    /// Filtering mode recorded when the port joined.
    pub vlan_filtering: bool,
}

/// One occupied shared slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub index: usize,
    pub bridge: BridgeId,
    pub vid: u16,
    pub fid: u8,
}

/// Read-only copy of the slot bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    pub capacity: usize,
    pub reserved: usize,
    pub slots: Vec<SlotView>,
    pub ports: Vec<PortBinding>,
}

impl SlotSnapshot {
    pub fn occupancy(&self) -> usize {
        self.slots.len()
    }

    pub fn bridge_slots(&self, bridge: BridgeId) -> impl Iterator<Item = &SlotView> {
        self.slots.iter().filter(move |slot| slot.bridge == bridge)
    }
}

/// Switch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GswStats {
    pub transactions: u64,
    pub timeouts: u64,
    pub slots_allocated: u64,
    pub slots_released: u64,
    pub slots_in_use: usize,
    pub fdb_aged: u64,
}

/// Slot bookkeeping and port bindings, changed together with the tables.
#[derive(Debug)]
struct SwitchState {
    slots: SlotTable,
    ports: Vec<PortBinding>,
}

impl SwitchState {
    fn new(max_ports: u8) -> Self {
        Self {
            slots: SlotTable::new(max_ports),
            ports: vec![PortBinding::default(); usize::from(max_ports)],
        }
    }

    fn binding(&self, port: u8) -> PortBinding {
        self.ports
            .get(usize::from(port))
            .copied()
            .unwrap_or_default()
    }
}

/// A GSWIP switch.
///
/// Operations may be called from several threads. Each bridge or VLAN
/// change holds the state lock for its whole table sequence; the table
/// engine lock nests inside it.
pub struct GswSwitch<B> {
    config: SwitchConfig,
    version: SwitchVersion,
    engine: TableEngine<B>,
    state: Mutex<SwitchState>,
    fdb_aged: AtomicU64,
}

impl<B: RegisterBackend> GswSwitch<B> {
    /// Validates `config` and probes the hardware version. Touches no
    /// table; call [`GswSwitch::setup`] before anything else.
    pub fn attach(backend: B, config: SwitchConfig) -> GswResult<Self> {
        config.validate()?;
        let version = SwitchVersion::probe(&backend, config.variant)?;
        let engine = TableEngine::new(Arc::new(backend), config.poll_config());
        let state = SwitchState::new(config.max_ports());
        info!(
            "attached {} switch, {} ports, CPU port {}",
            config.variant,
            config.max_ports(),
            config.cpu_port()
        );
        Ok(Self {
            config,
            version,
            engine,
            state: Mutex::new(state),
            fdb_aged: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    pub fn version(&self) -> SwitchVersion {
        self.version
    }

    pub fn backend(&self) -> &B {
        self.engine.backend()
    }

    pub fn engine(&self) -> &TableEngine<B> {
        &self.engine
    }

    pub fn cpu_port(&self) -> u8 {
        self.config.cpu_port()
    }

    fn is_cpu(&self, port: u8) -> bool {
        port == self.config.cpu_port()
    }

    fn state(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_port(&self, port: u8) -> GswResult<()> {
        let max_ports = self.config.max_ports();
        if port >= max_ports {
            error!("port {} out of range (max {})", port, max_ports - 1);
            return Err(GswError::invalid_config(format!(
                "port {} out of range (max {})",
                port,
                max_ports - 1
            )));
        }
        Ok(())
    }

    /// Bridge membership only applies to user ports.
    fn check_user_port(&self, port: u8) -> GswResult<()> {
        self.check_port(port)?;
        if self.is_cpu(port) {
            error!("CPU port {} cannot join or leave a bridge", port);
            return Err(GswError::not_supported(format!(
                "bridge membership of CPU port {}",
                port
            )));
        }
        Ok(())
    }

    fn ports(&self) -> PortControl<'_, B> {
        PortControl::new(self.engine.backend(), self.config.cpu_port())
    }

    fn domains<'s>(&'s self, state: &'s mut SwitchState) -> DomainAllocator<'s, B> {
        DomainAllocator::new(
            &mut state.slots,
            &self.engine,
            self.config.cpu_port(),
            self.config.max_ports(),
        )
    }

    /// Runs the one-time initialization and forgets every shared slot.
    #[instrument(skip(self))]
    pub fn setup(&self) -> GswResult<()> {
        let mut state = self.state();
        Sequencer::new(&self.engine, &self.config, self.version).run()?;
        *state = SwitchState::new(self.config.max_ports());
        Ok(())
    }

    /// Enables a port. User ports start in their single-port domain.
    #[instrument(skip(self))]
    pub fn port_enable(&self, port: u8, phy: Option<u8>) -> GswResult<()> {
        self.check_port(port)?;
        let phy = phy.map(PhyAddress::new).transpose()?;

        if !self.is_cpu(port) {
            let mut state = self.state();
            self.domains(&mut state)
                .ensure_single_port_domain(port, true)?;
        }
        self.ports().enable(port, phy);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn port_disable(&self, port: u8) -> GswResult<()> {
        self.check_port(port)?;
        self.ports().disable(port);
        Ok(())
    }

    /// Adds a port to a bridge.
    ///
    /// A VLAN-unaware bridge gets its shared slot here; a filtering bridge
    /// only gets slots as VLANs are added. Either way the port leaves its
    /// single-port domain.
    #[instrument(skip(self), fields(%bridge))]
    pub fn port_bridge_join(&self, port: u8, bridge: BridgeId, vlan_filtering: bool) -> GswResult<()> {
        self.check_user_port(port)?;
        let mut state = self.state();

        if !vlan_filtering {
            self.domains(&mut state).join_unaware(bridge, port)?;
        }
        self.domains(&mut state)
            .ensure_single_port_domain(port, false)?;

        state.ports[usize::from(port)] = PortBinding {
            bridge: Some(bridge),
            vlan_filtering,
        };
        Ok(())
    }

    /// Returns a port to its single-port domain, then drops it from the
    /// bridge's unaware slot.
    #[instrument(skip(self), fields(%bridge))]
    pub fn port_bridge_leave(&self, port: u8, bridge: BridgeId, vlan_filtering: bool) -> GswResult<()> {
        self.check_user_port(port)?;
        let mut state = self.state();

        self.domains(&mut state)
            .ensure_single_port_domain(port, true)?;
        if !vlan_filtering {
            self.domains(&mut state)
                .remove(bridge, port, 0, true, false)?;
        }

        state.ports[usize::from(port)].bridge = None;
        Ok(())
    }

    /// Switches VLAN filtering on or off. A bridged port keeps the mode it
    /// joined with.
    #[instrument(skip(self))]
    pub fn port_vlan_filtering(&self, port: u8, enabled: bool) -> GswResult<()> {
        self.check_port(port)?;
        let state = self.state();
        let binding = state.binding(port);

        if binding.bridge.is_some() && binding.vlan_filtering != enabled {
            warn!(port, "dynamic toggling of vlan_filtering not supported");
            return Err(GswError::not_supported(
                "dynamic toggling of vlan_filtering",
            ));
        }
        self.ports().set_vlan_filtering(port, enabled);
        Ok(())
    }

    fn vlan_bridge(&self, state: &SwitchState, port: u8) -> GswResult<Option<BridgeId>> {
        let bridge = state.binding(port).bridge;
        if bridge.is_none() && !self.is_cpu(port) {
            return Err(GswError::not_supported(format!(
                "VLANs on port {} outside a bridge",
                port
            )));
        }
        Ok(bridge)
    }

    /// Checks that a VLAN could be added without reserving anything.
    #[instrument(skip(self))]
    pub fn port_vlan_prepare(&self, port: u8, vid: u16) -> GswResult<()> {
        self.check_port(port)?;
        let mut state = self.state();
        let bridge = self.vlan_bridge(&state, port)?;
        self.domains(&mut state).prepare(bridge, vid)
    }

    /// Adds `vid` on a bridged port. The CPU port passes the capacity check
    /// and is otherwise left alone: it receives every VLAN anyway.
    #[instrument(skip(self))]
    pub fn port_vlan_add(&self, port: u8, vid: u16, untagged: bool, pvid: bool) -> GswResult<()> {
        self.check_port(port)?;
        let mut state = self.state();
        let bridge = self.vlan_bridge(&state, port)?;
        self.domains(&mut state).prepare(bridge, vid)?;

        let Some(bridge) = bridge else {
            return Ok(());
        };
        if self.is_cpu(port) {
            return Ok(());
        }
        self.domains(&mut state)
            .add_aware(bridge, port, vid, untagged, pvid)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn port_vlan_del(&self, port: u8, vid: u16, pvid: bool) -> GswResult<()> {
        self.check_port(port)?;
        if self.is_cpu(port) {
            return Ok(());
        }
        let mut state = self.state();
        let bridge = state.binding(port).bridge.ok_or_else(|| {
            error!("port {} has no bridge for vid {}", port, vid);
            GswError::not_found(format!("bridge of port {}", port))
        })?;
        self.domains(&mut state)
            .remove(bridge, port, vid, pvid, true)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn port_stp_state_set(&self, port: u8, state: StpState) -> GswResult<()> {
        self.check_port(port)?;
        apply_stp_state(self.engine.backend(), port, state);
        Ok(())
    }

    /// Flow id of the bridge `port` is in.
    fn port_fid(state: &SwitchState, port: u8) -> GswResult<u8> {
        state
            .binding(port)
            .bridge
            .and_then(|bridge| state.slots.bridge_fid(bridge))
            .ok_or_else(|| {
                error!("port {} not part of a bridge", port);
                GswError::NotInBridge { port }
            })
    }

    /// The state lock stays held across the write so the flow id cannot be
    /// released underneath it.
    fn port_fdb(&self, port: u8, mac: MacAddress, add: bool) -> GswResult<()> {
        self.check_port(port)?;
        let state = self.state();
        let fid = Self::port_fid(&state, port)?;
        MacTable::new(&self.engine).upsert(port, fid, mac, add)
    }

    /// Installs a static entry for `mac` in the port's bridge.
    #[instrument(skip(self), fields(%mac))]
    pub fn port_fdb_add(&self, port: u8, mac: MacAddress) -> GswResult<()> {
        self.port_fdb(port, mac, true)
    }

    #[instrument(skip(self), fields(%mac))]
    pub fn port_fdb_del(&self, port: u8, mac: MacAddress) -> GswResult<()> {
        self.port_fdb(port, mac, false)
    }

    /// Reports MAC entries forwarding to `port` in table order until the
    /// callback breaks. Returns how many were reported.
    pub fn port_fdb_dump<F>(&self, port: u8, callback: F) -> GswResult<usize>
    where
        F: FnMut(&FdbDumpEntry) -> ControlFlow<()>,
    {
        self.check_port(port)?;
        MacTable::new(&self.engine).dump(port, callback)
    }

    /// Collects the whole dump for `port`.
    pub fn fdb_entries(&self, port: u8) -> GswResult<Vec<FdbDumpEntry>> {
        let mut entries = Vec::new();
        self.port_fdb_dump(port, |entry| {
            entries.push(*entry);
            ControlFlow::Continue(())
        })?;
        Ok(entries)
    }

    /// Drops the dynamic entries learned on `port`.
    #[instrument(skip(self))]
    pub fn port_fast_age(&self, port: u8) -> GswResult<usize> {
        self.check_port(port)?;
        let aged = MacTable::new(&self.engine).fast_age(port)?;
        self.fdb_aged.fetch_add(aged as u64, Ordering::Relaxed);
        Ok(aged)
    }

    pub fn check_interface(&self, port: u8, interface: PhyInterface) -> GswResult<()> {
        self.check_port(port)?;
        if !self.engine.backend().supports_interface(port, interface) {
            error!("unsupported interface {} for port {}", interface, port);
            return Err(GswError::invalid_config(format!(
                "port {} cannot run {}",
                port, interface
            )));
        }
        Ok(())
    }

    pub fn phy_read(&self, phy: u8, reg: u8) -> GswResult<u16> {
        SlaveMdio::new(self.engine.backend()).read(phy, reg)
    }

    pub fn phy_write(&self, phy: u8, reg: u8, value: u16) -> GswResult<()> {
        SlaveMdio::new(self.engine.backend()).write(phy, reg, value)
    }

    pub fn config_status(&self) -> ConfigStatus {
        ConfigStatus::read(self.engine.backend())
    }

    pub fn slot_snapshot(&self) -> SlotSnapshot {
        let state = self.state();
        SlotSnapshot {
            capacity: VLAN_TABLE_SIZE,
            reserved: state.slots.reserved(),
            slots: state
                .slots
                .occupied()
                .map(|(index, slot)| SlotView {
                    index,
                    bridge: slot.bridge,
                    vid: slot.vid,
                    fid: slot.fid,
                })
                .collect(),
            ports: state.ports.clone(),
        }
    }

    /// Whether `port` is a member of slot `index` according to the mapping
    /// table.
    pub fn slot_has_member(&self, index: u16, port: u8) -> GswResult<bool> {
        let mapping = self
            .engine
            .read_entry(TableId::VlanMapping, index, false)?;
        Ok(mapping.val[1] & port_bit(port) != 0)
    }

    pub fn stats(&self) -> GswStats {
        let engine = self.engine.stats();
        let state = self.state();
        GswStats {
            transactions: engine.transactions,
            timeouts: engine.timeouts,
            slots_allocated: state.slots.allocations(),
            slots_released: state.slots.releases(),
            slots_in_use: state.slots.occupancy(),
            fdb_aged: self.fdb_aged.load(Ordering::Relaxed),
        }
    }
}
