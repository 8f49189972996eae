//! Scenario files: a switch config plus a list of host operations.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gsw_core::{BridgeId, GswResult, GswSwitch, MacAddress, StpState, SwitchConfig};
use gsw_hal::RegisterBackend;
use serde::{Deserialize, Serialize};

/// One host-framework call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    PortEnable {
        port: u8,
        #[serde(default)]
        phy: Option<u8>,
    },
    PortDisable {
        port: u8,
    },
    BridgeJoin {
        port: u8,
        bridge: u64,
        #[serde(default)]
        vlan_filtering: bool,
    },
    BridgeLeave {
        port: u8,
        bridge: u64,
        #[serde(default)]
        vlan_filtering: bool,
    },
    VlanFiltering {
        port: u8,
        enabled: bool,
    },
    VlanAdd {
        port: u8,
        vid: u16,
        #[serde(default)]
        untagged: bool,
        #[serde(default)]
        pvid: bool,
    },
    VlanDel {
        port: u8,
        vid: u16,
        #[serde(default)]
        pvid: bool,
    },
    StpState {
        port: u8,
        state: StpState,
    },
    FdbAdd {
        port: u8,
        mac: MacAddress,
    },
    FdbDel {
        port: u8,
        mac: MacAddress,
    },
    FastAge {
        port: u8,
    },
}

impl Step {
    pub fn apply<B: RegisterBackend>(&self, gsw: &GswSwitch<B>) -> GswResult<()> {
        match *self {
            Step::PortEnable { port, phy } => gsw.port_enable(port, phy),
            Step::PortDisable { port } => gsw.port_disable(port),
            Step::BridgeJoin {
                port,
                bridge,
                vlan_filtering,
            } => gsw.port_bridge_join(port, BridgeId(bridge), vlan_filtering),
            Step::BridgeLeave {
                port,
                bridge,
                vlan_filtering,
            } => gsw.port_bridge_leave(port, BridgeId(bridge), vlan_filtering),
            Step::VlanFiltering { port, enabled } => gsw.port_vlan_filtering(port, enabled),
            Step::VlanAdd {
                port,
                vid,
                untagged,
                pvid,
            } => gsw.port_vlan_add(port, vid, untagged, pvid),
            Step::VlanDel { port, vid, pvid } => gsw.port_vlan_del(port, vid, pvid),
            Step::StpState { port, state } => gsw.port_stp_state_set(port, state),
            Step::FdbAdd { port, mac } => gsw.port_fdb_add(port, mac),
            Step::FdbDel { port, mac } => gsw.port_fdb_del(port, mac),
            Step::FastAge { port } => gsw.port_fast_age(port).map(|_| ()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::PortEnable { port, .. } => write!(f, "port_enable {}", port),
            Step::PortDisable { port } => write!(f, "port_disable {}", port),
            Step::BridgeJoin {
                port,
                bridge,
                vlan_filtering,
            } => write!(
                f,
                "bridge_join {} br{} filtering={}",
                port, bridge, vlan_filtering
            ),
            Step::BridgeLeave { port, bridge, .. } => {
                write!(f, "bridge_leave {} br{}", port, bridge)
            }
            Step::VlanFiltering { port, enabled } => {
                write!(f, "vlan_filtering {} {}", port, enabled)
            }
            Step::VlanAdd {
                port,
                vid,
                untagged,
                pvid,
            } => write!(
                f,
                "vlan_add {} vid {} untagged={} pvid={}",
                port, vid, untagged, pvid
            ),
            Step::VlanDel { port, vid, .. } => write!(f, "vlan_del {} vid {}", port, vid),
            Step::StpState { port, state } => write!(f, "stp_state {} {}", port, state),
            Step::FdbAdd { port, mac } => write!(f, "fdb_add {} {}", port, mac),
            Step::FdbDel { port, mac } => write!(f, "fdb_del {} {}", port, mac),
            Step::FastAge { port } => write!(f, "fast_age {}", port),
        }
    }
}

/// A replayable list of operations.
///
/// ```yaml
/// switch:
///   variant: xrx200
/// steps:
///   - op: bridge_join
///     port: 1
///     bridge: 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub description: Option<String>,
    /// Switch to build; the command line config is used when absent.
    #[serde(default)]
    pub switch: Option<SwitchConfig>,
    /// Enable every user port before the first step.
    #[serde(default = "default_enable_ports")]
    pub enable_ports: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_enable_ports() -> bool {
    true
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("malformed scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsw_hal::HwVariant;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_yaml(
            r#"
description: two ports in a filtering bridge
switch:
  variant: gsw1xx
steps:
  - op: bridge_join
    port: 1
    bridge: 7
    vlan_filtering: true
  - op: vlan_add
    port: 1
    vid: 10
    pvid: true
  - op: stp_state
    port: 1
    state: forwarding
  - op: fdb_add
    port: 1
    mac: "00:11:22:33:44:55"
"#,
        )
        .unwrap();

        assert_eq!(scenario.switch.map(|c| c.variant), Some(HwVariant::Gsw1xx));
        assert!(scenario.enable_ports);
        assert_eq!(
            scenario.steps[1],
            Step::VlanAdd {
                port: 1,
                vid: 10,
                untagged: false,
                pvid: true
            }
        );
        assert_eq!(
            scenario.steps[2],
            Step::StpState {
                port: 1,
                state: StpState::Forwarding
            }
        );
        assert_eq!(scenario.steps[3].to_string(), "fdb_add 1 00:11:22:33:44:55");
    }

    #[test]
    fn test_unknown_op_rejected() {
        let err = Scenario::from_yaml("steps:\n  - op: reboot\n").unwrap_err();
        assert!(err.to_string().contains("malformed scenario"));
    }

    #[test]
    fn test_bad_mac_rejected() {
        let yaml = "steps:\n  - op: fdb_add\n    port: 1\n    mac: nope\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }
}
