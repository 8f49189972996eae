//! Text and JSON rendering of switch state.

use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use gsw_core::{ConfigStatus, FdbDumpEntry, GswStats, GswSwitch, SlotSnapshot};
use gsw_hal::RegisterBackend;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Result of one replayed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: String,
    pub config_status: ConfigStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepOutcome>,
    pub slots: SlotSnapshot,
    pub stats: GswStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fdb: Option<FdbReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FdbReport {
    pub port: u8,
    pub entries: Vec<FdbDumpEntry>,
}

impl Report {
    pub fn collect<B: RegisterBackend>(gsw: &GswSwitch<B>, steps: Vec<StepOutcome>) -> Self {
        Self {
            version: gsw.version().to_string(),
            config_status: gsw.config_status(),
            steps,
            slots: gsw.slot_snapshot(),
            stats: gsw.stats(),
            fdb: None,
        }
    }

    pub fn with_fdb(mut self, port: u8, entries: Vec<FdbDumpEntry>) -> Self {
        self.fdb = Some(FdbReport { port, entries });
        self
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "switch:  {}", self.version);
        let _ = writeln!(out, "config:  {}", self.config_status);

        if !self.steps.is_empty() {
            let _ = writeln!(out, "\nsteps:");
            for outcome in &self.steps {
                match &outcome.error {
                    None => {
                        let _ = writeln!(out, "  ok    {}", outcome.step);
                    }
                    Some(err) => {
                        let _ = writeln!(out, "  FAIL  {}: {}", outcome.step, err);
                    }
                }
            }
        }

        let _ = writeln!(
            out,
            "\nslots: {} of {} shared in use",
            self.slots.occupancy(),
            self.slots.capacity - self.slots.reserved
        );
        for slot in &self.slots.slots {
            let _ = writeln!(
                out,
                "  {:>2}  {:<6} vid {:<4} fid {}",
                slot.index,
                slot.bridge.to_string(),
                slot.vid,
                slot.fid
            );
        }

        let _ = writeln!(out, "\nports:");
        for (port, binding) in self.slots.ports.iter().enumerate() {
            match binding.bridge {
                Some(bridge) => {
                    let _ = writeln!(
                        out,
                        "  {}  {} filtering={}",
                        port, bridge, binding.vlan_filtering
                    );
                }
                None => {
                    let _ = writeln!(out, "  {}  standalone", port);
                }
            }
        }

        if let Some(fdb) = &self.fdb {
            let _ = writeln!(out, "\nfdb port {}: {} entries", fdb.port, fdb.entries.len());
            for entry in &fdb.entries {
                let kind = if entry.is_static { "static" } else { "dynamic" };
                let _ = writeln!(out, "  {}  vid {}  {}", entry.mac, entry.vid, kind);
            }
        }

        let s = &self.stats;
        let _ = writeln!(
            out,
            "\nstats: transactions={} timeouts={} allocated={} released={} aged={}",
            s.transactions, s.timeouts, s.slots_allocated, s.slots_released, s.fdb_aged
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsw_core::{BridgeId, SwitchConfig};
    use gsw_hal::HwVariant;
    use gsw_sim::SimSwitch;

    fn report() -> Report {
        let sim = SimSwitch::new(HwVariant::Xrx200);
        let gsw = GswSwitch::attach(sim, SwitchConfig::new(HwVariant::Xrx200)).unwrap();
        gsw.setup().unwrap();
        gsw.port_bridge_join(1, BridgeId(3), false).unwrap();
        let steps = vec![
            StepOutcome {
                step: "bridge_join 1 br3 filtering=false".to_string(),
                error: None,
            },
            StepOutcome {
                step: "vlan_add 2 vid 5 untagged=false pvid=false".to_string(),
                error: Some("not supported".to_string()),
            },
        ];
        Report::collect(&gsw, steps)
    }

    #[test]
    fn test_text_report() {
        let text = report().render(OutputFormat::Text).unwrap();
        assert!(text.contains("switch:  GSWIP 2.1"));
        assert!(text.contains("slots: 1 of 57 shared in use"));
        assert!(text.contains("   7  br3    vid 0    fid 7"));
        assert!(text.contains("  1  br3 filtering=false"));
        assert!(text.contains("  FAIL  vlan_add 2"));
    }

    #[test]
    fn test_json_report() {
        let json = report().render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["slots"]["slots"][0]["fid"], 7);
        assert_eq!(value["steps"][1]["error"], "not supported");
        assert!(value.get("fdb").is_none());
    }
}
