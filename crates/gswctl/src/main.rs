//! gswctl - drive the GSWIP switch layer against a simulated switch
//!
//! Builds a switch on top of the register model, runs the setup sequence and
//! replays host operations from a scenario file, then reports the resulting
//! VLAN slot layout, MAC table and counters.

mod report;
mod scenario;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gsw_core::{GswSwitch, SwitchConfig};
use gsw_hal::HwVariant;
use gsw_sim::SimSwitch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use report::{OutputFormat, Report, StepOutcome};
use scenario::Scenario;

/// GSWIP switch simulator and scenario runner
#[derive(Parser, Debug)]
#[command(name = "gswctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Switch configuration file (YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Switch family when no configuration file is given
    #[arg(long, default_value = "xrx200")]
    variant: String,

    /// Report format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the setup sequence and report the initial state
    Setup,
    /// Replay a scenario file
    Replay {
        scenario: PathBuf,
        /// Continue after a failed step
        #[arg(short = 'k', long)]
        keep_going: bool,
    },
    /// Replay a scenario, then dump the MAC table entries of one port
    DumpFdb {
        /// Port whose entries are listed
        #[arg(short = 'p', long)]
        port: u8,
        /// Scenario to replay first
        #[arg(short = 's', long)]
        scenario: Option<PathBuf>,
    },
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("invalid log level '{}'", level))?;
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("failed to set tracing subscriber")
}

fn load_config(args: &Args) -> Result<SwitchConfig> {
    match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Ok(SwitchConfig::from_yaml(&text)
                .with_context(|| format!("in {}", path.display()))?)
        }
        None => {
            let Some(variant) = HwVariant::parse(&args.variant) else {
                bail!("unknown switch variant '{}'", args.variant);
            };
            Ok(SwitchConfig::new(variant))
        }
    }
}

/// Attaches a fresh simulated switch and runs the setup sequence.
fn bring_up(config: SwitchConfig) -> Result<GswSwitch<SimSwitch>> {
    let sim = SimSwitch::new(config.variant);
    let gsw = GswSwitch::attach(sim, config).context("attach failed")?;
    gsw.setup().context("setup failed")?;
    Ok(gsw)
}

fn enable_user_ports(gsw: &GswSwitch<SimSwitch>) -> Result<()> {
    for port in (0..gsw.config().max_ports()).filter(|p| *p != gsw.cpu_port()) {
        gsw.port_enable(port, None)
            .with_context(|| format!("failed to enable port {}", port))?;
    }
    Ok(())
}

/// Runs every step; stops at the first failure unless `keep_going`.
fn replay(gsw: &GswSwitch<SimSwitch>, scenario: &Scenario, keep_going: bool) -> Result<Vec<StepOutcome>> {
    if scenario.enable_ports {
        enable_user_ports(gsw)?;
    }

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        let result = step.apply(gsw);
        let failed = result.is_err();
        if let Err(err) = &result {
            warn!("step '{}' failed: {}", step, err);
        }
        outcomes.push(StepOutcome {
            step: step.to_string(),
            error: result.err().map(|err| err.to_string()),
        });
        if failed && !keep_going {
            break;
        }
    }
    Ok(outcomes)
}

fn run_scenario(
    args: &Args,
    path: &Path,
    keep_going: bool,
) -> Result<(GswSwitch<SimSwitch>, Vec<StepOutcome>)> {
    let scenario = Scenario::load(path)?;
    if let Some(description) = &scenario.description {
        info!("scenario: {}", description);
    }
    let config = match scenario.switch.clone() {
        Some(config) => config,
        None => load_config(args)?,
    };
    let gsw = bring_up(config)?;
    let outcomes = replay(&gsw, &scenario, keep_going)?;
    Ok((gsw, outcomes))
}

fn run(args: &Args) -> Result<bool> {
    let (report, ok) = match &args.command {
        Command::Setup => {
            let gsw = bring_up(load_config(args)?)?;
            (Report::collect(&gsw, Vec::new()), true)
        }
        Command::Replay {
            scenario,
            keep_going,
        } => {
            let (gsw, outcomes) = run_scenario(args, scenario, *keep_going)?;
            let ok = outcomes.iter().all(|outcome| outcome.error.is_none());
            (Report::collect(&gsw, outcomes), ok)
        }
        Command::DumpFdb { port, scenario } => {
            let (gsw, outcomes) = match scenario {
                Some(path) => run_scenario(args, path, true)?,
                None => {
                    let gsw = bring_up(load_config(args)?)?;
                    enable_user_ports(&gsw)?;
                    (gsw, Vec::new())
                }
            };
            let entries = gsw
                .fdb_entries(*port)
                .with_context(|| format!("FDB dump of port {} failed", port))?;
            (Report::collect(&gsw, outcomes).with_fdb(*port, entries), true)
        }
    };

    println!("{}", report.render(args.format)?);
    Ok(ok)
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = init_logging(&args.log_level, args.log_json) {
        eprintln!("gswctl: {:#}", err);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            warn!("scenario finished with failed steps");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DEMO: &str = include_str!("../scenarios/bridge_demo.yaml");

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["gswctl", "-f", "json", "dump-fdb", "--port", "2"]).unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert!(matches!(args.command, Command::DumpFdb { port: 2, scenario: None }));
    }

    #[test]
    fn test_unknown_variant() {
        let args = Args::try_parse_from(["gswctl", "--variant", "rtl8365", "setup"]).unwrap();
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_demo_scenario_replays_cleanly() {
        let scenario = Scenario::from_yaml(DEMO).unwrap();
        let config = scenario.switch.clone().unwrap();
        let gsw = bring_up(config).unwrap();
        let outcomes = replay(&gsw, &scenario, false).unwrap();

        assert_eq!(outcomes.len(), scenario.steps.len());
        assert!(outcomes.iter().all(|outcome| outcome.error.is_none()));
        assert_eq!(gsw.slot_snapshot().occupancy(), 3);
        assert_eq!(gsw.fdb_entries(1).unwrap().len(), 1);
    }

    #[test]
    fn test_replay_stops_at_failure() {
        let scenario = Scenario::from_yaml(
            r#"
steps:
  - op: vlan_add
    port: 2
    vid: 5
  - op: bridge_join
    port: 2
    bridge: 1
"#,
        )
        .unwrap();
        let gsw = bring_up(SwitchConfig::new(HwVariant::Xrx200)).unwrap();

        let outcomes = replay(&gsw, &scenario, false).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].error.is_some());

        let outcomes = replay(&gsw, &scenario, true).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[1].error.is_none());
    }
}
