//! `chassis` command-line tool.
//!
//! Loads a device tree and entity topology, then inspects or drives the
//! chassis entities. Only the built-in and mock drivers are linked in, so the
//! tool runs against simulated hardware described by the documents.

use anyhow::{Context, Result, anyhow};
use chassis_core::{EntityState, ResetType};
use chassis_hardware::driver::DriverRegistry;
use chassis_hardware::drivers::register_builtin;
use chassis_hardware::mock::MockBench;
use chassis_hardware::{Entity, EntityId, Platform, PlatformConfig};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Inspect and control chassis entities
#[derive(Parser, Debug)]
#[command(name = "chassis")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Platform configuration file (JSON)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Device-tree document, overrides the configuration
    #[arg(long)]
    device_tree: Option<PathBuf>,

    /// Entity topology document, overrides the configuration
    #[arg(long)]
    entities: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List entities with presence, state and resources
    Inventory {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Initialise one entity, or every fixed entity
    Init {
        /// Entity name, e.g. fan_tray-1
        entity: Option<String>,
    },
    /// Reset an entity
    Reset {
        entity: String,
        #[arg(value_enum, default_value = "cold")]
        kind: ResetKind,
    },
    /// Switch an entity's power
    Power {
        entity: String,
        #[arg(value_enum)]
        state: PowerState,
    },
    /// Read the fault status of an entity
    Fault { entity: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResetKind {
    Warm,
    Cold,
}

impl From<ResetKind> for ResetType {
    fn from(kind: ResetKind) -> Self {
        match kind {
            ResetKind::Warm => ResetType::Warm,
            ResetKind::Cold => ResetType::Cold,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PowerState {
    On,
    Off,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<PlatformConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PlatformConfig::default(),
    };
    if let Some(path) = &args.device_tree {
        config.device_tree = path.clone();
    }
    if let Some(path) = &args.entities {
        config.entities = path.clone();
    }
    // commands decide themselves what to initialise
    config.init_fixed_entities = false;
    Ok(config)
}

fn drivers() -> Result<DriverRegistry> {
    let mut drivers = DriverRegistry::new();
    register_builtin(&mut drivers)?;
    MockBench::new().install(&mut drivers)?;
    Ok(drivers)
}

fn lookup(platform: &Platform, name: &str) -> Result<EntityId> {
    platform
        .entity_by_name(name)
        .ok_or_else(|| anyhow!("no entity named '{name}'"))
}

fn presence(platform: &Platform, entity: &Entity) -> String {
    match platform.presence_get(entity.id()) {
        Ok(true) => "present".into(),
        Ok(false) => "absent".into(),
        Err(e) => format!("unknown ({e})"),
    }
}

fn inventory(platform: &Platform, as_json: bool) -> Result<()> {
    if as_json {
        let mut entities = Vec::new();
        for entity in platform.entities() {
            let mut resources = Vec::new();
            platform.for_each_resource(entity.id(), |r| {
                resources.push(json!({
                    "name": r.name(),
                    "alias": r.alias(),
                    "type": r.resource_type(),
                }));
            })?;
            entities.push(json!({
                "name": entity.name(),
                "type": entity.entity_type(),
                "instance": entity.instance(),
                "presence": presence(platform, entity),
                "state": entity.state(),
                "info": entity.info_snapshot(),
                "resources": resources,
            }));
        }
        println!("{}", serde_json::to_string_pretty(&entities)?);
        return Ok(());
    }

    for entity in platform.entities() {
        println!(
            "{:<20} {:<13} {:<10} {}",
            entity.name(),
            entity.entity_type().to_string(),
            presence(platform, entity),
            entity.state()
        );
        platform.for_each_resource(entity.id(), |r| {
            println!(
                "    {:<16} {:<20} {}",
                r.alias().unwrap_or("-"),
                r.resource_type().to_string(),
                r.name()
            );
        })?;
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let platform = Platform::bootstrap(&config, drivers()?).context("platform start-up failed")?;
    info!(entities = platform.entities().count(), "platform loaded");

    match args.command {
        Command::Inventory { json } => inventory(&platform, json)?,
        Command::Init { entity: Some(name) } => {
            let id = lookup(&platform, &name)?;
            platform.entity_init(id)?;
            println!("{name}: {}", platform.entity_state(id)?);
        }
        Command::Init { entity: None } => {
            platform.init_fixed_entities()?;
            for entity in platform.entities() {
                if entity.state() == EntityState::Initialized {
                    println!("{}: {}", entity.name(), entity.state());
                }
            }
        }
        Command::Reset { entity, kind } => {
            let id = lookup(&platform, &entity)?;
            platform.entity_reset(id, kind.into())?;
            println!("{entity}: {} reset done", ResetType::from(kind));
        }
        Command::Power { entity, state } => {
            let id = lookup(&platform, &entity)?;
            platform.entity_power_status_control(id, matches!(state, PowerState::On))?;
            println!("{entity}: power {state:?}");
        }
        Command::Fault { entity } => {
            let id = lookup(&platform, &entity)?;
            let fault = platform.fault_status_get(id)?;
            println!("{entity}: {}", if fault { "fault" } else { "ok" });
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
