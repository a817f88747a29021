//! Run a simulated swarm in-process.
//!
//! Every agent gets its own store replica and its own thread. Replicas are
//! joined by a loopback fabric, and a separate commander replica writes the
//! configured groups and issues the swarm command, the way a ground
//! station would.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use murmur::prelude::*;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{parse_value, Config, GroupConfig, GroupKindConfig};
use crate::logging::{self, FilterHandle};

/// Command-line overrides for `murmur run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub agents: Option<usize>,
    pub ticks: Option<u64>,
    pub hz: Option<f64>,
    pub algorithm: Option<String>,
    pub args: Vec<String>,
    pub dump: bool,
    pub verbose: bool,
}

impl RunOptions {
    /// Fold the overrides into `config`. A new algorithm name drops the
    /// configured arguments; `--arg` pairs are merged on top either way.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(agents) = self.agents {
            config.swarm.agents = agents;
        }
        if let Some(ticks) = self.ticks {
            config.swarm.ticks = ticks;
        }
        if let Some(hz) = self.hz {
            config.swarm.hz = hz;
        }
        if let Some(name) = &self.algorithm {
            config.algorithm.name = name.clone();
            config.algorithm.args.clear();
        }
        for pair in &self.args {
            let (key, value) = parse_override(pair)?;
            config.algorithm.args.insert(key, value);
        }
        if self.verbose {
            config.logging.debug_level = config.logging.debug_level.max(4);
        }
        Ok(())
    }
}

/// Split a `key=value` argument.
pub fn parse_override(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => bail!("expected key=value, got {:?}", pair),
    }
}

/// What one agent looked like after its last tick.
#[derive(Debug, Clone)]
pub struct AgentSummary {
    pub id: AgentId,
    pub algorithm: Option<String>,
    pub platform: Option<String>,
    pub accents: Vec<String>,
    pub ticks: Tick,
    pub status: StatusCode,
}

/// A fully wired swarm, ready to tick.
pub struct Swarm {
    commander: SharedStore,
    controllers: Vec<Controller>,
    _fabric: Arc<LoopbackFabric>,
}

impl Swarm {
    /// Create every agent, bind platforms and accents, then publish the
    /// groups and the swarm command from the commander replica.
    pub fn build(config: &Config, sink: Option<&FilterHandle>) -> Result<Self> {
        let agents = config.swarm.agents;
        if agents == 0 {
            bail!("a swarm needs at least one agent");
        }

        let registries = builtin_registries();
        let fabric = LoopbackFabric::new();
        let commander = SharedStore::new();
        fabric.attach(&commander);

        let mut controllers = Vec::with_capacity(agents);
        for index in 0..agents {
            let store = SharedStore::new();
            fabric.attach(&store);

            let controller_config = ControllerConfig {
                agent_index: index,
                swarm_size: agents,
                loop_hz: config.swarm.hz,
                send_hz: config.swarm.send_hz,
                debug_level: config.logging.debug_level,
                store_debug_level: config.logging.store_debug_level,
            };
            let mut controller = Controller::new(controller_config, store, registries.clone());

            if config.platform.is_set() {
                controller
                    .init_platform(&config.platform.name, &config.platform.knowledge())
                    .with_context(|| format!("agent.{}: cannot create platform", index))?;
            }
            for accent in config.accents.iter().filter(|a| a.is_set()) {
                controller
                    .init_accent(&accent.name, &accent.knowledge())
                    .with_context(|| format!("agent.{}: cannot create accent", index))?;
            }
            if let Some(sink) = sink {
                controller.set_log_sink(Box::new(sink.clone()));
            }
            controllers.push(controller);
        }

        let roster: Vec<AgentId> = (0..agents).map(AgentId::from_index).collect();
        for group in &config.groups {
            write_group(&commander, group, &roster)?;
        }
        if config.algorithm.is_set() {
            let command = CommandRecord::new(config.algorithm.name.clone(), config.algorithm.knowledge());
            SwarmVars::new(commander.clone()).issue(&command);
            info!(algorithm = %config.algorithm.name, agents, "swarm command issued");
        }
        commander.flush();

        Ok(Self {
            commander,
            controllers,
            _fabric: fabric,
        })
    }

    /// The commander's replica. After [`Swarm::run`] it holds every
    /// agent's final flushed state.
    pub fn commander(&self) -> &SharedStore {
        &self.commander
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Tick every agent `ticks` times on its own thread. A positive `hz`
    /// paces each agent; zero runs flat out.
    pub fn run(&mut self, ticks: u64, hz: f64) -> Result<Vec<AgentSummary>> {
        let period = (hz > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / hz).ok())
            .flatten();
        let gate = Arc::new(std::sync::Barrier::new(self.controllers.len()));

        let handles: Vec<(AgentId, JoinHandle<AgentSummary>)> = self
            .controllers
            .drain(..)
            .map(|controller| {
                let id = controller.id().clone();
                let gate = gate.clone();
                let handle = std::thread::Builder::new()
                    .name(id.to_string())
                    .spawn(move || drive(controller, ticks, period, &gate))
                    .with_context(|| format!("failed to spawn {}", id))?;
                Ok((id, handle))
            })
            .collect::<Result<_>>()?;

        handles
            .into_iter()
            .map(|(id, handle)| {
                handle
                    .join()
                    .map_err(|_| anyhow!("agent thread {} panicked", id))
            })
            .collect()
    }
}

fn drive(
    mut controller: Controller,
    ticks: u64,
    period: Option<Duration>,
    gate: &std::sync::Barrier,
) -> AgentSummary {
    gate.wait();
    let mut status = StatusCode::OK;
    for _ in 0..ticks {
        let started = Instant::now();
        status = controller.run_once();
        if let Some(period) = period {
            if let Some(rest) = period.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }
    debug!(agent = %controller.id(), ticks, %status, "agent finished");

    AgentSummary {
        id: controller.id().clone(),
        algorithm: controller.algorithm_name().map(str::to_string),
        platform: controller.platform_name(),
        accents: controller.accent_names(),
        ticks: controller.tick(),
        status,
    }
}

fn write_group(store: &SharedStore, config: &GroupConfig, roster: &[AgentId]) -> Result<()> {
    let kind = match config.kind {
        GroupKindConfig::Fixed => GroupKind::FixedList,
        GroupKindConfig::Transient => GroupKind::Transient,
    };
    let mut group = GroupFactoryRepository::new(store.clone())
        .create_kind(kind, &config.prefix)
        .ok_or_else(|| anyhow!("no factory for group kind {:?}", kind))?;

    let members: Vec<AgentId> = if config.members.is_empty() {
        roster.to_vec()
    } else {
        config.members.iter().map(|m| AgentId::new(m.as_str())).collect()
    };
    group.clear_members();
    group.add_members(&members);
    group.write();
    debug!(group = %config.prefix, members = members.len(), "group written");
    Ok(())
}

fn status_label(status: StatusCode) -> colored::ColoredString {
    let text = status.to_string();
    if status.is_ok() {
        text.green()
    } else if status.contains(StatusCode::FAILED) || status.contains(StatusCode::UNBOUND) {
        text.red()
    } else {
        text.yellow()
    }
}

fn print_summary(commander: &SharedStore, summaries: &[AgentSummary]) {
    println!();
    println!("{} Swarm finished", "✓".green().bold());
    for summary in summaries {
        let vars = AgentVars::new(commander.clone(), summary.id.clone());
        let location = vars
            .location()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {} on {}  ticks {}  at {}  {}",
            summary.id.to_string().cyan(),
            summary.algorithm.as_deref().unwrap_or("(idle)"),
            summary.platform.as_deref().unwrap_or("(no platform)"),
            summary.ticks,
            location,
            status_label(summary.status)
        );
        if !summary.accents.is_empty() {
            println!("      accents: {}", summary.accents.join(", "));
        }
    }
}

pub fn run(options: RunOptions) -> Result<()> {
    let (mut config, path) = Config::load()?;
    options.apply(&mut config)?;
    let filter = logging::init(config.logging.debug_level, config.logging.store_debug_level);

    match &path {
        Some(path) => println!("{} Using {}", "→".blue(), path.display()),
        None => println!("{} No murmur.toml found, using defaults", "→".blue()),
    }
    println!(
        "{} Running {} agents for {} ticks...",
        "→".blue(),
        config.swarm.agents.to_string().cyan(),
        config.swarm.ticks.to_string().cyan()
    );
    if config.algorithm.is_set() {
        let args: Vec<String> = config
            .algorithm
            .args
            .iter()
            .map(|(k, v)| format!("{}={}", k, parse_value(v)))
            .collect();
        println!("  algorithm: {} {}", config.algorithm.name.yellow(), args.join(" "));
    }

    let mut swarm = Swarm::build(&config, Some(&filter))?;
    let summaries = swarm.run(config.swarm.ticks, config.swarm.hz)?;
    print_summary(swarm.commander(), &summaries);

    if options.dump {
        let snapshot = swarm.commander().to_json()?;
        println!();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}
