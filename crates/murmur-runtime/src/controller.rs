//! Controller — the per-agent tick scheduler.
//!
//! A Controller owns at most one primary algorithm, at most one platform
//! and an ordered list of accents. Each call to [`Controller::run_once`]
//! is one tick:
//!
//! 1. take the store's exclusive scope
//! 2. **monitor**: platform sense
//! 3. **analyze**: platform analyze, command intake, debug-level
//!    reconciliation, then algorithm and accents
//! 4. **plan**: algorithm, then accents
//! 5. **execute**: algorithm, then accents
//! 6. release the scope and flush buffered writes as one batch
//!
//! Nothing in a tick is fatal. Missing bindings and unknown names are
//! logged where they are found and the tick carries on.

use crate::config::ControllerConfig;
use crate::logging::{LogLevelSink, LogTarget};
use murmur_core::algorithm::{Algorithm, AlgorithmBindings};
use murmur_core::error::{FactoryKind, MurmurError, Result};
use murmur_core::platform::{Platform, PlatformSlot};
use murmur_core::registry::{FactoryContext, Registries};
use murmur_core::status::StatusCode;
use murmur_core::store::SharedStore;
use murmur_core::types::{AgentId, KnowledgeMap, Sensors, Tick};
use murmur_core::variables::{AgentVars, CommandRecord, SwarmVars};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// The per-agent scheduler.
pub struct Controller {
    config: ControllerConfig,
    id: AgentId,
    store: SharedStore,
    registries: Arc<Registries>,

    platform: PlatformSlot,
    algorithm: Option<Box<dyn Algorithm>>,
    accents: Vec<Box<dyn Algorithm>>,

    sensors: Arc<Sensors>,
    agents: Arc<Vec<AgentId>>,
    self_vars: AgentVars,
    swarm_vars: SwarmVars,

    log_sink: Option<Box<dyn LogLevelSink>>,
    applied_debug_level: i64,
    applied_store_debug_level: i64,

    tick: Tick,
}

impl Controller {
    /// Create a Controller for the agent described by `config`.
    ///
    /// Publishes the agent's initial runtime state (debug levels, rates,
    /// empty accent list) and the swarm size into `store`.
    pub fn new(config: ControllerConfig, store: SharedStore, registries: Arc<Registries>) -> Self {
        let id = config.agent_id();
        let self_vars = AgentVars::new(store.clone(), id.clone());
        let swarm_vars = SwarmVars::new(store.clone());

        self_vars.set_debug_level(config.debug_level);
        self_vars.set_store_debug_level(config.store_debug_level);
        self_vars.set_loop_hz(config.loop_hz);
        self_vars.set_send_hz(config.send_hz);
        self_vars.set_accents(&[]);
        swarm_vars.set_size(config.swarm_size);

        info!(agent = %id, swarm_size = config.swarm_size, "controller created");

        Self {
            applied_debug_level: config.debug_level,
            applied_store_debug_level: config.store_debug_level,
            agents: Arc::new(config.roster()),
            config,
            id,
            store,
            registries,
            platform: PlatformSlot::new(),
            algorithm: None,
            accents: Vec::new(),
            sensors: Arc::new(Sensors::new()),
            self_vars,
            swarm_vars,
            log_sink: None,
            tick: 0,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn self_vars(&self) -> &AgentVars {
        &self.self_vars
    }

    pub fn swarm_vars(&self) -> &SwarmVars {
        &self.swarm_vars
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn algorithm(&self) -> Option<&dyn Algorithm> {
        self.algorithm.as_deref()
    }

    pub fn algorithm_name(&self) -> Option<&str> {
        self.algorithm.as_ref().map(|a| a.name())
    }

    pub fn has_platform(&self) -> bool {
        self.platform.is_bound()
    }

    pub fn platform_name(&self) -> Option<String> {
        self.platform.name()
    }

    /// Accent names in execution order.
    pub fn accent_names(&self) -> Vec<String> {
        self.accents.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn accent_count(&self) -> usize {
        self.accents.len()
    }

    pub fn sensors(&self) -> &Sensors {
        &self.sensors
    }

    // --- Configuration ---

    /// Replace the sensor map and rebind every algorithm to it.
    pub fn set_sensors(&mut self, sensors: Sensors) {
        self.sensors = Arc::new(sensors);
        self.rebind_all();
    }

    /// Replace the swarm roster handed to factories.
    pub fn set_agents(&mut self, agents: Vec<AgentId>) {
        self.agents = Arc::new(agents);
    }

    /// Install the receiver for debug-level changes and push the current
    /// levels to it.
    pub fn set_log_sink(&mut self, sink: Box<dyn LogLevelSink>) {
        sink.set_level(LogTarget::Controller, self.applied_debug_level);
        sink.set_level(LogTarget::Store, self.applied_store_debug_level);
        self.log_sink = Some(sink);
    }

    fn bindings(&self) -> AlgorithmBindings {
        AlgorithmBindings {
            platform: self.platform.handle(),
            sensors: self.sensors.clone(),
            agent: self.id.clone(),
        }
    }

    fn factory_context(&self) -> FactoryContext {
        FactoryContext {
            store: self.store.clone(),
            platform: self.platform.handle(),
            sensors: self.sensors.clone(),
            agent: self.id.clone(),
            agents: self.agents.clone(),
        }
    }

    fn rebind_all(&mut self) {
        let bindings = self.bindings();
        if let Some(algorithm) = self.algorithm.as_mut() {
            algorithm.bind(bindings.clone());
        }
        for accent in &mut self.accents {
            accent.bind(bindings.clone());
        }
    }

    // --- Ticking ---

    /// Run one tick and return the OR of every phase's status.
    pub fn run_once(&mut self) -> StatusCode {
        let store = self.store.clone();
        let result = {
            let _scope = store.lock();
            let mut result = self.monitor();
            result |= self.analyze();
            result |= self.plan();
            result |= self.execute();
            self.publish_status();
            result
        };

        let sent = store.flush();
        self.tick += 1;
        trace!(agent = %self.id, tick = self.tick, sent, status = %result, "tick complete");
        result
    }

    /// Run `ticks` ticks back to back; returns the OR of their statuses.
    pub fn run_ticks(&mut self, ticks: u64) -> StatusCode {
        let mut result = StatusCode::OK;
        for _ in 0..ticks {
            result |= self.run_once();
        }
        result
    }

    /// Platform sense. Without a platform this contributes nothing.
    pub fn monitor(&mut self) -> StatusCode {
        match self.platform.with(|p| p.sense()) {
            Some(status) => status,
            None => {
                debug!(agent = %self.id, "monitor: no platform bound, skipping sense");
                StatusCode::OK
            }
        }
    }

    /// Platform analyze, command intake, then algorithm and accents.
    pub fn analyze(&mut self) -> StatusCode {
        let mut result = match self.platform.with(|p| p.analyze()) {
            Some(status) => status,
            None => {
                debug!(agent = %self.id, "analyze: no platform bound");
                StatusCode::OK
            }
        };

        result |= self.system_analyze();

        match self.algorithm.as_mut() {
            Some(algorithm) => result |= algorithm.analyze(),
            None => debug!(agent = %self.id, "analyze: no algorithm bound"),
        }
        for accent in &mut self.accents {
            accent.analyze();
        }
        result
    }

    pub fn plan(&mut self) -> StatusCode {
        let mut result = StatusCode::OK;
        match self.algorithm.as_mut() {
            Some(algorithm) => result |= algorithm.plan(),
            None => debug!(agent = %self.id, "plan: no algorithm bound"),
        }
        for accent in &mut self.accents {
            accent.plan();
        }
        result
    }

    pub fn execute(&mut self) -> StatusCode {
        let mut result = StatusCode::OK;
        match self.algorithm.as_mut() {
            Some(algorithm) => result |= algorithm.execute(),
            None => debug!(agent = %self.id, "execute: no algorithm bound"),
        }
        for accent in &mut self.accents {
            accent.execute();
        }
        result
    }

    fn publish_status(&self) {
        if let Some(algorithm) = &self.algorithm {
            algorithm.status().publish(&self.store);
        }
        for accent in &self.accents {
            accent.status().publish(&self.store);
        }
        self.platform.with(|p| p.status().publish(&self.store));
    }

    // --- Command intake ---

    /// Consume pending commands and reconcile debug levels.
    fn system_analyze(&mut self) -> StatusCode {
        if let Some(command) = self.self_vars.command() {
            info!(agent = %self.id, algorithm = %command.algorithm, "processing agent command");
            self.dispatch(&command);
            command.retire(&self.store, self.id.as_str(), true);
        } else if let Some(command) = self.swarm_vars.command() {
            info!(agent = %self.id, algorithm = %command.algorithm, "processing swarm command");
            self.dispatch(&command);
            command.record_history(&self.store, self.id.as_str(), true);
            command.retire(&self.store, SwarmVars::PREFIX, false);
        }

        self.reconcile_debug_levels();
        StatusCode::OK
    }

    fn dispatch(&mut self, command: &CommandRecord) {
        let accepted = self.init_algorithm(&command.algorithm, &command.args).is_ok();
        self.self_vars.record_dispatch(accepted);
    }

    fn reconcile_debug_levels(&mut self) {
        let shared = self.self_vars.debug_level();
        if shared != self.applied_debug_level {
            info!(agent = %self.id, from = self.applied_debug_level, to = shared, "debug level changed");
            self.applied_debug_level = shared;
            if let Some(sink) = &self.log_sink {
                sink.set_level(LogTarget::Controller, shared);
            }
        }

        let shared = self.self_vars.store_debug_level();
        if shared != self.applied_store_debug_level {
            info!(agent = %self.id, from = self.applied_store_debug_level, to = shared, "store debug level changed");
            self.applied_store_debug_level = shared;
            if let Some(sink) = &self.log_sink {
                sink.set_level(LogTarget::Store, shared);
            }
        }
    }

    /// Debug level most recently applied from the store.
    pub fn applied_debug_level(&self) -> i64 {
        self.applied_debug_level
    }

    pub fn applied_store_debug_level(&self) -> i64 {
        self.applied_store_debug_level
    }

    // --- Installation ---

    /// Build `name` from the algorithm registry and make it the primary
    /// algorithm. On failure the current algorithm stays in place.
    pub fn init_algorithm(&mut self, name: &str, args: &KnowledgeMap) -> Result<()> {
        match self.registries.algorithms.create(name, args, &self.factory_context()) {
            Ok(algorithm) => {
                info!(agent = %self.id, algorithm = name, "algorithm initialized");
                self.install_algorithm(algorithm);
                Ok(())
            }
            Err(e) => {
                warn!(agent = %self.id, algorithm = name, "failed to create algorithm: {}", e);
                Err(e)
            }
        }
    }

    /// Replace the primary algorithm with a pre-built instance.
    pub fn install_algorithm(&mut self, mut algorithm: Box<dyn Algorithm>) {
        if let Some(old) = self.algorithm.take() {
            debug!(agent = %self.id, algorithm = old.name(), "dropping previous algorithm");
        }
        algorithm.bind(self.bindings());
        self.algorithm = Some(algorithm);
    }

    /// Drop the primary algorithm, if any.
    pub fn clear_algorithm(&mut self) {
        self.algorithm = None;
    }

    /// Build `name` from the platform registry and install it. On failure
    /// the current platform stays in place.
    pub fn init_platform(&mut self, name: &str, args: &KnowledgeMap) -> Result<()> {
        match self.registries.platforms.create(name, args, &self.factory_context()) {
            Ok(platform) => {
                info!(agent = %self.id, platform = name, "platform initialized");
                self.install_platform(platform);
                Ok(())
            }
            Err(e) => {
                warn!(agent = %self.id, platform = name, "failed to create platform: {}", e);
                Err(e)
            }
        }
    }

    /// Replace the platform with a pre-built instance and point every
    /// algorithm at it. Handles to the previous platform stop resolving.
    pub fn install_platform(&mut self, mut platform: Box<dyn Platform>) {
        platform.bind(&self.id, &self.sensors);
        self.platform.replace(platform);
        self.rebind_all();
    }

    /// Build `name` and append it to the accent list.
    pub fn init_accent(&mut self, name: &str, args: &KnowledgeMap) -> Result<()> {
        if name.is_empty() {
            warn!(agent = %self.id, "accent name is empty");
            return Err(MurmurError::EmptyName(FactoryKind::Algorithm));
        }
        match self.registries.algorithms.create(name, args, &self.factory_context()) {
            Ok(mut accent) => {
                info!(agent = %self.id, accent = name, "accent added");
                accent.bind(self.bindings());
                self.accents.push(accent);
                self.publish_accents();
                Ok(())
            }
            Err(e) => {
                warn!(agent = %self.id, accent = name, "failed to create accent: {}", e);
                Err(e)
            }
        }
    }

    /// Append a pre-built accent.
    pub fn install_accent(&mut self, mut accent: Box<dyn Algorithm>) {
        accent.bind(self.bindings());
        self.accents.push(accent);
        self.publish_accents();
    }

    /// Drop every accent. Safe to call repeatedly.
    pub fn clear_accents(&mut self) {
        if !self.accents.is_empty() {
            debug!(agent = %self.id, count = self.accents.len(), "clearing accents");
        }
        self.accents.clear();
        self.publish_accents();
    }

    fn publish_accents(&self) {
        self.self_vars.set_accents(&self.accent_names());
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("tick", &self.tick)
            .field("algorithm", &self.algorithm_name())
            .field("platform", &self.platform_name())
            .field("accents", &self.accent_names())
            .finish()
    }
}
