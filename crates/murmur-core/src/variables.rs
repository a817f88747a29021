//! Store-backed views of per-agent and swarm-wide runtime state.
//!
//! Neither view caches anything: every accessor reads or writes the local
//! store replica, so a view is as fresh as the last applied batch.

use crate::store::SharedStore;
use crate::types::{AgentId, KnowledgeMap, Position};

/// An algorithm name plus its arguments, as written by a commander.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandRecord {
    pub algorithm: String,
    pub args: KnowledgeMap,
}

impl CommandRecord {
    pub fn new(algorithm: impl Into<String>, args: KnowledgeMap) -> Self {
        Self {
            algorithm: algorithm.into(),
            args,
        }
    }

    /// Read the pending command under `prefix`. An empty name means none.
    pub fn read(store: &SharedStore, prefix: &str) -> Option<Self> {
        let algorithm = store.get_string(&format!("{}.algorithm", prefix));
        if algorithm.is_empty() {
            return None;
        }
        let args = store.to_map_stripped(&format!("{}.algorithm_args", prefix));
        Some(Self { algorithm, args })
    }

    /// Issue this command under `prefix`, replacing any previous arguments.
    pub fn write(&self, store: &SharedStore, prefix: &str) {
        store.clear_prefix(&format!("{}.algorithm_args", prefix));
        for (key, value) in &self.args {
            store.set(format!("{}.algorithm_args.{}", prefix, key), value.clone());
        }
        store.set(format!("{}.algorithm", prefix), self.algorithm.as_str());
    }

    /// Mirror this command into `<prefix>.last_algorithm(_args)`.
    ///
    /// With `publish` unset the history stays in this replica.
    pub fn record_history(&self, store: &SharedStore, prefix: &str, publish: bool) {
        let last_args = format!("{}.last_algorithm_args", prefix);
        let last_name = format!("{}.last_algorithm", prefix);
        if publish {
            store.clear_prefix(&last_args);
            for (key, value) in &self.args {
                store.set(format!("{}.{}", last_args, key), value.clone());
            }
            store.set(last_name, self.algorithm.as_str());
        } else {
            store.clear_prefix_local(&last_args);
            for (key, value) in &self.args {
                store.set_local(format!("{}.{}", last_args, key), value.clone());
            }
            store.set_local(last_name, self.algorithm.as_str());
        }
    }

    /// Clear the command fields under `prefix`.
    ///
    /// The clear is local to this replica, so consuming a swarm command
    /// never cancels it for peers that have not seen it yet.
    pub fn clear(store: &SharedStore, prefix: &str) {
        store.clear_prefix_local(&format!("{}.algorithm_args", prefix));
        store.remove_local(&format!("{}.algorithm", prefix));
    }

    /// Mark this command consumed: mirror it into the history and clear it.
    pub fn retire(&self, store: &SharedStore, prefix: &str, publish_history: bool) {
        self.record_history(store, prefix, publish_history);
        Self::clear(store, prefix);
    }
}

/// Kinematic vectors every agent publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kinematic {
    Location,
    Velocity,
    Orientation,
    Acceleration,
    Dest,
    Source,
    Home,
}

impl Kinematic {
    pub fn key(self) -> &'static str {
        match self {
            Kinematic::Location => "location",
            Kinematic::Velocity => "velocity",
            Kinematic::Orientation => "orientation",
            Kinematic::Acceleration => "acceleration",
            Kinematic::Dest => "dest",
            Kinematic::Source => "source",
            Kinematic::Home => "home",
        }
    }
}

/// Per-agent runtime state under `<agent-prefix>`.
#[derive(Debug, Clone)]
pub struct AgentVars {
    store: SharedStore,
    id: AgentId,
}

impl AgentVars {
    pub fn new(store: SharedStore, id: AgentId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn prefix(&self) -> &str {
        self.id.as_str()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Full store key of `field` for this agent.
    pub fn key(&self, field: &str) -> String {
        format!("{}.{}", self.id, field)
    }

    // --- Commands ---

    pub fn command(&self) -> Option<CommandRecord> {
        CommandRecord::read(&self.store, self.prefix())
    }

    pub fn algorithm(&self) -> String {
        self.store.get_string(&self.key("algorithm"))
    }

    pub fn algorithm_args(&self) -> KnowledgeMap {
        self.store.to_map_stripped(&self.key("algorithm_args"))
    }

    pub fn last_algorithm(&self) -> String {
        self.store.get_string(&self.key("last_algorithm"))
    }

    pub fn last_algorithm_args(&self) -> KnowledgeMap {
        self.store.to_map_stripped(&self.key("last_algorithm_args"))
    }

    pub fn algorithm_accepts(&self) -> i64 {
        self.store.get_integer(&self.key("algorithm_accepts"))
    }

    pub fn algorithm_rejects(&self) -> i64 {
        self.store.get_integer(&self.key("algorithm_rejects"))
    }

    pub fn record_dispatch(&self, accepted: bool) {
        let field = if accepted {
            "algorithm_accepts"
        } else {
            "algorithm_rejects"
        };
        self.store.increment(&self.key(field), 1);
    }

    // --- Logging ---

    pub fn debug_level(&self) -> i64 {
        self.store.get_integer(&self.key("debug_level"))
    }

    pub fn set_debug_level(&self, level: i64) {
        self.store.set(self.key("debug_level"), level);
    }

    pub fn store_debug_level(&self) -> i64 {
        self.store.get_integer(&self.key("store_debug_level"))
    }

    pub fn set_store_debug_level(&self, level: i64) {
        self.store.set(self.key("store_debug_level"), level);
    }

    // --- Kinematics ---

    pub fn vector(&self, field: Kinematic) -> Option<Position> {
        self.store
            .get(&self.key(field.key()))
            .and_then(|v| Position::from_value(&v))
    }

    pub fn set_vector(&self, field: Kinematic, value: Position) {
        self.store.set(self.key(field.key()), value);
    }

    pub fn location(&self) -> Option<Position> {
        self.vector(Kinematic::Location)
    }

    pub fn set_location(&self, value: Position) {
        self.set_vector(Kinematic::Location, value);
    }

    pub fn dest(&self) -> Option<Position> {
        self.vector(Kinematic::Dest)
    }

    pub fn set_dest(&self, value: Position) {
        self.set_vector(Kinematic::Dest, value);
    }

    // --- Accents ---

    /// Names of the accent algorithms, in execution order.
    pub fn accents(&self) -> Vec<String> {
        let size = self.store.get_integer(&self.key("accents.size")).max(0);
        (0..size)
            .map(|i| self.store.get_string(&self.key(&format!("accents.{}", i))))
            .collect()
    }

    pub fn set_accents(&self, names: &[String]) {
        self.store.clear_prefix(&self.key("accents"));
        for (i, name) in names.iter().enumerate() {
            self.store
                .set(self.key(&format!("accents.{}", i)), name.as_str());
        }
        self.store.set(self.key("accents.size"), names.len());
    }

    // --- Rates ---

    pub fn loop_hz(&self) -> f64 {
        self.store.get_double(&self.key("loop_hz"))
    }

    pub fn set_loop_hz(&self, hz: f64) {
        self.store.set(self.key("loop_hz"), hz);
    }

    pub fn send_hz(&self) -> f64 {
        self.store.get_double(&self.key("send_hz"))
    }

    pub fn set_send_hz(&self, hz: f64) {
        self.store.set(self.key("send_hz"), hz);
    }
}

/// Swarm-wide state under `swarm`.
#[derive(Debug, Clone)]
pub struct SwarmVars {
    store: SharedStore,
}

impl SwarmVars {
    pub const PREFIX: &'static str = "swarm";

    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn key(field: &str) -> String {
        format!("{}.{}", Self::PREFIX, field)
    }

    pub fn command(&self) -> Option<CommandRecord> {
        CommandRecord::read(&self.store, Self::PREFIX)
    }

    /// Issue a swarm-wide command. Peers see it after the next flush.
    pub fn issue(&self, command: &CommandRecord) {
        command.write(&self.store, Self::PREFIX);
    }

    pub fn algorithm(&self) -> String {
        self.store.get_string(&Self::key("algorithm"))
    }

    pub fn last_algorithm(&self) -> String {
        self.store.get_string(&Self::key("last_algorithm"))
    }

    pub fn last_algorithm_args(&self) -> KnowledgeMap {
        self.store.to_map_stripped(&Self::key("last_algorithm_args"))
    }

    pub fn min_alt(&self) -> f64 {
        self.store.get_double(&Self::key("min_alt"))
    }

    pub fn set_min_alt(&self, alt: f64) {
        self.store.set(Self::key("min_alt"), alt);
    }

    pub fn size(&self) -> usize {
        self.store.get_integer(&Self::key("size")).max(0) as usize
    }

    pub fn set_size(&self, size: usize) {
        self.store.set(Self::key("size"), size);
    }
}
