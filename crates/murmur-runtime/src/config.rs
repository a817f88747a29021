//! Controller configuration.

use murmur_core::types::AgentId;
use serde::{Deserialize, Serialize};

/// Parameters of one agent's Controller.
///
/// Rates are hints published for drivers and peers; the Controller itself
/// only ticks when called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Index of this agent; its id is `agent.<index>` (default: 0).
    #[serde(default)]
    pub agent_index: usize,
    /// Number of agents in the swarm (default: 1).
    #[serde(default = "default_swarm_size")]
    pub swarm_size: usize,
    /// Intended tick rate in Hz (default: 1.0).
    #[serde(default = "default_hz")]
    pub loop_hz: f64,
    /// Intended flush rate in Hz; non-positive means "every tick" (default: -1.0).
    #[serde(default = "default_send_hz")]
    pub send_hz: f64,
    /// Controller and behavior log level, 0 (off) to 6 (default: 3).
    #[serde(default = "default_debug_level")]
    pub debug_level: i64,
    /// Store and transport log level (default: 2).
    #[serde(default = "default_store_debug_level")]
    pub store_debug_level: i64,
}

fn default_swarm_size() -> usize { 1 }
fn default_hz() -> f64 { 1.0 }
fn default_send_hz() -> f64 { -1.0 }
fn default_debug_level() -> i64 { 3 }
fn default_store_debug_level() -> i64 { 2 }

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            agent_index: 0,
            swarm_size: default_swarm_size(),
            loop_hz: default_hz(),
            send_hz: default_send_hz(),
            debug_level: default_debug_level(),
            store_debug_level: default_store_debug_level(),
        }
    }
}

impl ControllerConfig {
    /// Configuration for agent `index` of a swarm of `swarm_size`.
    pub fn for_agent(index: usize, swarm_size: usize) -> Self {
        Self {
            agent_index: index,
            swarm_size,
            ..Self::default()
        }
    }

    pub fn agent_id(&self) -> AgentId {
        AgentId::from_index(self.agent_index)
    }

    /// Ids of every agent in the swarm, in index order.
    pub fn roster(&self) -> Vec<AgentId> {
        (0..self.swarm_size).map(AgentId::from_index).collect()
    }
}
