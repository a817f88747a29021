//! # Murmur
//!
//! A per-agent control core for robot swarms that coordinate only through
//! a shared key/value store.
//!
//! Every agent runs one [`Controller`](murmur_runtime::controller::Controller).
//! Each tick it senses through its platform, picks up any new command from
//! the store, then runs its algorithm and accents through analyze, plan and
//! execute. Writes are buffered and flushed once per tick.
//!
//! ## Quick Start
//!
//! ```rust
//! use murmur::prelude::*;
//!
//! let store = SharedStore::new();
//! let mut controller = Controller::new(
//!     ControllerConfig::for_agent(0, 1),
//!     store.clone(),
//!     builtin_registries(),
//! );
//! controller.init_platform("null", &KnowledgeMap::new()).unwrap();
//!
//! // Command the agent through the store, as a ground station would.
//! let mut args = KnowledgeMap::new();
//! args.insert("0".into(), Value::from("(2,3)"));
//! CommandRecord::new("waypoints", args).write(&store, "agent.0");
//!
//! controller.run_ticks(2);
//! assert_eq!(controller.algorithm_name(), Some("waypoints"));
//! assert_eq!(store.get_doubles("agent.0.location"), vec![2.0, 3.0, 0.0]);
//! ```
//!
//! ## Architecture
//!
//! - [`murmur_core`] - store, status, groups, barrier, traits and registries
//! - [`murmur_runtime`] - the Controller, its configuration and log-level hooks
//! - [`murmur_algorithms`] - built-in behaviors and reference platforms
//!
//! ## Commands
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `agent.<i>.algorithm` | Algorithm for one agent |
//! | `agent.<i>.algorithm_args.*` | Its arguments |
//! | `swarm.algorithm` | Algorithm for every agent |
//! | `swarm.algorithm_args.*` | Its arguments |
//!
//! A per-agent command wins over a swarm command in the same tick. Both are
//! consumed once and recorded under `last_algorithm`.

pub use murmur_algorithms as algorithms;
pub use murmur_core as core;
pub use murmur_runtime as runtime;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use murmur::prelude::*;
/// ```
pub mod prelude {
    pub use murmur_core::prelude::*;
    pub use murmur_runtime::prelude::*;

    pub use murmur_algorithms::{
        builtin_registries, register_builtins, CoverageFormation, DebugAlgorithm, Formation,
        FormationSync, NullPlatform, SimulatedPlatform, Spell, Waypoints, ZoneCoverage,
    };
}
