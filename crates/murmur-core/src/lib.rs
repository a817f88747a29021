//! # Murmur Core
//!
//! Core traits and types for the Murmur per-agent swarm control core.
//!
//! Agents never talk to each other directly. Every agent runs its own
//! control loop against a replica of a shared key/value store, and this
//! crate defines what that loop is made of:
//!
//! - **SharedStore**: buffered key/value replica with prefix scopes and an exclusive tick lock
//! - **Barrier**: non-blocking, round-based rendezvous over the store
//! - **Group**: named, ordered agent lists used to assign roles
//! - **AlgorithmStatus**: independent health flags published per instance
//! - **Algorithm / Platform**: the pluggable behavior and actuation interfaces
//! - **Registries**: name-to-constructor lookup for both
//!
//! ## Quick Start
//!
//! ```rust
//! use murmur_core::prelude::*;
//!
//! let store = SharedStore::new();
//! let agent = AgentVars::new(store.clone(), AgentId::from_index(0));
//! agent.set_location(Position::new(1.0, 2.0, 0.0));
//!
//! let mut barrier = Barrier::new(store, "barrier.demo", 0, 1);
//! barrier.arrive(1);
//! assert!(barrier.round_reached(1));
//! ```

pub mod types;
pub mod error;
pub mod store;
pub mod status;
pub mod barrier;
pub mod group;
pub mod platform;
pub mod algorithm;
pub mod registry;
pub mod variables;
pub mod prelude;
