//! # Murmur Runtime
//!
//! The per-agent Controller: one tick is monitor, analyze, plan and
//! execute over a single agent's store replica, followed by a flush of
//! the writes the tick produced.
//!
//! The runtime never spawns threads and never waits. Drivers decide how
//! often `run_once` is called and on which thread.

pub mod config;
pub mod controller;
pub mod logging;
pub mod prelude;
