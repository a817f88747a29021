//! # Murmur Algorithms
//!
//! Built-in behaviors and reference platforms.
//!
//! | Name | Aliases | Kind |
//! |------|---------|------|
//! | `debug` | | algorithm |
//! | `waypoints` | | algorithm |
//! | `formation sync` | `formation_sync`, `sync formation` | algorithm |
//! | `zone coverage` | `zone_coverage` | algorithm |
//! | `spell` | | algorithm |
//! | `null` | | platform |
//! | `simulated` | `sim` | platform |
//!
//! [`builtin_registries`] returns a process registry with all of them.

pub mod args;
pub mod debug;
pub mod waypoints;
pub mod formation_sync;
pub mod lockstep;
pub mod spell;
pub mod zone_coverage;
pub mod platforms;

pub use debug::DebugAlgorithm;
pub use formation_sync::{Formation, FormationSync};
pub use platforms::{NullPlatform, SimulatedPlatform};
pub use spell::Spell;
pub use waypoints::Waypoints;
pub use zone_coverage::{CoverageFormation, ZoneCoverage};

use murmur_core::algorithm::Algorithm;
use murmur_core::platform::Platform;
use murmur_core::registry::Registries;
use std::sync::Arc;

/// Add every built-in algorithm and platform to `registries`.
pub fn register_builtins(registries: &mut Registries) {
    let algorithms = &mut registries.algorithms;
    algorithms.register(DebugAlgorithm::NAME, &[], |args, ctx| {
        Ok(Box::new(DebugAlgorithm::new(args, ctx)?) as Box<dyn Algorithm>)
    });
    algorithms.register(Waypoints::NAME, &[], |args, ctx| {
        Ok(Box::new(Waypoints::new(args, ctx)?) as Box<dyn Algorithm>)
    });
    algorithms.register(
        FormationSync::NAME,
        &["formation_sync", "sync formation"],
        |args, ctx| Ok(Box::new(FormationSync::new(args, ctx)?) as Box<dyn Algorithm>),
    );
    algorithms.register(Spell::NAME, &[], |args, ctx| {
        Ok(Box::new(Spell::new(args, ctx)?) as Box<dyn Algorithm>)
    });
    algorithms.register(ZoneCoverage::NAME, &["zone_coverage"], |args, ctx| {
        Ok(Box::new(ZoneCoverage::new(args, ctx)?) as Box<dyn Algorithm>)
    });

    let platforms = &mut registries.platforms;
    platforms.register(NullPlatform::NAME, &[], |_args, ctx| {
        Ok(Box::new(NullPlatform::new(ctx)) as Box<dyn Platform>)
    });
    platforms.register(SimulatedPlatform::NAME, &["sim"], |args, ctx| {
        Ok(Box::new(SimulatedPlatform::new(args, ctx)?) as Box<dyn Platform>)
    });
}

/// A shared registry holding every built-in.
pub fn builtin_registries() -> Arc<Registries> {
    let mut registries = Registries::new();
    register_builtins(&mut registries);
    registries.shared()
}
