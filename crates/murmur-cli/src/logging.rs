//! Subscriber setup and the bridge from Controller debug levels to the
//! active filter.

use murmur::prelude::{level_directive, LogLevelSink, LogTarget};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Level applied to everything outside the murmur crates.
const OTHER_CRATES: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Levels {
    controller: i64,
    store: i64,
}

/// Filter directive string for a pair of levels.
pub fn filter_spec(controller: i64, store: i64) -> String {
    format!(
        "{},{}={},{}={}",
        OTHER_CRATES,
        LogTarget::Controller.module(),
        level_directive(controller),
        LogTarget::Store.module(),
        level_directive(store)
    )
}

/// Shared handle onto the reloadable filter. Every Controller gets a clone.
#[derive(Clone)]
pub struct FilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    levels: Arc<Mutex<Levels>>,
}

impl FilterHandle {
    fn apply(&self, levels: Levels) {
        let spec = filter_spec(levels.controller, levels.store);
        match EnvFilter::try_new(&spec) {
            Ok(filter) => {
                if let Err(e) = self.handle.reload(filter) {
                    eprintln!("failed to reload log filter: {}", e);
                }
            }
            Err(e) => eprintln!("invalid log filter {:?}: {}", spec, e),
        }
    }
}

impl LogLevelSink for FilterHandle {
    fn set_level(&self, target: LogTarget, level: i64) {
        let levels = {
            let mut levels = self.levels.lock();
            let slot = match target {
                LogTarget::Controller => &mut levels.controller,
                LogTarget::Store => &mut levels.store,
            };
            if *slot == level {
                return;
            }
            *slot = level;
            *levels
        };
        self.apply(levels);
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, overrides the
/// initial levels until a Controller reports a change.
pub fn init(controller: i64, store: i64) -> FilterHandle {
    let initial = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_spec(controller, store)))
        .unwrap_or_else(|_| EnvFilter::new(OTHER_CRATES));
    let (filter, handle) = reload::Layer::new(initial);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();

    FilterHandle {
        handle,
        levels: Arc::new(Mutex::new(Levels { controller, store })),
    }
}
