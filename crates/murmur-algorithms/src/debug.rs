//! Debug behavior: logs its bindings every phase and counts executions.

use crate::args::Args;
use murmur_core::algorithm::{Algorithm, AlgorithmCore};
use murmur_core::error::Result;
use murmur_core::registry::FactoryContext;
use murmur_core::status::{StatusCode, StatusFlag};
use murmur_core::types::{KnowledgeMap, MoveOutcome, Pose, Position};
use tracing::{debug, info, warn};

/// Counts executions at a configurable key and keeps asking the platform
/// to move to (1, 2, 3).
///
/// Argument `"0"` names the counter key (default `.executions`). Keys that
/// start with `.` stay in the local replica.
pub struct DebugAlgorithm {
    core: AlgorithmCore,
    executions_key: String,
}

impl DebugAlgorithm {
    pub const NAME: &'static str = "debug";

    pub fn new(args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Self> {
        let args = Args::new(Self::NAME, args);
        let executions_key = args.string_or("0", ".executions");
        let mut core = AlgorithmCore::new(Self::NAME, ctx.store.clone(), ctx.agent.clone());
        core.set_platform(ctx.platform.clone());
        info!(agent = %ctx.agent, key = %executions_key, "debug algorithm created");
        Ok(Self {
            core,
            executions_key,
        })
    }

    pub fn executions(&self) -> i64 {
        self.core.store().get_integer(&self.executions_key)
    }

    fn log_phase(&self, phase: &str) {
        debug!(
            agent = %self.core.agent(),
            phase,
            executions = self.executions(),
            platform = self.core.has_platform(),
            sensors = self.core.sensors().len(),
            "debug algorithm"
        );
    }
}

impl Algorithm for DebugAlgorithm {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn analyze(&mut self) -> StatusCode {
        self.log_phase("analyze");
        StatusCode::OK
    }

    fn plan(&mut self) -> StatusCode {
        self.log_phase("plan");
        StatusCode::OK
    }

    fn execute(&mut self) -> StatusCode {
        let store = self.core.store();
        let next = store.get_integer(&self.executions_key) + 1;
        if self.executions_key.starts_with('.') {
            store.set_local(self.executions_key.as_str(), next);
        } else {
            store.set(self.executions_key.as_str(), next);
        }
        self.log_phase("execute");

        let target = Pose::at(Position::new(1.0, 2.0, 3.0));
        match self.core.with_platform(|p| {
            let epsilon = p.accuracy();
            p.move_to(&target, epsilon)
        }) {
            Some(outcome) => {
                self.core
                    .status_mut()
                    .set(StatusFlag::Moving, outcome == MoveOutcome::Moving);
                StatusCode::OK
            }
            None => {
                warn!(agent = %self.core.agent(), "debug algorithm has no platform to move");
                StatusCode::OK
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::store::SharedStore;
    use murmur_core::types::Value;

    #[test]
    fn counts_executions_locally_by_default() {
        let store = SharedStore::new();
        let ctx = FactoryContext::new(store.clone(), "agent.0".into());
        let mut algo = DebugAlgorithm::new(&KnowledgeMap::new(), &ctx).unwrap();
        algo.execute();
        algo.execute();
        assert_eq!(algo.executions(), 2);
        assert_eq!(store.pending_updates(), 0);
    }

    #[test]
    fn shared_counter_key() {
        let store = SharedStore::new();
        let ctx = FactoryContext::new(store.clone(), "agent.0".into());
        let mut args = KnowledgeMap::new();
        args.insert("0".into(), Value::from("agent.0.debug_runs"));
        let mut algo = DebugAlgorithm::new(&args, &ctx).unwrap();
        assert_eq!(algo.execute(), StatusCode::OK);
        assert_eq!(store.get_integer("agent.0.debug_runs"), 1);
        assert_eq!(store.pending_updates(), 1);
    }
}
