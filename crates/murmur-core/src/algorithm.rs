//! Algorithm — a pluggable behavior driven by the Controller each tick.
//!
//! Construction happens through a factory and only needs the argument map
//! and the store. Collaborators (platform, sensors, agent identity) are
//! bound afterwards with [`Algorithm::bind`] and may be rebound at any
//! time; an algorithm must never assume its platform is still installed.

use crate::platform::{with_platform, Platform, PlatformRef};
use crate::status::{AlgorithmStatus, StatusCode};
use crate::store::SharedStore;
use crate::types::{AgentId, Sensors};
use crate::variables::AgentVars;
use std::sync::{Arc, Weak};

/// Collaborators handed to an algorithm after construction.
#[derive(Clone)]
pub struct AlgorithmBindings {
    pub platform: PlatformRef,
    pub sensors: Arc<Sensors>,
    pub agent: AgentId,
}

/// State every algorithm carries: identity, store handle, status record
/// and non-owning collaborator handles.
pub struct AlgorithmCore {
    name: String,
    store: SharedStore,
    status: AlgorithmStatus,
    platform: PlatformRef,
    sensors: Arc<Sensors>,
    agent: AgentId,
}

impl AlgorithmCore {
    pub fn new(name: impl Into<String>, store: SharedStore, agent: AgentId) -> Self {
        let name = name.into();
        Self {
            status: AlgorithmStatus::for_algorithm(&name, agent.as_str()),
            name,
            store,
            platform: Weak::new(),
            sensors: Arc::new(Sensors::new()),
            agent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn agent_vars(&self) -> AgentVars {
        AgentVars::new(self.store.clone(), self.agent.clone())
    }

    pub fn sensors(&self) -> &Sensors {
        &self.sensors
    }

    pub fn status(&self) -> &AlgorithmStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut AlgorithmStatus {
        &mut self.status
    }

    /// Write the status record to the store.
    pub fn publish_status(&self) {
        self.status.publish(&self.store);
    }

    pub fn bind(&mut self, bindings: AlgorithmBindings) {
        if bindings.agent != self.agent {
            self.status = AlgorithmStatus::for_algorithm(&self.name, bindings.agent.as_str());
            self.agent = bindings.agent;
        }
        self.platform = bindings.platform;
        self.sensors = bindings.sensors;
    }

    pub fn set_platform(&mut self, platform: PlatformRef) {
        self.platform = platform;
    }

    pub fn has_platform(&self) -> bool {
        self.platform.strong_count() > 0
    }

    /// Run `f` on the bound platform, or `None` if it is gone.
    pub fn with_platform<R>(&self, f: impl FnOnce(&mut dyn Platform) -> R) -> Option<R> {
        with_platform(&self.platform, f)
    }
}

/// Capability interface of a behavior.
pub trait Algorithm: Send {
    fn core(&self) -> &AlgorithmCore;

    fn core_mut(&mut self) -> &mut AlgorithmCore;

    fn analyze(&mut self) -> StatusCode {
        StatusCode::OK
    }

    fn plan(&mut self) -> StatusCode {
        StatusCode::OK
    }

    fn execute(&mut self) -> StatusCode;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn status(&self) -> &AlgorithmStatus {
        self.core().status()
    }

    fn bind(&mut self, bindings: AlgorithmBindings) {
        self.core_mut().bind(bindings);
    }

    fn set_platform(&mut self, platform: PlatformRef) {
        self.core_mut().set_platform(platform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformSlot;
    use crate::status::{PlatformStatus, StatusFlag};
    use crate::types::{MoveOutcome, Pose};

    struct Counter {
        core: AlgorithmCore,
        moves: usize,
    }

    impl Algorithm for Counter {
        fn core(&self) -> &AlgorithmCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut AlgorithmCore {
            &mut self.core
        }

        fn execute(&mut self) -> StatusCode {
            match self.core.with_platform(|p| p.move_to(&Pose::default(), 0.1)) {
                Some(_) => {
                    self.moves += 1;
                    StatusCode::OK
                }
                None => StatusCode::UNBOUND,
            }
        }
    }

    struct Instant(PlatformStatus);

    impl Platform for Instant {
        fn name(&self) -> &str {
            "instant"
        }
        fn sense(&mut self) -> StatusCode {
            StatusCode::OK
        }
        fn move_to(&mut self, _target: &Pose, _epsilon: f64) -> MoveOutcome {
            MoveOutcome::Arrived
        }
        fn status(&self) -> &PlatformStatus {
            &self.0
        }
    }

    #[test]
    fn rebinding_follows_platform_replacement() {
        let store = SharedStore::new();
        let mut algo = Counter {
            core: AlgorithmCore::new("counter", store.clone(), "agent.0".into()),
            moves: 0,
        };
        assert_eq!(algo.execute(), StatusCode::UNBOUND);

        let mut slot = PlatformSlot::new();
        let handle = slot.replace(Box::new(Instant(PlatformStatus::for_platform("instant", "agent.0"))));
        algo.bind(AlgorithmBindings {
            platform: handle,
            sensors: Arc::new(Sensors::new()),
            agent: "agent.0".into(),
        });
        assert_eq!(algo.execute(), StatusCode::OK);

        slot.replace(Box::new(Instant(PlatformStatus::for_platform("instant", "agent.0"))));
        assert_eq!(algo.execute(), StatusCode::UNBOUND);
        assert_eq!(algo.moves, 1);

        algo.set_platform(slot.handle());
        assert_eq!(algo.execute(), StatusCode::OK);
    }

    #[test]
    fn status_scope_follows_agent() {
        let store = SharedStore::new();
        let mut core = AlgorithmCore::new("debug", store.clone(), "agent.0".into());
        core.bind(AlgorithmBindings {
            platform: Weak::new(),
            sensors: Arc::new(Sensors::new()),
            agent: "agent.4".into(),
        });
        core.status_mut().set(StatusFlag::Paused, true);
        core.publish_status();
        assert_eq!(store.get_integer("debug.agent.4.paused"), 1);
    }
}
