//! Platform — the actuation and sensing capability behind an agent.
//!
//! A Controller owns exactly one platform in a [`PlatformSlot`]. Algorithms
//! only ever see a [`PlatformRef`], a non-owning handle that stops
//! resolving once the Controller replaces or drops the platform.

use crate::status::{PlatformStatus, StatusCode};
use crate::types::{AgentId, MoveOutcome, Pose, ReferenceFrame, Sensors};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Capability interface to actuation and sensing.
pub trait Platform: Send {
    /// Registered name of this platform (e.g. `simulated`).
    fn name(&self) -> &str;

    /// Refresh sensed state. Called from the monitor phase.
    fn sense(&mut self) -> StatusCode;

    /// Platform-side analysis. Called at the start of the analyze phase.
    fn analyze(&mut self) -> StatusCode {
        StatusCode::OK
    }

    /// Request a move toward `target`; `epsilon` is the arrival tolerance.
    fn move_to(&mut self, target: &Pose, epsilon: f64) -> MoveOutcome;

    /// Reference frame positions are reported in.
    fn frame(&self) -> ReferenceFrame {
        ReferenceFrame::Cartesian
    }

    /// Default arrival tolerance for this platform.
    fn accuracy(&self) -> f64 {
        0.1
    }

    fn status(&self) -> &PlatformStatus;

    /// Second phase of construction: learn which agent this is.
    fn bind(&mut self, _agent: &AgentId, _sensors: &Sensors) {}
}

/// Owning handle to the active platform.
pub type SharedPlatform = Arc<Mutex<Box<dyn Platform>>>;

/// Non-owning, rebindable handle held by algorithms.
pub type PlatformRef = Weak<Mutex<Box<dyn Platform>>>;

/// Single-owner slot for a Controller's platform.
#[derive(Default)]
pub struct PlatformSlot {
    active: Option<SharedPlatform>,
}

impl PlatformSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the prior platform, then install `platform`. Returns the new handle.
    pub fn replace(&mut self, platform: Box<dyn Platform>) -> PlatformRef {
        self.active = None;
        let shared = Arc::new(Mutex::new(platform));
        let handle = Arc::downgrade(&shared);
        self.active = Some(shared);
        handle
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn is_bound(&self) -> bool {
        self.active.is_some()
    }

    /// A non-owning handle, dangling when nothing is installed.
    pub fn handle(&self) -> PlatformRef {
        self.active.as_ref().map(Arc::downgrade).unwrap_or_default()
    }

    pub fn name(&self) -> Option<String> {
        self.active.as_ref().map(|p| p.lock().name().to_string())
    }

    /// Run `f` on the installed platform, if any.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Platform) -> R) -> Option<R> {
        self.active.as_ref().map(|p| {
            let mut guard = p.lock();
            f(&mut **guard)
        })
    }
}

/// Run `f` on the platform behind `handle`, if it is still installed.
pub fn with_platform<R>(handle: &PlatformRef, f: impl FnOnce(&mut dyn Platform) -> R) -> Option<R> {
    handle.upgrade().map(|p| {
        let mut guard = p.lock();
        f(&mut **guard)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Still {
        status: PlatformStatus,
    }

    impl Platform for Still {
        fn name(&self) -> &str {
            "still"
        }

        fn sense(&mut self) -> StatusCode {
            StatusCode::OK
        }

        fn move_to(&mut self, _target: &Pose, _epsilon: f64) -> MoveOutcome {
            MoveOutcome::Arrived
        }

        fn status(&self) -> &PlatformStatus {
            &self.status
        }
    }

    fn still() -> Box<dyn Platform> {
        Box::new(Still {
            status: PlatformStatus::for_platform("still", "agent.0"),
        })
    }

    #[test]
    fn handle_dangles_after_replacement() {
        let mut slot = PlatformSlot::new();
        assert!(with_platform(&slot.handle(), |p| p.sense()).is_none());

        let first = slot.replace(still());
        assert_eq!(with_platform(&first, |p| p.name().to_string()).as_deref(), Some("still"));

        let second = slot.replace(still());
        assert!(with_platform(&first, |p| p.sense()).is_none());
        assert!(with_platform(&second, |p| p.sense()).is_some());

        slot.clear();
        assert!(!slot.is_bound());
        assert!(second.upgrade().is_none());
    }
}
