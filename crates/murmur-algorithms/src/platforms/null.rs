use murmur_core::platform::Platform;
use murmur_core::registry::FactoryContext;
use murmur_core::status::{PlatformStatus, StatusCode, StatusFlag};
use murmur_core::types::{AgentId, MoveOutcome, Pose, Sensors};
use murmur_core::variables::AgentVars;

/// A platform that is wherever it was last told to be.
pub struct NullPlatform {
    vars: AgentVars,
    status: PlatformStatus,
}

impl NullPlatform {
    pub const NAME: &'static str = "null";

    pub fn new(ctx: &FactoryContext) -> Self {
        let mut status = PlatformStatus::for_platform(Self::NAME, ctx.agent.as_str());
        status.set(StatusFlag::MovementAvailable, true);
        Self {
            vars: AgentVars::new(ctx.store.clone(), ctx.agent.clone()),
            status,
        }
    }
}

impl Platform for NullPlatform {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sense(&mut self) -> StatusCode {
        StatusCode::OK
    }

    fn move_to(&mut self, target: &Pose, _epsilon: f64) -> MoveOutcome {
        self.vars.set_dest(target.position);
        self.vars.set_location(target.position);
        MoveOutcome::Arrived
    }

    fn status(&self) -> &PlatformStatus {
        &self.status
    }

    fn bind(&mut self, agent: &AgentId, _sensors: &Sensors) {
        if agent != self.vars.id() {
            self.vars = AgentVars::new(self.vars.store().clone(), agent.clone());
            self.status = PlatformStatus::for_platform(Self::NAME, agent.as_str());
            self.status.set(StatusFlag::MovementAvailable, true);
        }
    }
}
