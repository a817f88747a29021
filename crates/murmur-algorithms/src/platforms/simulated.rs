use crate::args::Args;
use murmur_core::error::Result;
use murmur_core::platform::Platform;
use murmur_core::registry::FactoryContext;
use murmur_core::status::{PlatformStatus, StatusCode, StatusFlag};
use murmur_core::types::{AgentId, KnowledgeMap, MoveOutcome, Pose, Position, Sensors};
use murmur_core::variables::{AgentVars, Kinematic};
use tracing::{debug, trace};

/// Point-mass platform moving toward its destination by `speed` each sense.
///
/// Arguments: `speed` (units per tick, default 1.0) and `start` (initial
/// position, default the origin).
pub struct SimulatedPlatform {
    vars: AgentVars,
    status: PlatformStatus,
    speed: f64,
    position: Position,
    dest: Option<Position>,
}

impl SimulatedPlatform {
    pub const NAME: &'static str = "simulated";

    pub fn new(args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Self> {
        let args = Args::new(Self::NAME, args);
        let speed = args.positive_or("speed", 1.0)?;
        let vars = AgentVars::new(ctx.store.clone(), ctx.agent.clone());
        let position = match args.position("start")? {
            Some(start) => start,
            None => vars.location().unwrap_or_default(),
        };
        vars.set_location(position);
        vars.set_vector(Kinematic::Home, position);

        let mut status = PlatformStatus::for_platform(Self::NAME, ctx.agent.as_str());
        status.set(StatusFlag::MovementAvailable, true);
        status.set(StatusFlag::SensorsAvailable, true);

        debug!(agent = %ctx.agent, speed, %position, "simulated platform ready");
        Ok(Self {
            vars,
            status,
            speed,
            position,
            dest: None,
        })
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

impl Platform for SimulatedPlatform {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sense(&mut self) -> StatusCode {
        let previous = self.position;
        if let Some(dest) = self.dest {
            let remaining = self.position.distance_to(&dest);
            self.position = if remaining <= self.speed {
                dest
            } else {
                self.position.lerp(&dest, self.speed / remaining)
            };
        }
        let velocity = Position::new(
            self.position.x - previous.x,
            self.position.y - previous.y,
            self.position.z - previous.z,
        );
        self.status.set(StatusFlag::Moving, velocity != Position::default());
        self.vars.set_location(self.position);
        self.vars.set_vector(Kinematic::Velocity, velocity);
        trace!(agent = %self.vars.id(), position = %self.position, "sensed");
        StatusCode::OK
    }

    fn move_to(&mut self, target: &Pose, epsilon: f64) -> MoveOutcome {
        if self.dest != Some(target.position) {
            self.dest = Some(target.position);
            self.vars.set_dest(target.position);
            self.vars.set_vector(Kinematic::Source, self.position);
        }
        if self.position.approximately_equal(&target.position, epsilon) {
            MoveOutcome::Arrived
        } else {
            MoveOutcome::Moving
        }
    }

    fn accuracy(&self) -> f64 {
        (self.speed / 10.0).max(0.01)
    }

    fn status(&self) -> &PlatformStatus {
        &self.status
    }

    fn bind(&mut self, agent: &AgentId, _sensors: &Sensors) {
        if agent != self.vars.id() {
            self.vars = AgentVars::new(self.vars.store().clone(), agent.clone());
            self.status = PlatformStatus::for_platform(Self::NAME, agent.as_str());
            self.status.set(StatusFlag::MovementAvailable, true);
            self.status.set(StatusFlag::SensorsAvailable, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::store::SharedStore;
    use murmur_core::types::Value;

    fn platform(store: &SharedStore, speed: f64) -> SimulatedPlatform {
        let mut args = KnowledgeMap::new();
        args.insert("speed".into(), Value::from(speed));
        args.insert("start".into(), Value::from("(0,0)"));
        SimulatedPlatform::new(&args, &FactoryContext::new(store.clone(), "agent.0".into())).unwrap()
    }

    #[test]
    fn travels_at_speed_until_arrival() {
        let store = SharedStore::new();
        let mut sim = platform(&store, 1.0);
        let target = Pose::at(Position::new(2.5, 0.0, 0.0));

        assert_eq!(sim.move_to(&target, 0.1), MoveOutcome::Moving);
        sim.sense();
        assert_eq!(sim.position(), Position::new(1.0, 0.0, 0.0));
        assert!(sim.status().get(StatusFlag::Moving));
        sim.sense();
        sim.sense();
        assert_eq!(sim.position(), Position::new(2.5, 0.0, 0.0));
        assert_eq!(sim.move_to(&target, 0.1), MoveOutcome::Arrived);

        sim.sense();
        assert!(!sim.status().get(StatusFlag::Moving));
        assert_eq!(store.get_doubles("agent.0.location"), vec![2.5, 0.0, 0.0]);
        assert_eq!(store.get_doubles("agent.0.dest"), vec![2.5, 0.0, 0.0]);
    }

    #[test]
    fn rejects_non_positive_speed() {
        let store = SharedStore::new();
        let mut args = KnowledgeMap::new();
        args.insert("speed".into(), Value::from(0.0));
        assert!(SimulatedPlatform::new(&args, &FactoryContext::new(store, "agent.0".into())).is_err());
    }
}
