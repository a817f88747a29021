//! Waypoints behavior: visit a list of positions in order.

use crate::args::Args;
use murmur_core::algorithm::{Algorithm, AlgorithmCore};
use murmur_core::error::Result;
use murmur_core::registry::FactoryContext;
use murmur_core::status::{StatusCode, StatusFlag};
use murmur_core::types::{KnowledgeMap, MoveOutcome, Pose, Position};
use tracing::{debug, info, warn};

/// Visits the positions given as arguments `"0"`, `"1"`, ... in order and
/// stays at the last one.
pub struct Waypoints {
    core: AlgorithmCore,
    waypoints: Vec<Position>,
    current: usize,
}

impl Waypoints {
    pub const NAME: &'static str = "waypoints";

    pub fn new(args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Self> {
        let waypoints = Args::new(Self::NAME, args).indexed_positions()?;
        if waypoints.is_empty() {
            warn!(agent = %ctx.agent, "waypoints created without any waypoints");
        }
        let mut core = AlgorithmCore::new(Self::NAME, ctx.store.clone(), ctx.agent.clone());
        core.set_platform(ctx.platform.clone());
        info!(agent = %ctx.agent, count = waypoints.len(), "waypoints created");
        Ok(Self {
            core,
            waypoints,
            current: 0,
        })
    }

    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    /// Index of the waypoint being travelled to.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.waypoints.len()
    }
}

impl Algorithm for Waypoints {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn execute(&mut self) -> StatusCode {
        let Some(target) = self.waypoints.get(self.current).copied() else {
            return StatusCode::OK;
        };

        let outcome = self.core.with_platform(|p| {
            let epsilon = p.accuracy();
            p.move_to(&Pose::at(target), epsilon)
        });
        let agent = self.core.agent().clone();
        let status = self.core.status_mut();
        match outcome {
            None => {
                warn!(agent = %agent, waypoint = self.current, "waypoints: no platform bound, cannot move");
                status.set(StatusFlag::MovementAvailable, false);
                StatusCode::UNBOUND
            }
            Some(MoveOutcome::Arrived) => {
                status.mark_recovered();
                status.set(StatusFlag::MovementAvailable, true);
                status.set(StatusFlag::Moving, false);
                debug!(agent = %agent, waypoint = self.current, "waypoint reached");
                self.current += 1;
                StatusCode::OK
            }
            Some(MoveOutcome::Moving) => {
                status.mark_recovered();
                status.set(StatusFlag::MovementAvailable, true);
                status.set(StatusFlag::Moving, true);
                StatusCode::OK
            }
            Some(MoveOutcome::Error) => {
                status.mark_failed();
                warn!(agent = %agent, %target, "platform refused move");
                StatusCode::FAILED
            }
        }
    }
}
