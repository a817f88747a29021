//! Formation sync: a group moves from `start` to `end` in formation, one
//! step at a time, with no member starting step N+1 before every member
//! has finished step N.
//!
//! Each member's slot in the formation is its index in the group as it
//! stood when the behavior was created. That index is frozen for the whole
//! sequence; later group resyncs only decide whether this agent is still
//! taking part.
//!
//! Progress is gated by a barrier with one participant per frozen member
//! (see [`LockStep`]). A member that stops reporting stalls everyone at the
//! current step; nothing here times out.

use crate::args::Args;
use crate::lockstep::{LockStep, MAX_STEPS};
use murmur_core::algorithm::{Algorithm, AlgorithmCore};
use murmur_core::error::{MurmurError, Result};
use murmur_core::group::{Group, GroupFactoryRepository};
use murmur_core::registry::FactoryContext;
use murmur_core::status::{StatusCode, StatusFlag};
use murmur_core::types::{AgentId, KnowledgeMap, MoveOutcome, Pose, Position};
use std::f64::consts::TAU;
use tracing::{info, warn};

/// Arrangement of members around the moving center point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formation {
    /// Abreast, perpendicular to the direction of travel.
    Line,
    /// Single file behind the first member.
    Column,
    /// A V with the first member at the point.
    Wedge,
    /// Evenly spaced on a circle around the center.
    Circle,
}

impl Formation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "line" => Some(Formation::Line),
            "column" => Some(Formation::Column),
            "wedge" => Some(Formation::Wedge),
            "circle" => Some(Formation::Circle),
            _ => None,
        }
    }

    /// Offset of `slot` out of `count` relative to the center, for travel
    /// along the unit vector `heading` with `buffer` between neighbors.
    pub fn offset(self, slot: usize, count: usize, buffer: f64, heading: (f64, f64)) -> (f64, f64) {
        let (hx, hy) = heading;
        let (px, py) = (-hy, hx);
        let slot_f = slot as f64;
        match self {
            Formation::Line => {
                let along = (slot_f - (count as f64 - 1.0) / 2.0) * buffer;
                (px * along, py * along)
            }
            Formation::Column => (-hx * slot_f * buffer, -hy * slot_f * buffer),
            Formation::Wedge => {
                let rank = ((slot + 1) / 2) as f64;
                let side = if slot % 2 == 1 { 1.0 } else { -1.0 };
                (
                    -hx * rank * buffer + px * side * rank * buffer,
                    -hy * rank * buffer + py * side * rank * buffer,
                )
            }
            Formation::Circle => {
                if count < 2 {
                    return (0.0, 0.0);
                }
                let radius = (buffer * count as f64 / TAU).max(buffer);
                let angle = TAU * slot_f / count as f64;
                (radius * angle.cos(), radius * angle.sin())
            }
        }
    }
}

fn heading(start: &Position, end: &Position) -> (f64, f64) {
    let (dx, dy) = (end.x - start.x, end.y - start.y);
    let length = (dx * dx + dy * dy).sqrt();
    if length < f64::EPSILON {
        (1.0, 0.0)
    } else {
        (dx / length, dy / length)
    }
}

/// Every member's target for every step: `table[step][slot]`.
pub fn formation_table(
    start: &Position,
    end: &Position,
    steps: usize,
    formation: Formation,
    buffer: f64,
    count: usize,
) -> Vec<Vec<Position>> {
    let heading = heading(start, end);
    (0..=steps)
        .map(|step| {
            let center = start.lerp(end, step as f64 / steps.max(1) as f64);
            (0..count)
                .map(|slot| {
                    let (dx, dy) = formation.offset(slot, count, buffer, heading);
                    center.offset(dx, dy, 0.0)
                })
                .collect()
        })
        .collect()
}

/// Lock-step group traversal.
///
/// Arguments: `group` (required group prefix), `start` and `end`
/// (required positions), `formation` (`line`, `column`, `wedge` or
/// `circle`; default `line`), `buffer` (spacing, default 2.0), `steps`
/// (default 4, at most [`MAX_STEPS`]) and `barrier` (default
/// `barrier.formation_sync.<group>`).
pub struct FormationSync {
    core: AlgorithmCore,
    lock: LockStep,
    table: Vec<Vec<Position>>,
}

impl FormationSync {
    pub const NAME: &'static str = "formation sync";

    pub fn new(args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Self> {
        let args = Args::new(Self::NAME, args);
        let group_prefix = args.require_string("group")?;
        let start = args.require_position("start")?;
        let end = args.require_position("end")?;
        let formation_name = args.string_or("formation", "line");
        let formation = Formation::parse(&formation_name).ok_or_else(|| {
            MurmurError::invalid_argument(
                Self::NAME,
                "formation",
                formation_name.as_str(),
                "expected line, column, wedge or circle",
            )
        })?;
        let buffer = args.positive_or("buffer", 2.0)?;
        let steps = args.count_or("steps", 4, MAX_STEPS)?;
        let barrier_name =
            args.string_or("barrier", &format!("barrier.formation_sync.{}", group_prefix));

        let group = GroupFactoryRepository::new(ctx.store.clone())
            .create(&group_prefix)
            .ok_or_else(|| MurmurError::UnknownGroup(group_prefix.clone()))?;
        let count = group.members().len();
        let table = formation_table(&start, &end, steps, formation, buffer, count);
        let lock = LockStep::new(&ctx.store, group, &ctx.agent, &barrier_name, None, steps);

        let mut core = AlgorithmCore::new(Self::NAME, ctx.store.clone(), ctx.agent.clone());
        core.set_platform(ctx.platform.clone());
        if lock.index().is_none() {
            core.status_mut().set(StatusFlag::Paused, true);
        }

        info!(
            agent = %ctx.agent,
            group = %group_prefix,
            members = count,
            index = ?lock.index(),
            steps,
            "formation sync created"
        );

        Ok(Self { core, lock, table })
    }

    /// Step currently being flown.
    pub fn step(&self) -> usize {
        self.lock.step()
    }

    pub fn last_step(&self) -> usize {
        self.lock.last_step()
    }

    /// Frozen slot of this agent.
    pub fn index(&self) -> Option<usize> {
        self.lock.index()
    }

    /// Members as frozen at creation.
    pub fn members(&self) -> &[AgentId] {
        self.lock.members()
    }

    pub fn is_participating(&self) -> bool {
        self.lock.is_participating()
    }

    /// This agent's target for the current step.
    pub fn target(&self) -> Option<Position> {
        let index = self.lock.index()?;
        self.table.get(self.lock.step())?.get(index).copied()
    }

    /// Whether every member has finished the final step.
    pub fn is_finished(&self) -> bool {
        self.lock.is_finished()
    }
}

impl Algorithm for FormationSync {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn analyze(&mut self) -> StatusCode {
        self.lock.poll(self.core.status_mut());
        StatusCode::OK
    }

    fn plan(&mut self) -> StatusCode {
        self.lock.advance(self.core.status_mut());
        StatusCode::OK
    }

    fn execute(&mut self) -> StatusCode {
        if !self.lock.is_participating() {
            return StatusCode::OK;
        }
        let Some(target) = self.target() else {
            return StatusCode::OK;
        };

        let outcome = self.core.with_platform(|p| {
            let epsilon = p.accuracy();
            p.move_to(&Pose::at(target), epsilon)
        });
        match outcome {
            None => {
                warn!(agent = %self.core.agent(), step = self.lock.step(), "formation sync: no platform bound");
                self.core.status_mut().set(StatusFlag::MovementAvailable, false);
                StatusCode::UNBOUND
            }
            Some(MoveOutcome::Moving) => {
                let status = self.core.status_mut();
                status.mark_recovered();
                status.set(StatusFlag::MovementAvailable, true);
                status.set(StatusFlag::Moving, true);
                StatusCode::OK
            }
            Some(MoveOutcome::Arrived) => {
                let status = self.core.status_mut();
                status.mark_recovered();
                status.set(StatusFlag::MovementAvailable, true);
                status.set(StatusFlag::Moving, false);
                if self.lock.arrive() {
                    StatusCode::OK
                } else {
                    StatusCode::WAITING
                }
            }
            Some(MoveOutcome::Error) => {
                self.core.status_mut().mark_failed();
                StatusCode::FAILED
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_centered_and_perpendicular() {
        let offsets: Vec<(f64, f64)> = (0..3)
            .map(|i| Formation::Line.offset(i, 3, 2.0, (1.0, 0.0)))
            .collect();
        assert_eq!(offsets, vec![(-0.0, -2.0), (-0.0, 0.0), (-0.0, 2.0)]);
    }

    #[test]
    fn column_trails_the_leader() {
        assert_eq!(Formation::Column.offset(0, 3, 1.5, (0.0, 1.0)), (-0.0, -0.0));
        assert_eq!(Formation::Column.offset(2, 3, 1.5, (0.0, 1.0)), (-0.0, -3.0));
    }

    #[test]
    fn wedge_alternates_sides() {
        let left = Formation::Wedge.offset(1, 3, 1.0, (1.0, 0.0));
        let right = Formation::Wedge.offset(2, 3, 1.0, (1.0, 0.0));
        assert_eq!(left, (-1.0, 1.0));
        assert_eq!(right, (-1.0, -1.0));
    }

    #[test]
    fn table_spans_start_to_end() {
        let start = Position::new(0.0, 0.0, 5.0);
        let end = Position::new(10.0, 0.0, 5.0);
        let table = formation_table(&start, &end, 2, Formation::Column, 1.0, 2);
        assert_eq!(table.len(), 3);
        assert_eq!(table[0][0], start);
        assert_eq!(table[1][0], Position::new(5.0, 0.0, 5.0));
        assert_eq!(table[2][1], Position::new(9.0, 0.0, 5.0));
    }

    #[test]
    fn unknown_formation_is_rejected() {
        assert_eq!(Formation::parse("blob"), None);
        assert_eq!(Formation::parse("circle"), Some(Formation::Circle));
    }
}
