//! Spell: a group traces text, three agents per character.
//!
//! Members are taken from the group in list order. Characters are drawn on
//! a 3x5 stroke grid; each character's stroke is split into three
//! contiguous pieces and the character's three agents trace one piece each,
//! one grid point per step, behind a shared barrier. Spaces take a cell but
//! no agents.
//!
//! The text lies flat: `origin` is the upper-left corner of the first
//! character, letters flow along +x and downwards along -y.

use crate::args::Args;
use crate::lockstep::LockStep;
use murmur_core::algorithm::{Algorithm, AlgorithmCore};
use murmur_core::error::{MurmurError, Result};
use murmur_core::group::{Group, GroupFactoryRepository};
use murmur_core::registry::FactoryContext;
use murmur_core::status::{StatusCode, StatusFlag};
use murmur_core::types::{AgentId, KnowledgeMap, MoveOutcome, Pose, Position};
use tracing::{info, warn};

/// Agents assigned to each non-blank character.
pub const AGENTS_PER_CHAR: usize = 3;

/// Stroke path of `c` as `xy` grid points, `x` in 0..=2 left to right and
/// `y` in 0..=4 top to bottom. `None` for unsupported characters.
fn stroke(c: char) -> Option<&'static str> {
    let path = match c.to_ascii_uppercase() {
        'A' => "04 01 10 21 24 22 02",
        'B' => "04 00 10 21 12 02 12 23 14 04",
        'C' => "20 00 04 24",
        'D' => "04 00 10 21 23 14 04",
        'E' => "20 00 02 12 02 04 24",
        'F' => "20 00 02 12 02 04",
        'G' => "20 00 04 24 22 12",
        'H' => "00 04 02 22 20 24",
        'I' => "00 20 10 14 04 24",
        'J' => "00 20 23 14 04 03",
        'K' => "00 04 02 20 02 24",
        'L' => "00 04 24",
        'M' => "04 00 12 20 24",
        'N' => "04 00 24 20",
        'O' => "00 20 24 04 00",
        'P' => "04 00 20 22 02",
        'Q' => "13 24 04 00 20 24",
        'R' => "04 00 20 22 02 24",
        'S' => "20 00 02 22 24 04",
        'T' => "00 20 10 14",
        'U' => "00 04 24 20",
        'V' => "00 14 20",
        'W' => "00 04 12 24 20",
        'X' => "00 24 12 20 04",
        'Y' => "00 12 20 12 14",
        'Z' => "00 20 04 24",
        '0' => "00 20 24 04 00 24",
        '1' => "01 10 14 04 24",
        '2' => "00 20 22 02 04 24",
        '3' => "00 20 22 02 22 24 04",
        '4' => "00 02 22 20 24",
        '5' => "20 00 02 22 24 04",
        '6' => "20 00 04 24 22 02",
        '7' => "00 20 24",
        '8' => "00 20 24 04 00 02 22",
        '9' => "22 02 00 20 24 04",
        ' ' => "",
        _ => return None,
    };
    Some(path)
}

fn grid_points(path: &str) -> Vec<(u32, u32)> {
    path.split_whitespace()
        .filter_map(|token| {
            let mut digits = token.chars().filter_map(|c| c.to_digit(10));
            Some((digits.next()?, digits.next()?))
        })
        .collect()
}

/// Letter cell geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lettering {
    pub origin: Position,
    pub height: f64,
    pub width: f64,
    pub buffer: f64,
}

impl Lettering {
    fn place(&self, cell: usize, (gx, gy): (u32, u32)) -> Position {
        let left = cell as f64 * (self.width + self.buffer);
        self.origin.offset(
            left + gx as f64 / 2.0 * self.width,
            -(gy as f64) / 4.0 * self.height,
            0.0,
        )
    }
}

/// Path of every participant, in member order: three per non-blank
/// character, at most `available` in total.
pub fn spell_paths(text: &str, lettering: &Lettering, available: usize) -> Result<Vec<Vec<Position>>> {
    let mut paths = Vec::new();
    for (cell, c) in text.chars().enumerate() {
        let path = stroke(c).ok_or_else(|| {
            MurmurError::invalid_argument(Spell::NAME, "text", text, format!("cannot spell {:?}", c))
        })?;
        let points: Vec<Position> = grid_points(path)
            .into_iter()
            .map(|p| lettering.place(cell, p))
            .collect();
        let Some(last) = points.last().copied() else {
            continue;
        };
        let chunk = points.len().div_ceil(AGENTS_PER_CHAR);
        for piece in 0..AGENTS_PER_CHAR {
            let from = (piece * chunk).min(points.len());
            let to = ((piece + 1) * chunk).min(points.len());
            let part = if from < to { points[from..to].to_vec() } else { vec![last] };
            paths.push(part);
        }
    }
    paths.truncate(available);
    Ok(paths)
}

/// Lock-step text formation.
///
/// Arguments: `group` (required), `text` (required; letters, digits and
/// spaces), `origin` (default `(0,0)`), `height` (default 8.0), `width`
/// (default 4.0), `buffer` between letters (default 2.0) and `barrier`
/// (default `barrier.spell.<group>`).
pub struct Spell {
    core: AlgorithmCore,
    lock: LockStep,
    paths: Vec<Vec<Position>>,
}

impl Spell {
    pub const NAME: &'static str = "spell";

    pub fn new(args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Self> {
        let args = Args::new(Self::NAME, args);
        let group_prefix = args.require_string("group")?;
        let text = args.require_string("text")?;
        let lettering = Lettering {
            origin: args.position("origin")?.unwrap_or_else(|| Position::new(0.0, 0.0, 0.0)),
            height: args.positive_or("height", 8.0)?,
            width: args.positive_or("width", 4.0)?,
            buffer: args.positive_or("buffer", 2.0)?,
        };
        let barrier_name = args.string_or("barrier", &format!("barrier.spell.{}", group_prefix));

        let group = GroupFactoryRepository::new(ctx.store.clone())
            .create(&group_prefix)
            .ok_or_else(|| MurmurError::UnknownGroup(group_prefix.clone()))?;
        let available = group.members().len();
        let paths = spell_paths(&text, &lettering, available)?;
        let needed = text.chars().filter(|c| *c != ' ').count() * AGENTS_PER_CHAR;
        if needed > available {
            warn!(
                group = %group_prefix,
                needed,
                available,
                "not enough members to spell every character"
            );
        }
        let last_step = paths.iter().map(Vec::len).max().unwrap_or(1).saturating_sub(1);
        let lock = LockStep::new(&ctx.store, group, &ctx.agent, &barrier_name, Some(paths.len()), last_step);

        let mut core = AlgorithmCore::new(Self::NAME, ctx.store.clone(), ctx.agent.clone());
        core.set_platform(ctx.platform.clone());
        if lock.index().is_none() {
            core.status_mut().set(StatusFlag::Paused, true);
        }

        info!(
            agent = %ctx.agent,
            group = %group_prefix,
            text = %text,
            participants = paths.len(),
            index = ?lock.index(),
            "spell created"
        );

        Ok(Self { core, lock, paths })
    }

    pub fn step(&self) -> usize {
        self.lock.step()
    }

    pub fn last_step(&self) -> usize {
        self.lock.last_step()
    }

    pub fn index(&self) -> Option<usize> {
        self.lock.index()
    }

    pub fn members(&self) -> &[AgentId] {
        self.lock.members()
    }

    pub fn is_finished(&self) -> bool {
        self.lock.is_finished()
    }

    /// This agent's target for the current step. Short pieces hold their end.
    pub fn target(&self) -> Option<Position> {
        let path = self.paths.get(self.lock.index()?)?;
        path.get(self.lock.step()).or_else(|| path.last()).copied()
    }
}

impl Algorithm for Spell {
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
                warn!(agent = %self.core.agent(), step = self.lock.step(), "spell: no platform bound");
                self.core.status_mut().set(StatusFlag::MovementAvailable, false);
                StatusCode::UNBOUND
            }
            Some(MoveOutcome::Error) => {
                self.core.status_mut().mark_failed();
                StatusCode::FAILED
            }
            Some(outcome) => {
                let status = self.core.status_mut();
                status.mark_recovered();
                status.set(StatusFlag::MovementAvailable, true);
                status.set(StatusFlag::Moving, outcome == MoveOutcome::Moving);
                if outcome == MoveOutcome::Moving || self.lock.arrive() {
                    StatusCode::OK
                } else {
                    StatusCode::WAITING
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lettering() -> Lettering {
        Lettering {
            origin: Position::new(0.0, 0.0, 0.0),
            height: 8.0,
            width: 4.0,
            buffer: 2.0,
        }
    }

    #[test]
    fn every_glyph_parses_on_the_grid() {
        for c in ('A'..='Z').chain('0'..='9') {
            let path = stroke(c).unwrap();
            let points = grid_points(path);
            assert!(points.len() >= 3, "{} has too few points", c);
            assert_eq!(points.len(), path.split_whitespace().count());
            assert!(points.iter().all(|(x, y)| *x <= 2 && *y <= 4), "{} leaves the grid", c);
        }
    }

    #[test]
    fn l_gives_each_agent_one_corner() {
        let paths = spell_paths("L", &lettering(), 3).unwrap();
        assert_eq!(
            paths,
            vec![
                vec![Position::new(0.0, 0.0, 0.0)],
                vec![Position::new(0.0, -8.0, 0.0)],
                vec![Position::new(4.0, -8.0, 0.0)],
            ]
        );
    }

    #[test]
    fn spaces_take_a_cell_but_no_agents() {
        let paths = spell_paths("L L", &lettering(), 9).unwrap();
        assert_eq!(paths.len(), 6);
        assert_eq!(paths[3], vec![Position::new(12.0, 0.0, 0.0)]);
    }

    #[test]
    fn short_group_spells_a_prefix() {
        let paths = spell_paths("HI", &lettering(), 4).unwrap();
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn unsupported_characters_are_rejected() {
        let err = spell_paths("HI!", &lettering(), 9).unwrap_err();
        assert!(matches!(err, MurmurError::InvalidArgument { .. }));
    }
}
