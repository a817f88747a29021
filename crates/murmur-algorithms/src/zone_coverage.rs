//! Zone coverage: protectors place themselves between a group of assets
//! and a group of enemies.
//!
//! Each protector's slot is its index in the protector group. Asset and
//! enemy positions are read from their published `<agent>.location`.

use crate::args::Args;
use murmur_core::algorithm::{Algorithm, AlgorithmCore};
use murmur_core::error::{MurmurError, Result};
use murmur_core::group::{Group, GroupFactoryRepository};
use murmur_core::registry::FactoryContext;
use murmur_core::status::{StatusCode, StatusFlag};
use murmur_core::types::{AgentId, KnowledgeMap, MoveOutcome, Pose, Position};
use murmur_core::variables::AgentVars;
use tracing::{debug, info, warn};

/// Protector arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormation {
    /// A straight screen across the asset-to-enemy axis.
    Line,
    /// An arc around the asset centroid facing the enemies.
    Arc,
    /// Layers around each asset in turn, `buffer` apart.
    Onion,
}

impl CoverageFormation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "line" => Some(CoverageFormation::Line),
            "arc" => Some(CoverageFormation::Arc),
            "onion" => Some(CoverageFormation::Onion),
            _ => None,
        }
    }
}

fn centroid(points: &[Position]) -> Option<Position> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold(Position::default(), |acc, p| acc.offset(p.x, p.y, p.z));
    Some(Position::new(sum.x / n, sum.y / n, sum.z / n))
}

fn direction(from: &Position, to: &Position) -> (f64, f64) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length = (dx * dx + dy * dy).sqrt();
    if length < f64::EPSILON {
        (1.0, 0.0)
    } else {
        (dx / length, dy / length)
    }
}

/// Target of protector `index` out of `count`.
pub fn coverage_position(
    formation: CoverageFormation,
    index: usize,
    count: usize,
    assets: &[Position],
    enemies: &[Position],
    distance: f64,
    buffer: f64,
) -> Option<Position> {
    let asset_center = centroid(assets)?;
    let enemy_center = centroid(enemies)?;
    let (hx, hy) = direction(&asset_center, &enemy_center);
    let centered = index as f64 - (count as f64 - 1.0) / 2.0;

    let target = match formation {
        CoverageFormation::Line => {
            let (px, py) = (-hy, hx);
            asset_center.offset(hx * distance + px * centered * buffer, hy * distance + py * centered * buffer, 0.0)
        }
        CoverageFormation::Arc => {
            let angle = hy.atan2(hx) + centered * buffer / distance;
            asset_center.offset(distance * angle.cos(), distance * angle.sin(), 0.0)
        }
        CoverageFormation::Onion => {
            let asset = assets[index % assets.len()];
            let layer = (index / assets.len()) as f64;
            let (ax, ay) = direction(&asset, &enemy_center);
            let reach = distance + layer * buffer;
            asset.offset(ax * reach, ay * reach, 0.0)
        }
    };
    Some(target)
}

/// Arguments: `protectors`, `assets` and `enemies` (required group
/// prefixes), `formation` (`line`, `arc` or `onion`; default `line`),
/// `distance` from the assets (default 5.0) and `buffer` between
/// protectors (default 2.0).
pub struct ZoneCoverage {
    core: AlgorithmCore,
    protectors: Box<dyn Group>,
    assets: Box<dyn Group>,
    enemies: Box<dyn Group>,
    formation: CoverageFormation,
    distance: f64,
    buffer: f64,
    index: Option<usize>,
    next: Option<Position>,
}

impl ZoneCoverage {
    pub const NAME: &'static str = "zone coverage";

    pub fn new(args: &KnowledgeMap, ctx: &FactoryContext) -> Result<Self> {
        let args = Args::new(Self::NAME, args);
        let repo = GroupFactoryRepository::new(ctx.store.clone());
        let resolve = |key: &str| -> Result<Box<dyn Group>> {
            let prefix = args.require_string(key)?;
            repo.create(&prefix)
                .ok_or(MurmurError::UnknownGroup(prefix))
        };
        let protectors = resolve("protectors")?;
        let assets = resolve("assets")?;
        let enemies = resolve("enemies")?;

        let formation_name = args.string_or("formation", "line");
        let formation = CoverageFormation::parse(&formation_name).ok_or_else(|| {
            MurmurError::invalid_argument(
                Self::NAME,
                "formation",
                formation_name.as_str(),
                "expected line, arc or onion",
            )
        })?;
        let distance = args.positive_or("distance", 5.0)?;
        let buffer = args.positive_or("buffer", 2.0)?;

        let mut core = AlgorithmCore::new(Self::NAME, ctx.store.clone(), ctx.agent.clone());
        core.set_platform(ctx.platform.clone());
        let index = protectors.index_of(&ctx.agent);

        info!(
            agent = %ctx.agent,
            protectors = %protectors.prefix(),
            index = ?index,
            ?formation,
            "zone coverage created"
        );

        Ok(Self {
            core,
            protectors,
            assets,
            enemies,
            formation,
            distance,
            buffer,
            index,
            next: None,
        })
    }

    /// Position chosen by the last plan, if any.
    pub fn next_position(&self) -> Option<Position> {
        self.next
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    fn locations(&self, members: &[AgentId]) -> Vec<Position> {
        members
            .iter()
            .filter_map(|id| AgentVars::new(self.core.store().clone(), id.clone()).location())
            .collect()
    }
}

impl Algorithm for ZoneCoverage {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn analyze(&mut self) -> StatusCode {
        self.protectors.sync();
        self.assets.sync();
        self.enemies.sync();
        self.index = self.protectors.index_of(self.core.agent());
        self.core
            .status_mut()
            .set(StatusFlag::Paused, self.index.is_none());
        StatusCode::OK
    }

    fn plan(&mut self) -> StatusCode {
        let Some(index) = self.index else {
            self.next = None;
            return StatusCode::OK;
        };
        let assets = self.locations(self.assets.members());
        let enemies = self.locations(self.enemies.members());
        self.next = coverage_position(
            self.formation,
            index,
            self.protectors.size(),
            &assets,
            &enemies,
            self.distance,
            self.buffer,
        );
        let waiting = self.next.is_none();
        if waiting {
            debug!(
                agent = %self.core.agent(),
                assets = assets.len(),
                enemies = enemies.len(),
                "zone coverage waiting for asset and enemy locations"
            );
        }
        self.core.status_mut().set(StatusFlag::Waiting, waiting);
        if waiting {
            StatusCode::WAITING
        } else {
            StatusCode::OK
        }
    }

    fn execute(&mut self) -> StatusCode {
        let Some(target) = self.next else {
            return StatusCode::OK;
        };
        let outcome = self.core.with_platform(|p| {
            let epsilon = p.accuracy();
            p.move_to(&Pose::at(target), epsilon)
        });
        match outcome {
            None => {
                warn!(agent = %self.core.agent(), "zone coverage: no platform bound");
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
                StatusCode::OK
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_screens_between_asset_and_enemy() {
        let assets = [Position::new(0.0, 0.0, 0.0)];
        let enemies = [Position::new(10.0, 0.0, 0.0)];
        let a = coverage_position(CoverageFormation::Line, 0, 2, &assets, &enemies, 5.0, 2.0).unwrap();
        let b = coverage_position(CoverageFormation::Line, 1, 2, &assets, &enemies, 5.0, 2.0).unwrap();
        assert_eq!(a, Position::new(5.0, -1.0, 0.0));
        assert_eq!(b, Position::new(5.0, 1.0, 0.0));
    }

    #[test]
    fn arc_keeps_distance_from_assets() {
        let assets = [Position::new(1.0, 1.0, 0.0)];
        let enemies = [Position::new(1.0, 9.0, 0.0)];
        for index in 0..3 {
            let p = coverage_position(CoverageFormation::Arc, index, 3, &assets, &enemies, 4.0, 1.0).unwrap();
            assert!((p.distance_to(&assets[0]) - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn onion_layers_wrap_around_assets() {
        let assets = [Position::new(0.0, 0.0, 0.0), Position::new(0.0, 10.0, 0.0)];
        let enemies = [Position::new(20.0, 5.0, 0.0)];
        let inner = coverage_position(CoverageFormation::Onion, 0, 4, &assets, &enemies, 3.0, 2.0).unwrap();
        let outer = coverage_position(CoverageFormation::Onion, 2, 4, &assets, &enemies, 3.0, 2.0).unwrap();
        assert!((inner.distance_to(&assets[0]) - 3.0).abs() < 1e-9);
        assert!((outer.distance_to(&assets[0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn nothing_to_cover_without_locations() {
        let none: [Position; 0] = [];
        let assets = [Position::new(0.0, 0.0, 0.0)];
        assert!(coverage_position(CoverageFormation::Line, 0, 1, &assets, &none, 5.0, 2.0).is_none());
    }
}
