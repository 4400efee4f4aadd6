#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timed delivery missions: generation, selection and lifecycle.
//!
//! A mission asks the viewer to reach an objective tile before a time limit
//! derived from the shortest route expires. Candidate missions are built for
//! every objective of a floor, a few candidates from the next floor are mixed
//! in once the viewer has proven itself, and a handful are offered.

mod board;
mod items;

use depths_core::{DungeonView, FloorNumber, TilePosition};
use depths_system_pathfinding::find_path;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use board::{ActiveMission, MissionBoard};
pub use items::{ItemName, ItemTable, FALLBACK_ITEM_NAME};

/// Routes with at most this many tiles are too short to be worth a mission.
pub const DEFAULT_MINIMUM_PATH_LENGTH: usize = 8;
/// Number of missions offered at once.
pub const DEFAULT_OFFER_COUNT: usize = 3;

const BASE_TIME_FACTOR: f32 = 3.0;
const TIME_FACTOR_DECAY: f32 = 0.2;
const MIN_TIME_FACTOR: f32 = 1.1;

/// How a mission ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionOutcome {
    /// The mission is offered or in progress.
    #[default]
    None,
    /// The viewer reached the target in time.
    Success,
    /// The time limit expired first.
    Failure,
}

/// Time limit and reward derived from a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissionTerms {
    /// Turns available to reach the target.
    pub time_limit: u32,
    /// Score awarded on success.
    pub score: u32,
}

/// Computes the terms of a mission whose route spans `path_length` tiles.
///
/// Deeper targets get a tighter time multiplier, from 3.0 on the first floor
/// down to 1.1, and a larger reward for both depth and descent.
#[must_use]
pub fn mission_terms(path_length: usize, start: FloorNumber, target: FloorNumber) -> MissionTerms {
    let factor =
        (BASE_TIME_FACTOR - target.get() as f32 * TIME_FACTOR_DECAY).max(MIN_TIME_FACTOR);
    let time_limit = (path_length as f32 * factor).ceil() as u32;
    let descent = target.get().saturating_sub(start.get());
    let score = target
        .get()
        .saturating_mul(5)
        .saturating_add(descent.saturating_mul(5))
        .saturating_add(time_limit / 20);
    MissionTerms { time_limit, score }
}

/// Timed errand from the viewer's tile to an objective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    name: String,
    start: TilePosition,
    target: TilePosition,
    path_length: usize,
    time_limit: u32,
    score: u32,
    outcome: MissionOutcome,
}

impl Mission {
    /// Display name, for example `"Pizza x3"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tile the viewer stood on when the mission was generated.
    #[must_use]
    pub fn start(&self) -> TilePosition {
        self.start
    }

    /// Tile the viewer must reach.
    #[must_use]
    pub fn target(&self) -> TilePosition {
        self.target
    }

    /// Number of tiles on the shortest route, both endpoints included.
    #[must_use]
    pub fn path_length(&self) -> usize {
        self.path_length
    }

    /// Turns available to reach the target.
    #[must_use]
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    /// Score awarded on success.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// How the mission ended, if it has.
    #[must_use]
    pub fn outcome(&self) -> MissionOutcome {
        self.outcome
    }
}

/// Builds candidate missions for objectives using the shortest routes.
#[derive(Clone, Debug)]
pub struct MissionGenerator {
    items: ItemTable,
    minimum_path_length: usize,
}

impl Default for MissionGenerator {
    fn default() -> Self {
        Self::new(ItemTable::default(), DEFAULT_MINIMUM_PATH_LENGTH)
    }
}

impl MissionGenerator {
    /// Creates a generator naming missions from `items` and rejecting routes
    /// with at most `minimum_path_length` tiles.
    #[must_use]
    pub fn new(items: ItemTable, minimum_path_length: usize) -> Self {
        Self {
            items,
            minimum_path_length,
        }
    }

    /// Item table used for mission names.
    #[must_use]
    pub fn items(&self) -> &ItemTable {
        &self.items
    }

    /// Builds a mission from `start` to `target`, or `None` when the target is
    /// unreachable or the route is too short.
    ///
    /// The name is drawn from `rng` only for accepted missions.
    pub fn generate_mission<R>(
        &self,
        dungeon: &DungeonView<'_>,
        start: TilePosition,
        target: TilePosition,
        rng: &mut R,
    ) -> Option<Mission>
    where
        R: Rng + ?Sized,
    {
        let path = find_path(dungeon, start, target)?;
        if path.len() <= self.minimum_path_length {
            return None;
        }

        let terms = mission_terms(path.len(), start.floor(), target.floor());
        Some(Mission {
            name: self.items.mission_name(rng, target.floor()),
            start,
            target,
            path_length: path.len(),
            time_limit: terms.time_limit,
            score: terms.score,
            outcome: MissionOutcome::None,
        })
    }

    /// Missions from `viewer` to every objective of `floor` except the viewer's own tile.
    pub fn possible_missions<R>(
        &self,
        dungeon: &DungeonView<'_>,
        floor: FloorNumber,
        viewer: TilePosition,
        rng: &mut R,
    ) -> Vec<Mission>
    where
        R: Rng + ?Sized,
    {
        let Some(view) = dungeon.floor(floor) else {
            return Vec::new();
        };

        let missions: Vec<_> = view
            .objectives()
            .iter()
            .map(|cell| TilePosition::new(floor, *cell))
            .filter(|target| *target != viewer)
            .filter_map(|target| self.generate_mission(dungeon, viewer, target, rng))
            .collect();
        debug!(
            floor = floor.get(),
            objectives = view.objectives().len(),
            missions = missions.len(),
            "possible_missions"
        );
        missions
    }
}

/// Chooses the missions to offer.
///
/// Up to `min(completed_this_floor, next.len())` missions are borrowed at
/// random from `next` and pooled with `current`; then up to `offer_count`
/// missions are drawn from the pool without replacement.
pub fn select_missions<R>(
    mut current: Vec<Mission>,
    mut next: Vec<Mission>,
    completed_this_floor: usize,
    offer_count: usize,
    rng: &mut R,
) -> Vec<Mission>
where
    R: Rng + ?Sized,
{
    let borrowed = completed_this_floor.min(next.len());
    for _ in 0..borrowed {
        current.push(take_random(&mut next, rng));
    }

    let mut offered = Vec::with_capacity(offer_count.min(current.len()));
    while offered.len() < offer_count && !current.is_empty() {
        offered.push(take_random(&mut current, rng));
    }
    offered
}

fn take_random<R>(missions: &mut Vec<Mission>, rng: &mut R) -> Mission
where
    R: Rng + ?Sized,
{
    let index = rng.gen_range(0..missions.len());
    missions.remove(index)
}

#[cfg(test)]
mod tests {
    use depths_core::{CellCoord, FloorView, TileKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn at(floor: u32, column: u32, row: u32) -> TilePosition {
        TilePosition::new(FloorNumber::new(floor), CellCoord::new(column, row))
    }

    #[test]
    fn terms_follow_reference_balance() {
        assert_eq!(
            mission_terms(10, FloorNumber::new(0), FloorNumber::new(0)),
            MissionTerms {
                time_limit: 30,
                score: 1
            }
        );
        // Factor 3.0 - 0.2 * 2 = 2.6, so 20 tiles allow 52 turns.
        assert_eq!(
            mission_terms(20, FloorNumber::new(1), FloorNumber::new(2)),
            MissionTerms {
                time_limit: 52,
                score: 10 + 5 + 2
            }
        );
        // The factor bottoms out at 1.1 from floor 10 onwards.
        assert_eq!(
            mission_terms(40, FloorNumber::new(12), FloorNumber::new(12)).time_limit,
            44
        );
    }

    #[test]
    fn short_routes_are_rejected() {
        let tiles = vec![TileKind::Empty; 100];
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &[],
        )]);
        let generator = MissionGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        // Seven steps make an eight-tile route.
        assert!(generator
            .generate_mission(&dungeon, at(0, 0, 0), at(0, 7, 0), &mut rng)
            .is_none());
        let mission = generator
            .generate_mission(&dungeon, at(0, 0, 0), at(0, 8, 0), &mut rng)
            .expect("nine-tile route is accepted");
        assert_eq!(mission.path_length(), 9);
        assert_eq!(mission.time_limit(), 27);
        assert_eq!(mission.outcome(), MissionOutcome::None);
        assert!(mission.name().contains(" x"));
    }

    #[test]
    fn rejected_candidates_leave_the_stream_untouched() {
        let tiles = vec![TileKind::Empty; 100];
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &[],
        )]);
        let generator = MissionGenerator::default();
        let mut drawn = ChaCha8Rng::seed_from_u64(5);
        let mut fresh = ChaCha8Rng::seed_from_u64(5);

        assert!(generator
            .generate_mission(&dungeon, at(0, 0, 0), at(0, 1, 0), &mut drawn)
            .is_none());
        assert_eq!(drawn.gen::<u64>(), fresh.gen::<u64>());
    }

    #[test]
    fn empty_pools_offer_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(select_missions(Vec::new(), Vec::new(), 3, 3, &mut rng).is_empty());
    }
}
