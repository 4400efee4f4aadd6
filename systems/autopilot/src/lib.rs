#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Intent strategy for path-following participants.
//!
//! A participant without a plan picks a random objective or stairway on its
//! floor and walks the shortest route there one tile per turn. The viewer,
//! standing on a stairway with nothing left to do, activates the tile instead;
//! other participants cannot descend and pick a new target.

use std::collections::{BTreeMap, VecDeque};

use depths_core::{
    Command, Controller, Direction, DungeonView, Event, FloorNumber, ParticipantId,
    ParticipantSnapshot, ParticipantView, Tile, TileKind, TilePosition,
};
use depths_system_pathfinding::find_path;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Pure system that turns planned routes into movement intents.
#[derive(Debug)]
pub struct Autopilot {
    rng: ChaCha8Rng,
    plans: BTreeMap<ParticipantId, VecDeque<Tile>>,
}

impl Autopilot {
    /// Creates an autopilot whose target choices derive from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            plans: BTreeMap::new(),
        }
    }

    /// Remaining route of `participant`, excluding the tile it stands on.
    #[must_use]
    pub fn plan(&self, participant: ParticipantId) -> Option<&VecDeque<Tile>> {
        self.plans.get(&participant)
    }

    /// Consumes world events and views to emit intents for the coming tick.
    pub fn handle(
        &mut self,
        events: &[Event],
        dungeon: &DungeonView<'_>,
        participants: &ParticipantView,
        current: FloorNumber,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::FloorEntered { .. } => {
                    let _ = self.plans.remove(&ParticipantId::VIEWER);
                }
                Event::FloorLeft { hidden, .. } => {
                    for participant in hidden {
                        let _ = self.plans.remove(participant);
                    }
                }
                _ => {}
            }
        }

        for participant in participants.iter().filter(|participant| {
            participant.controller == Controller::PathFollowing && participant.floor == current
        }) {
            self.steer(dungeon, participant, out);
        }
    }

    fn steer(
        &mut self,
        dungeon: &DungeonView<'_>,
        participant: &ParticipantSnapshot,
        out: &mut Vec<Command>,
    ) {
        let id = participant.id;
        let position = participant.position();

        if self.plans.get(&id).map_or(true, VecDeque::is_empty) {
            let on_stairs =
                dungeon.tile(position).map(|tile| tile.kind()) == Some(TileKind::StairsDown);
            if on_stairs && id == ParticipantId::VIEWER {
                let _ = self.plans.remove(&id);
                out.push(Command::ActivateTile { participant: id });
                return;
            }
            let Some(route) = self.plan_route(dungeon, position) else {
                return;
            };
            let _ = self.plans.insert(id, route);
        }

        let Some(plan) = self.plans.get_mut(&id) else {
            return;
        };
        let Some(next) = plan.pop_front() else {
            return;
        };

        let direction = (next.floor() == position.floor())
            .then(|| Direction::between(position.cell(), next.cell()))
            .flatten();
        match direction {
            Some(direction) => out.push(Command::SetIntent {
                participant: id,
                direction: Some(direction),
            }),
            None => {
                debug!(participant = id.get(), "autopilot_off_route");
                let _ = self.plans.remove(&id);
            }
        }
    }

    fn plan_route(
        &mut self,
        dungeon: &DungeonView<'_>,
        position: TilePosition,
    ) -> Option<VecDeque<Tile>> {
        let floor = dungeon.floor(position.floor())?;
        let candidates: Vec<_> = floor
            .objectives()
            .iter()
            .chain(floor.stairways())
            .copied()
            .filter(|cell| *cell != position.cell())
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let target = TilePosition::new(
            position.floor(),
            candidates[self.rng.gen_range(0..candidates.len())],
        );
        let Some(path) = find_path(dungeon, position, target) else {
            warn!(
                floor = position.floor().get(),
                column = target.cell().column(),
                row = target.cell().row(),
                "path_not_found"
            );
            return None;
        };

        let mut route = VecDeque::from(path);
        let _ = route.pop_front();
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use depths_core::{CellCoord, FloorView};

    use super::*;

    fn snapshot(cell: CellCoord) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: ParticipantId::VIEWER,
            floor: FloorNumber::new(0),
            cell,
            controller: Controller::PathFollowing,
            intent: None,
        }
    }

    #[test]
    fn activates_stairs_when_idle_on_them() {
        let mut tiles = vec![TileKind::Empty; 100];
        tiles[55] = TileKind::StairsDown;
        let stairways = [CellCoord::new(5, 5)];
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &stairways,
            &[],
        )]);
        let participants =
            ParticipantView::from_snapshots(vec![snapshot(CellCoord::new(5, 5))]);

        let mut autopilot = Autopilot::new(0);
        let mut out = Vec::new();
        autopilot.handle(&[], &dungeon, &participants, FloorNumber::new(0), &mut out);

        assert_eq!(
            out,
            vec![Command::ActivateTile {
                participant: ParticipantId::VIEWER
            }]
        );
    }

    #[test]
    fn human_controlled_participants_are_left_alone() {
        let tiles = vec![TileKind::Empty; 100];
        let objectives = [CellCoord::new(1, 1)];
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &objectives,
        )]);
        let mut viewer = snapshot(CellCoord::new(5, 5));
        viewer.controller = Controller::HumanControlled;
        let participants = ParticipantView::from_snapshots(vec![viewer]);

        let mut autopilot = Autopilot::new(0);
        let mut out = Vec::new();
        autopilot.handle(&[], &dungeon, &participants, FloorNumber::new(0), &mut out);

        assert!(out.is_empty());
        assert!(autopilot.plan(ParticipantId::VIEWER).is_none());
    }

    #[test]
    fn walled_in_targets_produce_no_intent() {
        let mut tiles = vec![TileKind::Empty; 100];
        for cell in [1, 10, 12, 21] {
            tiles[cell] = TileKind::Wall;
        }
        let objectives = [CellCoord::new(1, 1)];
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &objectives,
        )]);
        let participants =
            ParticipantView::from_snapshots(vec![snapshot(CellCoord::new(5, 5))]);

        let mut autopilot = Autopilot::new(0);
        let mut out = Vec::new();
        autopilot.handle(&[], &dungeon, &participants, FloorNumber::new(0), &mut out);

        assert!(out.is_empty());
    }
}
