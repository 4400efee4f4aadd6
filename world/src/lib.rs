#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative dungeon state for Depths.
//!
//! The [`World`] owns the append-only sequence of floors, the current floor
//! pointer and every participant. Mutations arrive as [`Command`] values
//! through [`apply`]; observers learn about them from the [`Event`] values it
//! emits and read state through the [`query`] module.

mod floor;
pub mod generation;

use depths_core::{
    CellCoord, Command, Controller, Direction, DungeonView, Event, FloorNumber, ParticipantId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

pub use floor::{Activation, CarveSteps, Floor};

const DEFAULT_WIDTH: u32 = 50;
const DEFAULT_HEIGHT: u32 = 50;

/// Parameters that shape every floor of a dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    /// Number of columns on every floor.
    pub width: u32,
    /// Number of rows on every floor.
    pub height: u32,
    /// Dungeon seed mixed into each floor's structural seed.
    pub seed_offset: u64,
    /// Strategy driving the viewer.
    pub viewer: Controller,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed_offset: 0,
            viewer: Controller::HumanControlled,
        }
    }
}

#[derive(Clone, Debug)]
struct Participant {
    id: ParticipantId,
    floor: FloorNumber,
    cell: CellCoord,
    controller: Controller,
    intent: Option<Direction>,
}

/// Represents the authoritative dungeon state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    floors: Vec<Floor>,
    mission_streams: Vec<ChaCha8Rng>,
    current: FloorNumber,
    participants: Vec<Participant>,
    next_participant: u32,
    tick_index: u64,
}

impl World {
    /// Creates a dungeon with its first floor generated and the viewer on its spawn tile.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        let mut world = Self {
            config,
            floors: Vec::new(),
            mission_streams: Vec::new(),
            current: FloorNumber::new(0),
            participants: Vec::new(),
            next_participant: 0,
            tick_index: 0,
        };

        let mut events = Vec::new();
        world.ensure_floor(FloorNumber::new(0), &mut events);
        let spawn = world.floors[0].spawn();
        let viewer = world.allocate_participant(config.viewer, spawn);
        debug_assert_eq!(viewer, ParticipantId::VIEWER);
        world
    }

    /// Ungenerated floor that would be appended next, seeded for its index.
    ///
    /// Callers that pace generation drive the returned floor through
    /// [`Floor::generate_stepwise`] and hand it back via [`World::push_floor`].
    #[must_use]
    pub fn next_floor(&self) -> Floor {
        let number = FloorNumber::new(u32::try_from(self.floors.len()).unwrap_or(u32::MAX));
        Floor::new(
            self.config.width,
            self.config.height,
            number,
            generation::floor_seed(number, self.config.seed_offset),
        )
    }

    /// Appends a generated floor to the dungeon.
    ///
    /// # Panics
    ///
    /// Panics when the floor is ungenerated, out of order, or sized differently.
    pub fn push_floor(&mut self, floor: Floor, out_events: &mut Vec<Event>) {
        assert!(floor.is_generated(), "only generated floors join the dungeon");
        assert_eq!(
            floor.number().index(),
            self.floors.len(),
            "floors must be appended in index order"
        );
        assert!(
            floor.width() == self.config.width && floor.height() == self.config.height,
            "floor dimensions must match the dungeon"
        );

        self.mission_streams
            .push(ChaCha8Rng::seed_from_u64(floor.mission_seed()));
        out_events.push(Event::FloorGenerated {
            floor: floor.number(),
            stairways: floor.stairways().len(),
            objectives: floor.objectives().len(),
        });
        self.floors.push(floor);
    }

    /// Splits the world into a dungeon view and the mission stream of `floor`.
    pub fn mission_context(
        &mut self,
        floor: FloorNumber,
    ) -> Option<(DungeonView<'_>, &mut ChaCha8Rng)> {
        let rng = self.mission_streams.get_mut(floor.index())?;
        Some((dungeon_view_of(&self.floors), rng))
    }

    fn ensure_floor(&mut self, floor: FloorNumber, out_events: &mut Vec<Event>) {
        while self.floors.len() <= floor.index() {
            let mut next = self.next_floor();
            next.generate();
            self.push_floor(next, out_events);
        }
    }

    fn allocate_participant(&mut self, controller: Controller, cell: CellCoord) -> ParticipantId {
        let id = ParticipantId::new(self.next_participant);
        self.next_participant = self.next_participant.saturating_add(1);
        self.participants.push(Participant {
            id,
            floor: self.current,
            cell,
            controller,
            intent: None,
        });
        id
    }

    fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|participant| participant.id == id)
    }

    fn resolve_tick(&mut self, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        let current = self.current;
        let floor = &self.floors[current.index()];

        for participant in self
            .participants
            .iter_mut()
            .filter(|participant| participant.floor == current)
        {
            let Some(direction) = participant.intent.take() else {
                continue;
            };
            let Some(destination) = participant
                .cell
                .step(direction)
                .filter(|cell| floor.is_open(*cell))
            else {
                continue;
            };

            let from = participant.cell;
            participant.cell = destination;
            out_events.push(Event::ParticipantMoved {
                participant: participant.id,
                floor: current,
                from,
                to: destination,
            });
        }

        out_events.push(Event::TimeAdvanced {
            tick: self.tick_index,
        });
    }

    fn activate(&mut self, id: ParticipantId, out_events: &mut Vec<Event>) {
        let Some(participant) = self.participants.iter().find(|p| p.id == id) else {
            return;
        };
        if participant.floor != self.current {
            return;
        }

        match self.floors[self.current.index()].activate_tile(participant.cell) {
            Some(Activation::Descend) if id == ParticipantId::VIEWER => self.descend(out_events),
            Some(Activation::Descend) => {
                debug!(participant = id.get(), "stairs_ignored_for_non_viewer");
            }
            None => {}
        }
    }

    fn descend(&mut self, out_events: &mut Vec<Event>) {
        let left = self.current;
        let entered = left.next();

        let hidden = self
            .participants
            .iter()
            .filter(|p| p.floor == left && p.id != ParticipantId::VIEWER)
            .map(|p| p.id)
            .collect();
        out_events.push(Event::FloorLeft {
            floor: left,
            hidden,
        });

        self.ensure_floor(entered, out_events);
        self.current = entered;
        let spawn = self.floors[entered.index()].spawn();
        if let Some(viewer) = self.participant_mut(ParticipantId::VIEWER) {
            viewer.floor = entered;
            viewer.cell = spawn;
            viewer.intent = None;
        }

        info!(floor = entered.get(), "floor_entered");
        out_events.push(Event::FloorEntered {
            floor: entered,
            spawn,
        });
    }

    fn register(&mut self, controller: Controller, cell: CellCoord, out_events: &mut Vec<Event>) {
        if !self.floors[self.current.index()].is_open(cell) {
            out_events.push(Event::RegistrationRejected { cell });
            return;
        }

        let participant = self.allocate_participant(controller, cell);
        out_events.push(Event::ParticipantRegistered {
            participant,
            floor: self.current,
            cell,
            controller,
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SetIntent {
            participant,
            direction,
        } => {
            if let Some(participant) = world.participant_mut(participant) {
                participant.intent = direction;
            }
        }
        Command::Tick => world.resolve_tick(out_events),
        Command::ActivateTile { participant } => world.activate(participant, out_events),
        Command::PrepareFloor { floor } => world.ensure_floor(floor, out_events),
        Command::RegisterParticipant { controller, cell } => {
            world.register(controller, cell, out_events);
        }
    }
}

fn dungeon_view_of(floors: &[Floor]) -> DungeonView<'_> {
    DungeonView::new(floors.iter().map(Floor::view).collect())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use depths_core::{
        DungeonView, FloorNumber, FloorView, ParticipantSnapshot, ParticipantView,
    };

    use super::{Floor, World, WorldConfig};

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Read-only view over every generated floor.
    #[must_use]
    pub fn dungeon_view(world: &World) -> DungeonView<'_> {
        super::dungeon_view_of(&world.floors)
    }

    /// Floor the viewer currently stands on.
    #[must_use]
    pub fn current_floor(world: &World) -> FloorNumber {
        world.current
    }

    /// Read-only view of the current floor.
    #[must_use]
    pub fn current_floor_view(world: &World) -> FloorView<'_> {
        world.floors[world.current.index()].view()
    }

    /// Generated floor with the provided number.
    #[must_use]
    pub fn floor(world: &World, number: FloorNumber) -> Option<&Floor> {
        world.floors.get(number.index())
    }

    /// Every generated floor in index order.
    #[must_use]
    pub fn floors(world: &World) -> &[Floor] {
        &world.floors
    }

    /// Captures a read-only view of every participant.
    #[must_use]
    pub fn participant_view(world: &World) -> ParticipantView {
        ParticipantView::from_snapshots(world.participants.iter().map(snapshot).collect())
    }

    /// Snapshot of the viewer.
    #[must_use]
    pub fn viewer(world: &World) -> ParticipantSnapshot {
        snapshot(&world.participants[0])
    }

    /// Number of ticks resolved so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    fn snapshot(participant: &super::Participant) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: participant.id,
            floor: participant.floor,
            cell: participant.cell,
            controller: participant.controller,
            intent: participant.intent,
        }
    }
}

#[cfg(test)]
mod tests {
    use depths_core::{TileKind, TilePosition};

    use super::*;

    fn small_world() -> World {
        World::new(WorldConfig {
            width: 24,
            height: 20,
            seed_offset: 11,
            viewer: Controller::HumanControlled,
        })
    }

    fn place_viewer(world: &mut World, cell: CellCoord) {
        world.participants[0].cell = cell;
    }

    fn open_neighbour(world: &World, cell: CellCoord) -> Option<(Direction, CellCoord)> {
        let floor = &world.floors[world.current.index()];
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
        .into_iter()
        .filter_map(|direction| cell.step(direction).map(|next| (direction, next)))
        .find(|(_, next)| floor.is_open(*next))
    }

    fn blocked_neighbour(world: &World, cell: CellCoord) -> Option<Direction> {
        let floor = &world.floors[world.current.index()];
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
        .into_iter()
        .find(|direction| cell.step(*direction).map_or(true, |next| !floor.is_open(next)))
    }

    #[test]
    fn new_world_places_viewer_on_first_spawn() {
        let world = small_world();
        let viewer = query::viewer(&world);
        assert_eq!(viewer.id, ParticipantId::VIEWER);
        assert_eq!(viewer.floor, FloorNumber::new(0));
        assert_eq!(viewer.cell, world.floors[0].spawn());
        assert_eq!(world.floors.len(), 1);
    }

    #[test]
    fn tick_commits_moves_into_open_tiles() {
        let mut world = small_world();
        let start = query::viewer(&world).cell;
        let (direction, destination) = open_neighbour(&world, start).expect("spawn is in a room");

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetIntent {
                participant: ParticipantId::VIEWER,
                direction: Some(direction),
            },
            &mut events,
        );
        apply(&mut world, Command::Tick, &mut events);

        assert_eq!(query::viewer(&world).cell, destination);
        assert_eq!(
            events,
            vec![
                Event::ParticipantMoved {
                    participant: ParticipantId::VIEWER,
                    floor: FloorNumber::new(0),
                    from: start,
                    to: destination,
                },
                Event::TimeAdvanced { tick: 1 },
            ]
        );
    }

    #[test]
    fn blocked_moves_are_dropped_without_retry() {
        let mut world = small_world();
        let corner = CellCoord::new(0, 0);
        place_viewer(&mut world, corner);
        let direction = blocked_neighbour(&world, corner).expect("corner is walled in");

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetIntent {
                participant: ParticipantId::VIEWER,
                direction: Some(direction),
            },
            &mut events,
        );
        apply(&mut world, Command::Tick, &mut events);
        apply(&mut world, Command::Tick, &mut events);

        assert_eq!(query::viewer(&world).cell, corner);
        assert_eq!(
            events,
            vec![
                Event::TimeAdvanced { tick: 1 },
                Event::TimeAdvanced { tick: 2 }
            ]
        );
        assert_eq!(query::viewer(&world).intent, None);
    }

    #[test]
    fn activating_stairs_descends_and_generates_lazily() {
        let mut world = small_world();
        let stairway = world.floors[0].stairways()[0];
        place_viewer(&mut world, stairway);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ActivateTile {
                participant: ParticipantId::VIEWER,
            },
            &mut events,
        );

        let second = FloorNumber::new(1);
        let spawn = world.floors[1].spawn();
        assert_eq!(query::current_floor(&world), second);
        assert_eq!(query::viewer(&world).position(), TilePosition::new(second, spawn));
        assert!(matches!(events[0], Event::FloorLeft { floor, .. } if floor == FloorNumber::new(0)));
        assert!(matches!(events[1], Event::FloorGenerated { floor, .. } if floor == second));
        assert_eq!(
            events[2],
            Event::FloorEntered {
                floor: second,
                spawn
            }
        );
    }

    #[test]
    fn activating_plain_floor_is_a_no_op() {
        let mut world = small_world();
        let floor = &world.floors[0];
        let empty = floor
            .objectives()
            .iter()
            .copied()
            .find(|cell| floor.tile(*cell).map(|tile| tile.kind()) == Some(TileKind::Empty))
            .expect("objective on plain floor");
        place_viewer(&mut world, empty);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ActivateTile {
                participant: ParticipantId::VIEWER,
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert_eq!(query::current_floor(&world), FloorNumber::new(0));
    }

    #[test]
    fn prepare_floor_generates_in_order_once() {
        let mut world = small_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PrepareFloor {
                floor: FloorNumber::new(2),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PrepareFloor {
                floor: FloorNumber::new(1),
            },
            &mut events,
        );

        let generated: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::FloorGenerated { floor, .. } => Some(floor.get()),
                _ => None,
            })
            .collect();
        assert_eq!(generated, vec![1, 2]);
        assert_eq!(world.floors.len(), 3);
        assert_eq!(world.mission_streams.len(), 3);
        assert_eq!(
            world.floors[2].seed(),
            generation::floor_seed(FloorNumber::new(2), 11)
        );
    }

    #[test]
    fn participants_move_after_viewer_in_registration_order() {
        let mut world = small_world();
        let spawn = world.floors[0].spawn();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RegisterParticipant {
                controller: Controller::PathFollowing,
                cell: spawn,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RegisterParticipant {
                controller: Controller::PathFollowing,
                cell: CellCoord::new(0, 0),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::ParticipantRegistered {
                    participant: ParticipantId::new(1),
                    floor: FloorNumber::new(0),
                    cell: spawn,
                    controller: Controller::PathFollowing,
                },
                Event::RegistrationRejected {
                    cell: CellCoord::new(0, 0)
                },
            ]
        );

        let (direction, _) = open_neighbour(&world, spawn).expect("spawn is in a room");
        events.clear();
        for participant in [ParticipantId::new(1), ParticipantId::VIEWER] {
            apply(
                &mut world,
                Command::SetIntent {
                    participant,
                    direction: Some(direction),
                },
                &mut events,
            );
        }
        apply(&mut world, Command::Tick, &mut events);

        let movers: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::ParticipantMoved { participant, .. } => Some(*participant),
                _ => None,
            })
            .collect();
        assert_eq!(movers, vec![ParticipantId::VIEWER, ParticipantId::new(1)]);
    }

    #[test]
    fn descending_hides_participants_left_behind() {
        let mut world = small_world();
        let spawn = world.floors[0].spawn();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RegisterParticipant {
                controller: Controller::PathFollowing,
                cell: spawn,
            },
            &mut events,
        );
        let stairway = world.floors[0].stairways()[0];
        place_viewer(&mut world, stairway);

        events.clear();
        apply(
            &mut world,
            Command::ActivateTile {
                participant: ParticipantId::VIEWER,
            },
            &mut events,
        );
        assert_eq!(
            events[0],
            Event::FloorLeft {
                floor: FloorNumber::new(0),
                hidden: vec![ParticipantId::new(1)],
            }
        );

        let companion = query::participant_view(&world)
            .get(ParticipantId::new(1))
            .copied()
            .expect("companion stays registered");
        assert_eq!(companion.floor, FloorNumber::new(0));
    }
}
