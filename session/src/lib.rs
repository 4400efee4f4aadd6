#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn orchestration for a Depths run.
//!
//! A [`Session`] owns the world together with every system that reacts to
//! it. Each call to [`Session::turn`] records the viewer's input, lets the
//! autopilot steer path-following participants, resolves one tick, and then
//! feeds the resulting events to the visibility memory and the mission board.

mod config;

use depths_core::{
    CellCoord, Command, Controller, Cue, Direction, Event, FloorNumber, ParticipantId,
    ParticipantSnapshot, TilePosition,
};
use depths_system_autopilot::Autopilot;
use depths_system_missions::{
    select_missions, Mission, MissionBoard, MissionGenerator, MissionOutcome,
};
use depths_system_visibility::{Visibility, VisibilityUpdate};
use depths_world::{self as world, query, Floor, World, WorldConfig};
use tracing::debug;

pub use config::{ConfigError, MissionSettings, SessionConfig};

/// Input gathered for the viewer during one turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayerInput {
    /// No input this turn.
    #[default]
    Idle,
    /// Step one tile in the given direction.
    Move(Direction),
    /// Activate the tile the viewer stands on.
    Activate,
}

/// Everything observers need to know about a resolved turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// World events in emission order.
    pub events: Vec<Event>,
    /// Cells the viewer saw for the first time.
    pub visibility: VisibilityUpdate,
    /// Audio cues to play.
    pub cues: Vec<Cue>,
    /// Mission resolved during the turn.
    pub mission: Option<Mission>,
}

/// Running dungeon together with its systems.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    world: World,
    visibility: Visibility,
    autopilot: Autopilot,
    generator: MissionGenerator,
    board: MissionBoard,
    last_events: Vec<Event>,
    pending_events: Vec<Event>,
}

impl Session {
    /// Validates `config` and starts a session on the first floor.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let world = World::new(WorldConfig {
            width: config.width,
            height: config.height,
            seed_offset: config.seed,
            viewer: config.viewer,
        });
        let mut visibility = Visibility::new(config.view);
        let _ = visibility.refresh(
            &query::current_floor_view(&world),
            query::viewer(&world).cell,
        );
        let generator = MissionGenerator::new(
            config.missions.items.clone(),
            config.missions.minimum_path_length,
        );

        Ok(Self {
            autopilot: Autopilot::new(config.seed),
            config,
            world,
            visibility,
            generator,
            board: MissionBoard::default(),
            last_events: Vec::new(),
            pending_events: Vec::new(),
        })
    }

    /// Configuration the session was started with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Viewer's visibility memory on the current floor.
    #[must_use]
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Mission lifecycle and score.
    #[must_use]
    pub fn board(&self) -> &MissionBoard {
        &self.board
    }

    /// Floor the viewer is on.
    #[must_use]
    pub fn current_floor(&self) -> FloorNumber {
        query::current_floor(&self.world)
    }

    /// Snapshot of the viewer.
    #[must_use]
    pub fn viewer(&self) -> ParticipantSnapshot {
        query::viewer(&self.world)
    }

    /// Generated floor with the provided number.
    #[must_use]
    pub fn floor(&self, number: FloorNumber) -> Option<&Floor> {
        query::floor(&self.world, number)
    }

    /// Registers an additional participant on the current floor.
    ///
    /// Returns `None` when `cell` is not open.
    pub fn register_participant(
        &mut self,
        controller: Controller,
        cell: CellCoord,
    ) -> Option<ParticipantId> {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::RegisterParticipant { controller, cell },
            &mut events,
        );
        events.iter().find_map(|event| match event {
            Event::ParticipantRegistered { participant, .. } => Some(*participant),
            _ => None,
        })
    }

    /// Resolves one turn.
    ///
    /// Input is ignored while the viewer is path-following.
    pub fn turn(&mut self, input: PlayerInput) -> TurnReport {
        let mut commands = Vec::new();
        if self.viewer().controller == Controller::HumanControlled {
            match input {
                PlayerInput::Idle => {}
                PlayerInput::Move(direction) => commands.push(Command::SetIntent {
                    participant: ParticipantId::VIEWER,
                    direction: Some(direction),
                }),
                PlayerInput::Activate => commands.push(Command::ActivateTile {
                    participant: ParticipantId::VIEWER,
                }),
            }
        }
        {
            let dungeon = query::dungeon_view(&self.world);
            let participants = query::participant_view(&self.world);
            self.autopilot.handle(
                &self.last_events,
                &dungeon,
                &participants,
                query::current_floor(&self.world),
                &mut commands,
            );
        }

        let viewer_intends_move = commands.iter().any(|command| {
            matches!(
                command,
                Command::SetIntent {
                    participant: ParticipantId::VIEWER,
                    direction: Some(_),
                }
            )
        });

        // Events raised between turns lead the report.
        let mut events = std::mem::take(&mut self.pending_events);
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        world::apply(&mut self.world, Command::Tick, &mut events);

        let viewer = self.viewer();
        let visibility = self.visibility.handle(
            &events,
            &query::current_floor_view(&self.world),
            viewer.cell,
        );
        let mission = self.board.handle(&events, viewer.position());
        let cues = cues_for(&events, viewer_intends_move, mission.as_ref());

        debug!(
            tick = query::tick_index(&self.world),
            floor = viewer.floor.get(),
            events = events.len(),
            revealed = visibility.revealed.len(),
            "turn_resolved"
        );
        self.last_events.clone_from(&events);
        TurnReport {
            events,
            visibility,
            cues,
            mission,
        }
    }

    /// Every mission from the viewer to an objective on `floor`.
    ///
    /// Draws names from the floor's own mission stream. Returns nothing for
    /// floors that have not been generated.
    pub fn possible_missions(&mut self, floor: FloorNumber) -> Vec<Mission> {
        let viewer = self.viewer().position();
        let Some((dungeon, rng)) = self.world.mission_context(floor) else {
            return Vec::new();
        };
        self.generator.possible_missions(&dungeon, floor, viewer, rng)
    }

    /// Missions to offer the viewer right now.
    ///
    /// The next floor is generated if needed so that, once the viewer has
    /// completed missions on this floor, deeper errands can join the pool.
    /// Its `FloorGenerated` event is reported with the next turn.
    pub fn offer_missions(&mut self) -> Vec<Mission> {
        let current = self.current_floor();
        let next = current.next();

        world::apply(
            &mut self.world,
            Command::PrepareFloor { floor: next },
            &mut self.pending_events,
        );

        let here = self.possible_missions(current);
        let deeper = self.possible_missions(next);
        let Some((_, rng)) = self.world.mission_context(current) else {
            return Vec::new();
        };
        select_missions(
            here,
            deeper,
            self.board.completed_this_floor(),
            self.config.missions.offer_count,
            rng,
        )
    }

    /// Starts attempting `mission`, abandoning any mission in progress.
    pub fn accept_mission(&mut self, mission: Mission) {
        self.board.accept(mission);
    }

    /// Position of the tile the active mission asks the viewer to reach.
    #[must_use]
    pub fn mission_target(&self) -> Option<TilePosition> {
        self.board.active().map(|active| active.mission().target())
    }
}

fn cues_for(events: &[Event], viewer_intends_move: bool, mission: Option<&Mission>) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut viewer_moved = false;
    for event in events {
        match event {
            Event::ParticipantMoved {
                participant: ParticipantId::VIEWER,
                ..
            } => {
                viewer_moved = true;
                cues.push(Cue::Step);
            }
            Event::FloorEntered { .. } => cues.push(Cue::Descend),
            _ => {}
        }
    }
    if viewer_intends_move && !viewer_moved {
        cues.push(Cue::Bump);
    }
    match mission.map(Mission::outcome) {
        Some(MissionOutcome::Success) => cues.push(Cue::MissionSuccess),
        Some(MissionOutcome::Failure) => cues.push(Cue::MissionFailure),
        _ => {}
    }
    cues
}
