#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Depths dungeon kernel.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems read the dungeon through the borrowed
//! [`DungeonView`] and [`FloorView`] snapshots and respond with new commands.

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Records the movement intent a participant will attempt on the next tick.
    SetIntent {
        /// Participant whose intent is being recorded.
        participant: ParticipantId,
        /// Direction of travel, or `None` to stand still.
        direction: Option<Direction>,
    },
    /// Resolves every pending movement intent on the current floor.
    Tick,
    /// Activates the tile a participant is standing on.
    ActivateTile {
        /// Participant performing the activation.
        participant: ParticipantId,
    },
    /// Ensures every floor up to and including `floor` has been generated.
    PrepareFloor {
        /// Highest floor that must exist after the command completes.
        floor: FloorNumber,
    },
    /// Adds a participant to the current floor.
    RegisterParticipant {
        /// Strategy that supplies the participant's movement intents.
        controller: Controller,
        /// Open cell the participant starts on.
        cell: CellCoord,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that a simulation tick was resolved.
    TimeAdvanced {
        /// Monotonic index of the tick that just completed.
        tick: u64,
    },
    /// Confirms that a participant committed a move between two cells.
    ParticipantMoved {
        /// Participant that moved.
        participant: ParticipantId,
        /// Floor the move happened on.
        floor: FloorNumber,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
    },
    /// Confirms that a participant joined the dungeon.
    ParticipantRegistered {
        /// Identifier allocated by the world.
        participant: ParticipantId,
        /// Floor the participant lives on.
        floor: FloorNumber,
        /// Starting cell of the participant.
        cell: CellCoord,
        /// Strategy driving the participant.
        controller: Controller,
    },
    /// Reports that a registration request named a blocked or missing cell.
    RegistrationRejected {
        /// Cell provided in the registration request.
        cell: CellCoord,
    },
    /// Announces that a floor finished generating and joined the dungeon.
    FloorGenerated {
        /// Number of the generated floor.
        floor: FloorNumber,
        /// Count of stairway tiles carved on the floor.
        stairways: usize,
        /// Count of objective tiles carved on the floor.
        objectives: usize,
    },
    /// Announces that the viewer left a floor.
    FloorLeft {
        /// Floor that stopped being current.
        floor: FloorNumber,
        /// Participants that stay behind and should no longer be presented.
        hidden: Vec<ParticipantId>,
    },
    /// Announces that a floor became current and the viewer was placed on it.
    FloorEntered {
        /// Floor that became current.
        floor: FloorNumber,
        /// Spawn cell the viewer was moved to.
        spawn: CellCoord,
    },
}

/// Zero-based floor index; floor numbers equal their position in the dungeon.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FloorNumber(u32);

impl FloorNumber {
    /// Creates a new floor number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric floor index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Floor directly below this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Position of the floor within the dungeon's floor sequence.
    #[must_use]
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Converts signed coordinates, rejecting anything left of or above the grid.
    #[must_use]
    pub fn from_signed(column: i64, row: i64) -> Option<Self> {
        Some(Self {
            column: u32::try_from(column).ok()?,
            row: u32::try_from(row).ok()?,
        })
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Neighbouring cell in the provided direction, if it does not underflow.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.delta();
        Self::from_signed(
            i64::from(self.column) + i64::from(dx),
            i64::from(self.row) + i64::from(dy),
        )
    }
}

/// Cell anchored to a specific floor of the dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    floor: FloorNumber,
    cell: CellCoord,
}

impl TilePosition {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(floor: FloorNumber, cell: CellCoord) -> Self {
        Self { floor, cell }
    }

    /// Floor containing the tile.
    #[must_use]
    pub const fn floor(&self) -> FloorNumber {
        self.floor
    }

    /// Cell of the tile within its floor.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }
}

/// Kinds of tile a floor grid is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Walkable floor.
    Empty,
    /// Solid rock; blocks movement and sight.
    Wall,
    /// Walkable doorway that blocks sight.
    Door,
    /// Staircase leading to the floor above.
    StairsUp,
    /// Staircase leading to the spawn tile of the floor below.
    StairsDown,
}

impl TileKind {
    /// Reports whether the tile obstructs line of sight.
    #[must_use]
    pub const fn blocks_view(self) -> bool {
        matches!(self, Self::Wall | Self::Door)
    }

    /// Reports whether participants may stand on the tile.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Immutable description of a single tile of a generated floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    position: TilePosition,
    kind: TileKind,
}

impl Tile {
    /// Creates a tile descriptor.
    #[must_use]
    pub const fn new(position: TilePosition, kind: TileKind) -> Self {
        Self { position, kind }
    }

    /// Floor and cell of the tile.
    #[must_use]
    pub const fn position(&self) -> TilePosition {
        self.position
    }

    /// Floor containing the tile.
    #[must_use]
    pub const fn floor(&self) -> FloorNumber {
        self.position.floor()
    }

    /// Cell of the tile within its floor.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.position.cell()
    }

    /// Kind of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.kind
    }

    /// Reports whether the tile obstructs line of sight.
    #[must_use]
    pub const fn blocks_view(&self) -> bool {
        self.kind.blocks_view()
    }
}

/// Cardinal movement directions available to participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Column and row offsets applied by a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction that leads from `from` to the 4-adjacent cell `to`.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let dx = i64::from(to.column()) - i64::from(from.column());
        let dy = i64::from(to.row()) - i64::from(from.row());
        match (dx, dy) {
            (0, -1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, 1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }
}

/// Unique identifier assigned to a participant. The viewer always receives the first one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(u32);

impl ParticipantId {
    /// Identifier reserved for the viewer.
    pub const VIEWER: Self = Self(0);

    /// Creates a new participant identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Strategy that decides a participant's next movement intent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Controller {
    /// Intents arrive from the input adapter.
    #[default]
    HumanControlled,
    /// Intents are produced by following computed paths.
    PathFollowing,
}

/// Fire-and-forget audio cues derived from simulation events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// The viewer took a step.
    Step,
    /// The viewer walked into something that does not let it pass.
    Bump,
    /// The viewer descended a staircase.
    Descend,
    /// The active mission was completed.
    MissionSuccess,
    /// The active mission ran out of time.
    MissionFailure,
}

impl Cue {
    /// Name of the clip the audio collaborator should play.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Bump => "bump",
            Self::Descend => "descend",
            Self::MissionSuccess => "mission_success",
            Self::MissionFailure => "mission_failure",
        }
    }
}

/// Immutable representation of a single participant used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    /// Unique identifier assigned to the participant.
    pub id: ParticipantId,
    /// Floor the participant lives on.
    pub floor: FloorNumber,
    /// Cell currently occupied by the participant.
    pub cell: CellCoord,
    /// Strategy driving the participant.
    pub controller: Controller,
    /// Intent recorded for the next tick.
    pub intent: Option<Direction>,
}

impl ParticipantSnapshot {
    /// Floor and cell occupied by the participant.
    #[must_use]
    pub const fn position(&self) -> TilePosition {
        TilePosition::new(self.floor, self.cell)
    }
}

/// Read-only snapshot describing all participants, in registration order.
#[derive(Clone, Debug, Default)]
pub struct ParticipantView {
    snapshots: Vec<ParticipantSnapshot>,
}

impl ParticipantView {
    /// Creates a new participant view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ParticipantSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the participant with the provided identifier.
    #[must_use]
    pub fn get(&self, id: ParticipantId) -> Option<&ParticipantSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Snapshot of the viewer.
    #[must_use]
    pub fn viewer(&self) -> Option<&ParticipantSnapshot> {
        self.get(ParticipantId::VIEWER)
    }
}

/// Read-only view into a single generated floor.
#[derive(Clone, Copy, Debug)]
pub struct FloorView<'a> {
    number: FloorNumber,
    width: u32,
    height: u32,
    tiles: &'a [TileKind],
    stairways: &'a [CellCoord],
    objectives: &'a [CellCoord],
}

impl<'a> FloorView<'a> {
    /// Captures a floor view backed by a row-major tile slice.
    #[must_use]
    pub fn new(
        number: FloorNumber,
        width: u32,
        height: u32,
        tiles: &'a [TileKind],
        stairways: &'a [CellCoord],
        objectives: &'a [CellCoord],
    ) -> Self {
        debug_assert_eq!(
            tiles.len() as u64,
            u64::from(width) * u64::from(height),
            "tile slice must cover the whole floor"
        );
        Self {
            number,
            width,
            height,
            tiles,
            stairways,
            objectives,
        }
    }

    /// Number of the floor.
    #[must_use]
    pub const fn number(&self) -> FloorNumber {
        self.number
    }

    /// Number of columns in the floor grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the floor grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Centre cell where the viewer arrives on the floor.
    #[must_use]
    pub const fn spawn(&self) -> CellCoord {
        CellCoord::new(self.width / 2, self.height / 2)
    }

    /// Stairway cells in generation order.
    #[must_use]
    pub fn stairways(&self) -> &'a [CellCoord] {
        self.stairways
    }

    /// Objective cells in generation order.
    #[must_use]
    pub fn objectives(&self) -> &'a [CellCoord] {
        self.objectives
    }

    /// Kind of the tile at `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> Option<TileKind> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        self.tiles.get(row * width + column).copied()
    }

    /// Tile at `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.kind(cell)
            .map(|kind| Tile::new(TilePosition::new(self.number, cell), kind))
    }

    /// Reports whether `cell` lies inside the grid and is not a wall.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        self.kind(cell).is_some_and(TileKind::is_open)
    }
}

/// Read-only view over every generated floor of the dungeon.
#[derive(Clone, Debug, Default)]
pub struct DungeonView<'a> {
    floors: Vec<FloorView<'a>>,
}

impl<'a> DungeonView<'a> {
    /// Creates a dungeon view from floor views ordered by floor number.
    #[must_use]
    pub fn new(floors: Vec<FloorView<'a>>) -> Self {
        debug_assert!(
            floors
                .iter()
                .enumerate()
                .all(|(index, floor)| floor.number().index() == index),
            "floor numbers must match their index"
        );
        Self { floors }
    }

    /// Floor view for the provided floor number.
    #[must_use]
    pub fn floor(&self, number: FloorNumber) -> Option<&FloorView<'a>> {
        self.floors.get(number.index())
    }

    /// Tile at the provided position, or `None` when the floor or cell is missing.
    #[must_use]
    pub fn tile(&self, position: TilePosition) -> Option<Tile> {
        self.floor(position.floor())?.tile(position.cell())
    }

    /// Number of floors captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.floors.len()
    }

    /// Reports whether no floor has been generated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}
