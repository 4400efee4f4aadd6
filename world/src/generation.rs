//! Seeded floor carving.
//!
//! A floor starts as solid wall. A randomized frontier grows a sparse maze
//! outward from the spawn cell, then stairways, objectives, corridors and a
//! fixed central room are stamped on top using the same generator. Every tile
//! conversion is reported to an observer so callers can pace presentation
//! without influencing the result.

use std::ops::RangeInclusive;

use depths_core::{CellCoord, FloorNumber, TileKind};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Columns kept uncarved along the left and right grid edges.
pub const SIDE_MARGIN: u32 = 2;
/// Rows kept uncarved along the high-index edge. The low-index edge uses [`SIDE_MARGIN`].
pub const TOP_MARGIN: u32 = 3;
/// Smallest width or height the carver can lay anchors out on.
pub const MIN_DIMENSION: u32 = 10;

const SEED_STRIDE: u64 = 923_423_983;
// A popped frontier cell opens only with at least this many untouched wall neighbours.
const MAZE_OPEN_THRESHOLD: usize = 3;
const ANCHOR_INSET: u32 = 2;

const STAIRWAY_COUNT: RangeInclusive<u32> = 2..=3;
const OBJECTIVE_COUNT: RangeInclusive<u32> = 5..=7;
const CORRIDOR_COUNT: RangeInclusive<u32> = 20..=25;
const ROOM_SIDE: RangeInclusive<u32> = 3..=8;
const CORRIDOR_LENGTH: RangeInclusive<u32> = 6..=10;
const CORRIDOR_WIDTH: u32 = 2;
const CENTRAL_ROOM_WIDTH: u32 = 8;
const CENTRAL_ROOM_HEIGHT: u32 = 5;

/// Derives the structural seed of a floor from the dungeon seed.
#[must_use]
pub fn floor_seed(floor: FloorNumber, seed_offset: u64) -> u64 {
    u64::from(floor.get())
        .wrapping_mul(SEED_STRIDE)
        .wrapping_add(seed_offset)
}

/// Inputs that fully determine a carved floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorSpec {
    /// Number of columns in the grid.
    pub width: u32,
    /// Number of rows in the grid.
    pub height: u32,
    /// Floor being carved.
    pub floor: FloorNumber,
    /// Structural seed of the floor.
    pub seed: u64,
}

/// Single tile conversion performed while carving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CarveStep {
    /// Cell that changed.
    pub cell: CellCoord,
    /// Kind the cell changed into.
    pub kind: TileKind,
}

/// Result of carving a floor to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Row-major tile kinds.
    pub tiles: Vec<TileKind>,
    /// Stairway cells in placement order.
    pub stairways: Vec<CellCoord>,
    /// Objective cells in placement order.
    pub objectives: Vec<CellCoord>,
    /// Seed for the floor's mission stream.
    pub mission_seed: u64,
}

/// Carves a floor, reporting every tile conversion to `observe` in order.
///
/// The grid starts as solid wall; the first step reported is the first cell
/// the maze opens. Replaying the reported steps onto a wall grid reproduces
/// [`Layout::tiles`] exactly.
///
/// # Panics
///
/// Panics when either dimension is below [`MIN_DIMENSION`].
pub fn carve<F>(spec: FloorSpec, observe: F) -> Layout
where
    F: FnMut(CarveStep),
{
    assert!(
        spec.width >= MIN_DIMENSION && spec.height >= MIN_DIMENSION,
        "floor {}x{} is smaller than {MIN_DIMENSION}x{MIN_DIMENSION}",
        spec.width,
        spec.height
    );

    let mut rng = ChaCha8Rng::seed_from_u64(spec.seed);
    let mission_seed = rng.next_u64();
    let cell_count = usize::try_from(u64::from(spec.width) * u64::from(spec.height))
        .unwrap_or(0);

    let mut carver = Carver {
        width: spec.width,
        height: spec.height,
        tiles: vec![TileKind::Wall; cell_count],
        rng,
        observe,
    };

    let spawn = CellCoord::new(spec.width / 2, spec.height / 2);
    carver.grow_maze(spawn);

    let stairway_count = carver.rng.gen_range(STAIRWAY_COUNT);
    let objective_count = carver.rng.gen_range(OBJECTIVE_COUNT);
    let corridor_count = carver.rng.gen_range(CORRIDOR_COUNT);

    let inner_left = SIDE_MARGIN + ANCHOR_INSET;
    let inner_right = spec.width - SIDE_MARGIN - ANCHOR_INSET;
    let half = spec.width / 2;

    let mut stairways = Vec::new();
    for index in 0..stairway_count {
        let columns = match index {
            0 => inner_left..half,
            1 => half..inner_right,
            _ => inner_left..inner_right,
        };
        let cell = carver.anchor(columns);
        carver.set(cell, TileKind::StairsDown);
        stairways.push(cell);
        carver.random_room(cell);
    }

    let mut objectives = Vec::new();
    for _ in 0..objective_count {
        let cell = carver.anchor(inner_left..inner_right);
        carver.open(cell);
        objectives.push(cell);
        carver.random_room(cell);
    }

    for _ in 0..corridor_count {
        let cell = carver.anchor(inner_left..inner_right);
        carver.open(cell);
        carver.corridor(cell);
    }

    carver.room(spawn, CENTRAL_ROOM_WIDTH, CENTRAL_ROOM_HEIGHT);

    Layout {
        tiles: carver.tiles,
        stairways,
        objectives,
        mission_seed,
    }
}

struct Carver<F> {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
    rng: ChaCha8Rng,
    observe: F,
}

impl<F> Carver<F>
where
    F: FnMut(CarveStep),
{
    fn grow_maze(&mut self, spawn: CellCoord) {
        let mut frontier = vec![spawn];
        let mut queued = vec![false; self.tiles.len()];
        queued[self.index(spawn)] = true;

        while !frontier.is_empty() {
            let pick = self.rng.gen_range(0..frontier.len());
            let cell = frontier.remove(pick);
            queued[self.index(cell)] = false;

            let neighbours = self.neighbours(cell);
            let candidates = neighbours
                .iter()
                .flatten()
                .filter(|&&neighbour| {
                    self.kind(neighbour) == TileKind::Wall && !queued[self.index(neighbour)]
                })
                .count();
            if candidates < MAZE_OPEN_THRESHOLD {
                continue;
            }

            self.set(cell, TileKind::Empty);
            for neighbour in neighbours.into_iter().flatten() {
                let index = self.index(neighbour);
                if !queued[index] {
                    queued[index] = true;
                    frontier.push(neighbour);
                }
            }
        }
    }

    fn anchor(&mut self, columns: std::ops::Range<u32>) -> CellCoord {
        let column = self.rng.gen_range(columns);
        let row = self
            .rng
            .gen_range(SIDE_MARGIN + ANCHOR_INSET..self.height - TOP_MARGIN - ANCHOR_INSET);
        CellCoord::new(column, row)
    }

    fn random_room(&mut self, centre: CellCoord) {
        let width = self.rng.gen_range(ROOM_SIDE);
        let height = self.rng.gen_range(ROOM_SIDE);
        self.room(centre, width, height);
    }

    fn room(&mut self, centre: CellCoord, width: u32, height: u32) {
        self.fill_area(
            i64::from(centre.column()) - i64::from(width / 2),
            i64::from(centre.row()) - i64::from(height / 2),
            width,
            height,
        );
    }

    fn corridor(&mut self, anchor: CellCoord) {
        let length = self.rng.gen_range(CORRIDOR_LENGTH);
        let column = i64::from(anchor.column());
        let row = i64::from(anchor.row());
        let offset = i64::from(length / 2);
        if self.rng.gen_range(0..2) == 0 {
            self.fill_area(column - offset, row, length, CORRIDOR_WIDTH);
        } else {
            self.fill_area(column, row - offset, CORRIDOR_WIDTH, length);
        }
    }

    fn fill_area(&mut self, column: i64, row: i64, width: u32, height: u32) {
        for x in column..column + i64::from(width) {
            for y in row..row + i64::from(height) {
                let Some(cell) = CellCoord::from_signed(x, y) else {
                    continue;
                };
                if self.within_margins(cell) {
                    self.open(cell);
                }
            }
        }
    }

    fn open(&mut self, cell: CellCoord) {
        if self.kind(cell) == TileKind::Wall {
            self.set(cell, TileKind::Empty);
        }
    }

    fn set(&mut self, cell: CellCoord, kind: TileKind) {
        debug_assert!(
            self.within_margins(cell),
            "carve at {cell:?} lies outside the {}x{} margins",
            self.width,
            self.height
        );
        let index = self.index(cell);
        if self.tiles[index] != kind {
            self.tiles[index] = kind;
            (self.observe)(CarveStep { cell, kind });
        }
    }

    fn within_margins(&self, cell: CellCoord) -> bool {
        cell.column() >= SIDE_MARGIN
            && cell.column() < self.width.saturating_sub(SIDE_MARGIN)
            && cell.row() >= SIDE_MARGIN
            && cell.row() < self.height.saturating_sub(TOP_MARGIN)
    }

    /// Neighbours inside the margins, ordered west, east, north, south.
    fn neighbours(&self, cell: CellCoord) -> [Option<CellCoord>; 4] {
        let column = i64::from(cell.column());
        let row = i64::from(cell.row());
        [
            (column - 1, row),
            (column + 1, row),
            (column, row - 1),
            (column, row + 1),
        ]
        .map(|(x, y)| CellCoord::from_signed(x, y).filter(|next| self.within_margins(*next)))
    }

    fn kind(&self, cell: CellCoord) -> TileKind {
        self.tiles[self.index(cell)]
    }

    fn index(&self, cell: CellCoord) -> usize {
        (cell.row() as usize) * (self.width as usize) + cell.column() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(seed: u64) -> FloorSpec {
        FloorSpec {
            width: 30,
            height: 24,
            floor: FloorNumber::new(0),
            seed,
        }
    }

    #[test]
    #[should_panic(expected = "smaller than 10x10")]
    fn undersized_floors_are_refused() {
        let _ = carve(
            FloorSpec {
                width: 5,
                height: 24,
                floor: FloorNumber::new(0),
                seed: 1,
            },
            |_| {},
        );
    }

    #[test]
    fn floor_seed_matches_reference_formula() {
        assert_eq!(floor_seed(FloorNumber::new(0), 42), 42);
        assert_eq!(floor_seed(FloorNumber::new(3), 7), 3 * 923_423_983 + 7);
        assert_eq!(
            floor_seed(FloorNumber::new(u32::MAX), u64::MAX),
            u64::from(u32::MAX)
                .wrapping_mul(923_423_983)
                .wrapping_add(u64::MAX)
        );
    }

    #[test]
    fn replaying_steps_reproduces_layout() {
        let mut steps = Vec::new();
        let layout = carve(spec(9), |step| steps.push(step));

        let mut tiles = vec![TileKind::Wall; layout.tiles.len()];
        for step in &steps {
            tiles[(step.cell.row() * 30 + step.cell.column()) as usize] = step.kind;
        }

        assert!(!steps.is_empty());
        assert_eq!(tiles, layout.tiles);
    }

    #[test]
    fn margins_are_never_carved() {
        let layout = carve(spec(17), |_| {});
        for row in 0..24_u32 {
            for column in 0..30_u32 {
                let inside = (SIDE_MARGIN..30 - SIDE_MARGIN).contains(&column)
                    && (SIDE_MARGIN..24 - TOP_MARGIN).contains(&row);
                if !inside {
                    assert_eq!(
                        layout.tiles[(row * 30 + column) as usize],
                        TileKind::Wall,
                        "margin cell ({column}, {row}) was carved"
                    );
                }
            }
        }
    }

    #[test]
    fn first_two_stairways_split_the_grid() {
        for seed in 0..16 {
            let layout = carve(spec(seed), |_| {});
            assert!(layout.stairways[0].column() < 15);
            assert!(layout.stairways[1].column() >= 15);
            for cell in &layout.stairways {
                assert_eq!(
                    layout.tiles[(cell.row() * 30 + cell.column()) as usize],
                    TileKind::StairsDown
                );
            }
        }
    }

    #[test]
    fn central_room_is_open() {
        let layout = carve(spec(3), |_| {});
        for row in 12 - 2..12 - 2 + CENTRAL_ROOM_HEIGHT {
            for column in 15 - 4..15 - 4 + CENTRAL_ROOM_WIDTH {
                assert!(layout.tiles[(row * 30 + column) as usize].is_open());
            }
        }
    }

    #[test]
    fn mission_seed_depends_on_structural_seed() {
        let first = carve(spec(1), |_| {});
        let second = carve(spec(2), |_| {});
        assert_ne!(first.mission_seed, second.mission_seed);
    }
}
