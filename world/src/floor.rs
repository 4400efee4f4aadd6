//! Per-floor tile grid and its generation lifecycle.

use depths_core::{CellCoord, FloorNumber, FloorView, Tile, TileKind};
use tracing::{debug, warn};

use crate::generation::{self, CarveStep, FloorSpec, Layout, MIN_DIMENSION};

/// Effect requested by activating a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// The tile is a downward staircase; the dungeon should move to the next floor.
    Descend,
}

/// One level of the dungeon: its tile grid plus generation metadata.
///
/// A floor is created ungenerated, generated exactly once, and immutable
/// afterwards. Queries on an ungenerated floor are programmer errors.
#[derive(Clone, Debug)]
pub struct Floor {
    number: FloorNumber,
    width: u32,
    height: u32,
    seed: u64,
    generated: bool,
    tiles: Vec<TileKind>,
    stairways: Vec<CellCoord>,
    objectives: Vec<CellCoord>,
    mission_seed: u64,
}

impl Floor {
    /// Creates an ungenerated floor.
    ///
    /// # Panics
    ///
    /// Panics when either dimension is below [`MIN_DIMENSION`].
    #[must_use]
    pub fn new(width: u32, height: u32, number: FloorNumber, seed: u64) -> Self {
        assert!(
            width >= MIN_DIMENSION && height >= MIN_DIMENSION,
            "floors must be at least {MIN_DIMENSION}x{MIN_DIMENSION}, got {width}x{height}"
        );
        Self {
            number,
            width,
            height,
            seed,
            generated: false,
            tiles: Vec::new(),
            stairways: Vec::new(),
            objectives: Vec::new(),
            mission_seed: 0,
        }
    }

    /// Number of the floor.
    #[must_use]
    pub const fn number(&self) -> FloorNumber {
        self.number
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Structural seed the floor is carved from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Reports whether generation has completed.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.generated
    }

    /// Centre cell where the viewer arrives.
    #[must_use]
    pub const fn spawn(&self) -> CellCoord {
        CellCoord::new(self.width / 2, self.height / 2)
    }

    /// Stairway cells in placement order.
    #[must_use]
    pub fn stairways(&self) -> &[CellCoord] {
        &self.stairways
    }

    /// Objective cells in placement order.
    #[must_use]
    pub fn objectives(&self) -> &[CellCoord] {
        &self.objectives
    }

    /// Seed of the floor's mission stream, available once generated.
    #[must_use]
    pub fn mission_seed(&self) -> u64 {
        debug_assert!(self.generated, "floor {} not generated", self.number.get());
        self.mission_seed
    }

    /// Carves the floor in a single call.
    pub fn generate(&mut self) {
        if self.refuse_regeneration() {
            return;
        }
        let layout = generation::carve(self.spec(), |_| {});
        self.install(layout);
    }

    /// Carves the floor one tile at a time.
    ///
    /// Each call to [`Iterator::next`] applies a single carve step to the grid
    /// and yields it. The final state is identical to [`Floor::generate`]. The
    /// floor cannot be queried while the iterator is alive, and dropping the
    /// iterator early applies the remaining steps.
    pub fn generate_stepwise(&mut self) -> CarveSteps<'_> {
        if self.refuse_regeneration() {
            return CarveSteps {
                floor: self,
                steps: Vec::new().into_iter(),
                layout: None,
            };
        }

        let mut steps = Vec::new();
        let layout = generation::carve(self.spec(), |step| steps.push(step));
        self.tiles = vec![TileKind::Wall; layout.tiles.len()];
        CarveSteps {
            floor: self,
            steps: steps.into_iter(),
            layout: Some(layout),
        }
    }

    /// Tile at `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.view().tile(cell)
    }

    /// Reports whether `cell` is inside the grid and not a wall.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        self.view().is_open(cell)
    }

    /// Reports whether every cell of the rectangle anchored at `origin` is open.
    #[must_use]
    pub fn is_area_open(&self, origin: CellCoord, width: u32, height: u32) -> bool {
        let view = self.view();
        (0..width).all(|dx| {
            (0..height).all(|dy| {
                match (
                    origin.column().checked_add(dx),
                    origin.row().checked_add(dy),
                ) {
                    (Some(column), Some(row)) => view.is_open(CellCoord::new(column, row)),
                    _ => false,
                }
            })
        })
    }

    /// Effect of activating the tile at `cell`.
    #[must_use]
    pub fn activate_tile(&self, cell: CellCoord) -> Option<Activation> {
        match self.tile(cell)?.kind() {
            TileKind::StairsDown => Some(Activation::Descend),
            _ => None,
        }
    }

    /// Borrowed read-only view of the generated grid.
    #[must_use]
    pub fn view(&self) -> FloorView<'_> {
        debug_assert!(self.generated, "floor {} not generated", self.number.get());
        FloorView::new(
            self.number,
            self.width,
            self.height,
            &self.tiles,
            &self.stairways,
            &self.objectives,
        )
    }

    /// Canonical byte encoding of the grid and coordinate lists.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let coordinates = self.stairways.len() + self.objectives.len();
        let mut bytes = Vec::with_capacity(self.tiles.len() + 8 * coordinates);
        bytes.extend(self.tiles.iter().map(|kind| *kind as u8));
        for cell in self.stairways.iter().chain(&self.objectives) {
            bytes.extend_from_slice(&cell.column().to_le_bytes());
            bytes.extend_from_slice(&cell.row().to_le_bytes());
        }
        bytes
    }

    fn spec(&self) -> FloorSpec {
        FloorSpec {
            width: self.width,
            height: self.height,
            floor: self.number,
            seed: self.seed,
        }
    }

    fn refuse_regeneration(&self) -> bool {
        debug_assert!(
            !self.generated,
            "floor {} generated twice",
            self.number.get()
        );
        if self.generated {
            warn!(floor = self.number.get(), "floor_regeneration_ignored");
        }
        self.generated
    }

    fn apply_step(&mut self, step: CarveStep) {
        let index =
            (step.cell.row() as usize) * (self.width as usize) + step.cell.column() as usize;
        self.tiles[index] = step.kind;
    }

    fn install(&mut self, layout: Layout) {
        debug_assert!(
            self.tiles.is_empty() || self.tiles == layout.tiles,
            "stepwise carve diverged from layout"
        );
        self.tiles = layout.tiles;
        self.stairways = layout.stairways;
        self.objectives = layout.objectives;
        self.mission_seed = layout.mission_seed;
        self.generated = true;
        debug!(
            floor = self.number.get(),
            seed = self.seed,
            stairways = self.stairways.len(),
            objectives = self.objectives.len(),
            "floor_generated"
        );
    }
}

/// Presentation-paced generation of a single floor.
///
/// Created by [`Floor::generate_stepwise`].
#[derive(Debug)]
pub struct CarveSteps<'a> {
    floor: &'a mut Floor,
    steps: std::vec::IntoIter<CarveStep>,
    layout: Option<Layout>,
}

impl CarveSteps<'_> {
    fn finish(&mut self) {
        for step in self.steps.by_ref() {
            self.floor.apply_step(step);
        }
        if let Some(layout) = self.layout.take() {
            self.floor.install(layout);
        }
    }
}

impl Iterator for CarveSteps<'_> {
    type Item = CarveStep;

    fn next(&mut self) -> Option<CarveStep> {
        let Some(step) = self.steps.next() else {
            self.finish();
            return None;
        };
        self.floor.apply_step(step);
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.steps.size_hint()
    }
}

impl Drop for CarveSteps<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(seed: u64) -> Floor {
        let mut floor = Floor::new(24, 20, FloorNumber::new(0), seed);
        floor.generate();
        floor
    }

    #[test]
    fn out_of_bounds_queries_answer_none() {
        let floor = generated(5);
        assert!(floor.tile(CellCoord::new(24, 0)).is_none());
        assert!(floor.tile(CellCoord::new(0, 20)).is_none());
        assert!(!floor.is_open(CellCoord::new(100, 100)));
        assert!(floor.tile(CellCoord::new(23, 19)).is_some());
    }

    #[test]
    fn area_query_requires_every_cell_open() {
        let floor = generated(5);
        let spawn = floor.spawn();
        let origin = CellCoord::new(spawn.column() - 4, spawn.row() - 2);
        assert!(floor.is_area_open(origin, 8, 5));
        assert!(!floor.is_area_open(CellCoord::new(0, 0), 2, 2));
        assert!(!floor.is_area_open(CellCoord::new(22, 18), 4, 4));
        assert!(floor.is_area_open(CellCoord::new(0, 0), 0, 0));
    }

    #[test]
    fn only_stairways_activate() {
        let floor = generated(8);
        let stairway = floor.stairways()[0];
        assert_eq!(floor.activate_tile(stairway), Some(Activation::Descend));
        let empty = (0..20)
            .flat_map(|row| (0..24).map(move |column| CellCoord::new(column, row)))
            .find(|cell| floor.tile(*cell).map(|tile| tile.kind()) == Some(TileKind::Empty))
            .expect("generated floor has empty tiles");
        assert_eq!(floor.activate_tile(empty), None);
        assert_eq!(floor.activate_tile(CellCoord::new(500, 500)), None);
    }

    #[test]
    fn stepwise_matches_single_call() {
        let single = generated(21);

        let mut paced = Floor::new(24, 20, FloorNumber::new(0), 21);
        let mut count = 0_usize;
        for step in paced.generate_stepwise() {
            assert_ne!(step.kind, TileKind::Wall);
            count += 1;
        }

        assert!(count > 0);
        assert!(paced.is_generated());
        assert_eq!(paced.canonical_bytes(), single.canonical_bytes());
    }

    #[test]
    fn abandoned_stepwise_generation_still_completes() {
        let single = generated(34);

        let mut paced = Floor::new(24, 20, FloorNumber::new(0), 34);
        {
            let mut steps = paced.generate_stepwise();
            let _ = steps.next();
            let _ = steps.next();
        }

        assert!(paced.is_generated());
        assert_eq!(paced.canonical_bytes(), single.canonical_bytes());
    }

    #[test]
    #[should_panic(expected = "at least")]
    fn rejects_tiny_floors() {
        let _ = Floor::new(6, 40, FloorNumber::new(0), 0);
    }
}
