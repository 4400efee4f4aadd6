#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first route search across the floors of a dungeon.
//!
//! The search graph connects each open tile to its open axis neighbours on
//! the same floor. A `StairsDown` tile additionally connects to the spawn
//! tile of the following floor, but only while the target lies deeper than
//! the tile being expanded. Edges have unit cost and the frontier is a FIFO
//! queue, so ties between equally short routes resolve by discovery order:
//! west, east, north, south, then the stairway.

use std::collections::{HashSet, VecDeque};

use depths_core::{Direction, DungeonView, Tile, TileKind, TilePosition};
use tracing::{debug, trace};

const EXPANSION_ORDER: [Direction; 4] = [
    Direction::West,
    Direction::East,
    Direction::North,
    Direction::South,
];

#[derive(Clone, Copy, Debug)]
struct Node {
    tile: Tile,
    parent: Option<usize>,
}

/// Finds a shortest route from `start` to `target`.
///
/// The returned tiles begin with `start`, end with `target`, and every
/// consecutive pair is either axis-adjacent on one floor or a stairway
/// descent. Returns `None` when either endpoint lies outside the dungeon or
/// the target cannot be reached.
#[must_use]
pub fn find_path(
    dungeon: &DungeonView<'_>,
    start: TilePosition,
    target: TilePosition,
) -> Option<Vec<Tile>> {
    let start_tile = dungeon.tile(start)?;
    let _ = dungeon.tile(target)?;

    let mut nodes = vec![Node {
        tile: start_tile,
        parent: None,
    }];
    let mut discovered = HashSet::from([start]);
    let mut frontier = VecDeque::from([0_usize]);

    while let Some(current) = frontier.pop_front() {
        let tile = nodes[current].tile;
        if tile.position() == target {
            let path = unwind(&nodes, current);
            debug!(
                start_floor = start.floor().get(),
                target_floor = target.floor().get(),
                length = path.len(),
                explored = nodes.len(),
                "path_found"
            );
            return Some(path);
        }

        for next in successors(dungeon, tile, target).into_iter().flatten() {
            if !discovered.insert(next.position()) {
                continue;
            }
            nodes.push(Node {
                tile: next,
                parent: Some(current),
            });
            frontier.push_back(nodes.len() - 1);
        }
    }

    trace!(
        start_floor = start.floor().get(),
        target_floor = target.floor().get(),
        explored = nodes.len(),
        "path_not_found"
    );
    None
}

/// Number of steps along a route, excluding the starting tile.
#[must_use]
pub fn step_count(path: &[Tile]) -> usize {
    path.len().saturating_sub(1)
}

fn successors(
    dungeon: &DungeonView<'_>,
    tile: Tile,
    target: TilePosition,
) -> [Option<Tile>; 5] {
    let floor = dungeon.floor(tile.floor());
    let adjacent = EXPANSION_ORDER.map(|direction| {
        let cell = tile.cell().step(direction)?;
        floor?.tile(cell).filter(|next| next.kind().is_open())
    });

    let descends = tile.kind() == TileKind::StairsDown && tile.floor() < target.floor();
    let stairway = descends
        .then(|| dungeon.floor(tile.floor().next()))
        .flatten()
        .and_then(|below| below.tile(below.spawn()))
        .filter(|spawn| spawn.kind().is_open());

    let [west, east, north, south] = adjacent;
    [west, east, north, south, stairway]
}

fn unwind(nodes: &[Node], mut index: usize) -> Vec<Tile> {
    let mut path = vec![nodes[index].tile];
    while let Some(parent) = nodes[index].parent {
        path.push(nodes[parent].tile);
        index = parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use depths_core::{CellCoord, FloorNumber, FloorView};

    use super::*;

    fn open_grid(width: u32, height: u32) -> Vec<TileKind> {
        vec![TileKind::Empty; (width * height) as usize]
    }

    fn at(floor: u32, column: u32, row: u32) -> TilePosition {
        TilePosition::new(FloorNumber::new(floor), CellCoord::new(column, row))
    }

    #[test]
    fn start_equal_to_target_yields_single_tile() {
        let tiles = open_grid(10, 10);
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &[],
        )]);

        let path = find_path(&dungeon, at(0, 3, 3), at(0, 3, 3)).expect("trivial path");
        assert_eq!(path.len(), 1);
        assert_eq!(step_count(&path), 0);
    }

    #[test]
    fn ties_resolve_by_discovery_order() {
        let tiles = open_grid(10, 10);
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &[],
        )]);

        let path = find_path(&dungeon, at(0, 5, 5), at(0, 4, 4)).expect("open grid");
        let cells: Vec<_> = path.iter().map(|tile| tile.cell()).collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(5, 5),
                CellCoord::new(4, 5),
                CellCoord::new(4, 4)
            ]
        );
    }

    #[test]
    fn out_of_bounds_endpoints_are_rejected() {
        let tiles = open_grid(10, 10);
        let dungeon = DungeonView::new(vec![FloorView::new(
            FloorNumber::new(0),
            10,
            10,
            &tiles,
            &[],
            &[],
        )]);

        assert!(find_path(&dungeon, at(0, 0, 0), at(0, 10, 0)).is_none());
        assert!(find_path(&dungeon, at(0, 0, 0), at(1, 0, 0)).is_none());
    }
}
