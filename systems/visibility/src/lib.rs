#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Field-of-view computation and the viewer's visibility memory.
//!
//! A tile is seen unconditionally when it lies within the close range by
//! Manhattan distance. Farther tiles inside the far radius are seen when the
//! digital line walked from the tile back to the viewer never steps onto a
//! view-blocking tile. Revealed tiles stay remembered until the viewer
//! reaches another floor.

use std::collections::BTreeSet;

use depths_core::{CellCoord, Event, FloorNumber, FloorView, ParticipantId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Radii that bound what the viewer can see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewRange {
    /// Manhattan radius inside which every tile is visible.
    #[serde(rename = "close_range")]
    pub close: u32,
    /// Euclidean radius, exclusive, beyond which nothing is visible.
    #[serde(rename = "far_range")]
    pub far: u32,
}

impl Default for ViewRange {
    fn default() -> Self {
        Self { close: 5, far: 10 }
    }
}

/// Cells of `floor` visible from `viewer`.
#[must_use]
pub fn visible_cells(
    floor: &FloorView<'_>,
    viewer: CellCoord,
    range: ViewRange,
) -> BTreeSet<CellCoord> {
    let far = i64::from(range.far);
    let close = i64::from(range.close);
    let origin_column = i64::from(viewer.column());
    let origin_row = i64::from(viewer.row());

    let mut visible = BTreeSet::new();
    for column in origin_column - far..=origin_column + far {
        for row in origin_row - far..=origin_row + far {
            let Some(cell) = CellCoord::from_signed(column, row) else {
                continue;
            };
            if floor.kind(cell).is_none() {
                continue;
            }

            let distance = (column - origin_column).abs() + (row - origin_row).abs();
            if distance <= close || line_of_sight(floor, viewer, cell, range.far) {
                let _ = visible.insert(cell);
            }
        }
    }
    visible
}

/// Reports whether `target` can be seen from `viewer` within the `far` radius.
///
/// The walk starts at `target` and advances one tile at a time toward the
/// viewer, stepping diagonally when the line passes exactly through a corner.
/// Every tile stepped onto, the viewer's own included, must let sight through.
/// The target itself is never tested, so the face of a wall can be seen.
#[must_use]
pub fn line_of_sight(
    floor: &FloorView<'_>,
    viewer: CellCoord,
    target: CellCoord,
    far: u32,
) -> bool {
    let dx = i64::from(viewer.column()) - i64::from(target.column());
    let dy = i64::from(viewer.row()) - i64::from(target.row());
    let far = i64::from(far);
    if dx * dx + dy * dy >= far * far {
        return false;
    }

    let (nx, ny) = (dx.abs(), dy.abs());
    let (sign_x, sign_y) = (dx.signum(), dy.signum());
    let (mut ix, mut iy) = (0_i64, 0_i64);
    let (mut column, mut row) = (i64::from(target.column()), i64::from(target.row()));

    while ix < nx || iy < ny {
        let bias = nx * (2 * iy + 1) - ny * (2 * ix + 1);
        if bias >= 0 {
            column += sign_x;
            ix += 1;
        }
        if bias <= 0 {
            row += sign_y;
            iy += 1;
        }

        let blocked = CellCoord::from_signed(column, row)
            .and_then(|cell| floor.tile(cell))
            .is_some_and(|tile| tile.blocks_view());
        if blocked {
            return false;
        }
    }
    true
}

/// Cells newly revealed by a call to [`Visibility::handle`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilityUpdate {
    /// Set when every previously revealed cell was forgotten first.
    pub reset: bool,
    /// Cells revealed for the first time, in row-major order.
    pub revealed: Vec<CellCoord>,
}

impl VisibilityUpdate {
    /// Reports whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.reset && self.revealed.is_empty()
    }
}

/// Accumulated visibility of the viewer on its current floor.
#[derive(Clone, Debug, Default)]
pub struct Visibility {
    range: ViewRange,
    floor: Option<FloorNumber>,
    revealed: BTreeSet<CellCoord>,
}

impl Visibility {
    /// Creates an empty visibility memory using the provided radii.
    #[must_use]
    pub fn new(range: ViewRange) -> Self {
        Self {
            range,
            floor: None,
            revealed: BTreeSet::new(),
        }
    }

    /// Radii used when recomputing visibility.
    #[must_use]
    pub fn range(&self) -> ViewRange {
        self.range
    }

    /// Floor the remembered cells belong to.
    #[must_use]
    pub fn floor(&self) -> Option<FloorNumber> {
        self.floor
    }

    /// Reports whether `cell` has been seen on the current floor.
    #[must_use]
    pub fn is_revealed(&self, cell: CellCoord) -> bool {
        self.revealed.contains(&cell)
    }

    /// Every cell seen on the current floor, in row-major order.
    pub fn revealed(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.revealed.iter().copied()
    }

    /// Recomputes visibility from `viewer` on `floor`, forgetting cells seen on other floors.
    pub fn refresh(&mut self, floor: &FloorView<'_>, viewer: CellCoord) -> VisibilityUpdate {
        let reset = self.floor != Some(floor.number());
        if reset {
            self.revealed.clear();
            self.floor = Some(floor.number());
        }

        let mut revealed: Vec<_> = visible_cells(floor, viewer, self.range)
            .into_iter()
            .filter(|cell| self.revealed.insert(*cell))
            .collect();
        revealed.sort_by_key(|cell| (cell.row(), cell.column()));

        debug!(
            floor = floor.number().get(),
            reset,
            revealed = revealed.len(),
            "visibility_updated"
        );
        VisibilityUpdate { reset, revealed }
    }

    /// Reacts to viewer movement and floor changes.
    ///
    /// `floor` must be the floor the viewer stands on after `events` were applied.
    pub fn handle(
        &mut self,
        events: &[Event],
        floor: &FloorView<'_>,
        viewer: CellCoord,
    ) -> VisibilityUpdate {
        let relevant = events.iter().any(|event| match event {
            Event::FloorEntered { .. } => true,
            Event::ParticipantMoved { participant, .. } => *participant == ParticipantId::VIEWER,
            _ => false,
        });

        if relevant || self.floor != Some(floor.number()) {
            self.refresh(floor, viewer)
        } else {
            VisibilityUpdate::default()
        }
    }
}
