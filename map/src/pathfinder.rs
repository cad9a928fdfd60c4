//! Bounded A* search over the tile grid.
//!
//! The open set is a binary heap ordered by total cost; the closed set
//! is encoded in the tiles' generation marks, which the map advances
//! after every search instead of clearing the grid.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use gridfare_core::{BlockMask, CellCoord, Path};
use log::debug;

use crate::TileMap;

/// Cost of one axis-aligned step.
pub const UNIT_COST: i32 = 100;

/// Cost of one diagonal step, an integer approximation of √2 times
/// [`UNIT_COST`].
pub const DIAGONAL_COST: i32 = UNIT_COST * 362 / 256;

/// Default search bound, measured in multiples of [`UNIT_COST`].
pub const DEFAULT_SEARCH_BOUND: u32 = 20;

/// Entry on the open list. Duplicates for the same cell may coexist;
/// stale ones are skipped on pop via the closed mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    cell: CellCoord,
    f_cost: i32,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behaviour; ties fall to coordinates so
        // ordering never depends on insertion order.
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.cell.row().cmp(&self.cell.row()))
            .then_with(|| other.cell.column().cmp(&self.cell.column()))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Octile distance estimate between two cells.
///
/// The estimate must never exceed the real remaining cost or the
/// search stops being reliable; Manhattan distance would overestimate
/// under diagonal movement and is therefore unusable here.
fn octile_estimate(from: CellCoord, to: CellCoord) -> i32 {
    let dx = from.column().abs_diff(to.column()) as i32;
    let dy = from.row().abs_diff(to.row()) as i32;
    (dx - dy).abs() * UNIT_COST + dx.min(dy) * DIAGONAL_COST
}

impl TileMap {
    /// Computes a near-shortest walkable route from `start` to `goal`.
    ///
    /// The returned path excludes the start cell and includes the goal;
    /// consecutive waypoints are 8-connected and walkable under `mask`.
    /// An empty path means no route: the goal is blocked, unreachable,
    /// or beyond `max_cost` unit steps of accumulated cost. Both
    /// endpoints must lie within the map; passing an out-of-bounds cell
    /// is a caller bug and panics.
    ///
    /// Axis-aligned steps carry a one-point cost demotion so that no
    /// two directions out of a cell tie on total cost. The demotion
    /// along any real path stays below one unit step, so the result is
    /// still one of the shortest paths.
    pub fn find_path(
        &mut self,
        start: CellCoord,
        goal: CellCoord,
        mask: BlockMask,
        max_cost: u32,
    ) -> Path {
        assert!(
            self.contains(start) && self.contains(goal),
            "path endpoints out of bounds: {start:?} -> {goal:?}"
        );

        self.record_expansions(0);

        if start == goal {
            return Path::empty();
        }

        // A blocked goal fails without paying for any expansion.
        if !self.walkable(goal, mask) {
            debug!("path request rejected, goal {goal:?} fails mask {mask:?}");
            return Path::empty();
        }

        let cost_bound = i32::try_from(max_cost)
            .unwrap_or(i32::MAX)
            .saturating_mul(UNIT_COST);
        let open_mark = self.open_mark();
        let closed_mark = self.closed_mark();
        let mut open = BinaryHeap::new();
        let mut expansions: u32 = 0;
        let mut found = false;

        let start_index = self
            .index(start)
            .unwrap_or_else(|| unreachable!("start cell was bounds-checked"));
        self.tile_mut(start_index).g_cost = 0;
        open.push(OpenEntry {
            cell: start,
            f_cost: 0,
        });

        'search: while let Some(entry) = open.pop() {
            let Some(current_index) = self.index(entry.cell) else {
                continue;
            };

            // A cell already moved to the closed set was reached over a
            // cheaper route; this heap entry is stale.
            if self.tile(current_index).mark == closed_mark {
                continue;
            }
            self.tile_mut(current_index).mark = closed_mark;
            expansions = expansions.saturating_add(1);

            let current_g = self.tile(current_index).g_cost;

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }

                    let column = i64::from(entry.cell.column()) + dx;
                    let row = i64::from(entry.cell.row()) + dy;
                    let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
                        continue;
                    };
                    let neighbour = CellCoord::new(column, row);
                    let Some(neighbour_index) = self.index(neighbour) else {
                        continue;
                    };

                    let tile = self.tile(neighbour_index);
                    if tile.mark == closed_mark || tile.blockmask.intersects(mask) {
                        continue;
                    }

                    // A diagonal step must not cut the corner of a
                    // blocked cell: both orthogonal bridge cells have
                    // to be open.
                    if dx != 0 && dy != 0 {
                        let across_row = CellCoord::new(entry.cell.column(), row);
                        let across_column = CellCoord::new(column, entry.cell.row());
                        if !self.walkable(across_row, mask) || !self.walkable(across_column, mask)
                        {
                            continue;
                        }
                    }

                    let step_cost = if dx == 0 || dy == 0 {
                        // Demote axis-aligned steps so no two candidate
                        // directions share a total cost.
                        UNIT_COST + 1
                    } else {
                        DIAGONAL_COST
                    };
                    let g_cost = current_g + step_cost;

                    if g_cost > cost_bound {
                        continue;
                    }

                    if self.tile(neighbour_index).mark != open_mark {
                        let h_cost = octile_estimate(neighbour, goal);
                        let tile = self.tile_mut(neighbour_index);
                        tile.parent = entry.cell;
                        tile.g_cost = g_cost;
                        tile.h_cost = h_cost;
                        tile.f_cost = g_cost + h_cost;

                        if neighbour == goal {
                            found = true;
                            break 'search;
                        }

                        tile.mark = open_mark;
                        open.push(OpenEntry {
                            cell: neighbour,
                            f_cost: g_cost + h_cost,
                        });
                    } else if g_cost < self.tile(neighbour_index).g_cost {
                        // Cheaper route to an open cell; re-push and let
                        // the stale entry rot on the heap.
                        let tile = self.tile_mut(neighbour_index);
                        tile.g_cost = g_cost;
                        tile.f_cost = g_cost + tile.h_cost;
                        tile.parent = entry.cell;
                        open.push(OpenEntry {
                            cell: neighbour,
                            f_cost: tile.f_cost,
                        });
                    }
                }
            }
        }

        // Advancing both marks retires every open/closed stamp of this
        // search at once, so the next search starts from clean tiles
        // without touching the grid.
        self.advance_marks();
        self.record_expansions(expansions);

        if !found {
            debug!("no route {start:?} -> {goal:?} after {expansions} expansions");
            return Path::empty();
        }

        let mut nodes = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            nodes.push(cursor);
            let index = self
                .index(cursor)
                .unwrap_or_else(|| unreachable!("parent chain left the map at {cursor:?}"));
            cursor = self.tile(index).parent;
        }
        nodes.reverse();

        debug!(
            "route {start:?} -> {goal:?}: {} waypoints, {expansions} expansions",
            nodes.len()
        );
        Path::from_nodes(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfare_core::BlockClass;

    fn open_map(width: u32, height: u32) -> TileMap {
        TileMap::new(width, height)
    }

    fn wall(map: &mut TileMap, column: u32, row: u32) {
        let _handle = map.block_tile(CellCoord::new(column, row), BlockClass::Wall);
    }

    fn find(map: &mut TileMap, start: (u32, u32), goal: (u32, u32)) -> Vec<CellCoord> {
        map.find_path(
            CellCoord::new(start.0, start.1),
            CellCoord::new(goal.0, goal.1),
            BlockMask::WALL,
            DEFAULT_SEARCH_BOUND,
        )
        .iter()
        .collect()
    }

    /// Geometric cost of a waypoint sequence, without the tie-break
    /// demotion.
    fn geometric_cost(start: CellCoord, nodes: &[CellCoord]) -> i32 {
        let mut cost = 0;
        let mut previous = start;
        for &node in nodes {
            let diagonal =
                previous.column().abs_diff(node.column()) == 1 && previous.row().abs_diff(node.row()) == 1;
            cost += if diagonal { DIAGONAL_COST } else { UNIT_COST };
            previous = node;
        }
        cost
    }

    #[test]
    fn start_equals_goal_yields_empty_path() {
        let mut map = open_map(3, 3);
        assert!(find(&mut map, (1, 1), (1, 1)).is_empty());
    }

    #[test]
    fn adjacent_goal_yields_single_waypoint() {
        for (column, row) in [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)] {
            let mut map = open_map(3, 3);
            let nodes = find(&mut map, (1, 1), (column, row));
            assert_eq!(nodes, vec![CellCoord::new(column, row)]);
        }
    }

    #[test]
    fn open_grid_walks_the_pure_diagonal() {
        let mut map = open_map(5, 5);
        let nodes = find(&mut map, (0, 0), (4, 4));

        assert_eq!(nodes.len(), 4);
        let mut previous = CellCoord::new(0, 0);
        for node in nodes {
            assert_eq!(previous.column().abs_diff(node.column()), 1);
            assert_eq!(previous.row().abs_diff(node.row()), 1);
            previous = node;
        }
        assert_eq!(previous, CellCoord::new(4, 4));
    }

    #[test]
    fn blocked_column_routes_through_the_gap() {
        let mut map = open_map(5, 5);
        for row in 0..4 {
            wall(&mut map, 2, row);
        }

        let nodes = find(&mut map, (0, 0), (4, 0));
        assert!(
            nodes.contains(&CellCoord::new(2, 4)),
            "expected route through the open cell of the wall column, got {nodes:?}"
        );
    }

    #[test]
    fn route_cost_never_exceeds_hand_built_alternative() {
        let mut map = open_map(5, 5);
        for row in 1..5 {
            wall(&mut map, 1, row);
        }
        for row in 0..4 {
            wall(&mut map, 3, row);
        }

        let start = CellCoord::new(0, 4);
        let nodes = find(&mut map, (0, 4), (4, 4));
        assert!(!nodes.is_empty());

        // Hand-built detour over the top of the first wall and under
        // the second, kept free of corner cuts.
        let alternative = [
            CellCoord::new(0, 3),
            CellCoord::new(0, 2),
            CellCoord::new(0, 1),
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
            CellCoord::new(2, 1),
            CellCoord::new(2, 2),
            CellCoord::new(2, 3),
            CellCoord::new(2, 4),
            CellCoord::new(3, 4),
            CellCoord::new(4, 4),
        ];
        assert!(geometric_cost(start, &nodes) <= geometric_cost(start, &alternative));
    }

    #[test]
    fn blocked_goal_fails_before_any_expansion() {
        let mut map = open_map(4, 4);
        wall(&mut map, 3, 3);

        let nodes = find(&mut map, (0, 0), (3, 3));
        assert!(nodes.is_empty());
        assert_eq!(map.last_search_expansions(), 0);
    }

    #[test]
    fn unreachable_goal_yields_empty_path() {
        let mut map = open_map(5, 5);
        for (column, row) in [(3, 2), (4, 2), (3, 4), (4, 4), (3, 3)] {
            wall(&mut map, column, row);
        }
        // Goal fully fenced at (4, 3).
        let nodes = find(&mut map, (0, 0), (4, 3));
        assert!(nodes.is_empty());
        assert!(map.last_search_expansions() > 0);
    }

    #[test]
    fn identical_searches_return_identical_routes() {
        let mut map = open_map(6, 6);
        wall(&mut map, 2, 2);
        wall(&mut map, 3, 2);
        wall(&mut map, 2, 3);

        let first = find(&mut map, (0, 0), (5, 5));
        let second = find(&mut map, (0, 0), (5, 5));
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn scratch_state_survives_interleaved_searches() {
        let mut map = open_map(6, 6);
        wall(&mut map, 3, 0);
        wall(&mut map, 3, 1);

        let baseline = find(&mut map, (0, 0), (5, 0));
        let _other = find(&mut map, (5, 5), (0, 5));
        let repeat = find(&mut map, (0, 0), (5, 0));
        assert_eq!(baseline, repeat);
    }

    #[test]
    fn diagonal_refused_when_one_bridge_is_blocked() {
        // Bridges of the (0,0) -> (1,1) diagonal are (0,1) and (1,0);
        // blocking either one forbids the cut.
        for bridge in [(0, 1), (1, 0)] {
            let mut map = open_map(3, 3);
            wall(&mut map, bridge.0, bridge.1);

            let nodes = find(&mut map, (0, 0), (1, 1));
            assert_eq!(
                nodes.len(),
                2,
                "diagonal past blocked bridge {bridge:?} must detour, got {nodes:?}"
            );
        }
    }

    #[test]
    fn diagonal_allowed_when_both_bridges_are_open() {
        let mut map = open_map(3, 3);
        let nodes = find(&mut map, (0, 0), (1, 1));
        assert_eq!(nodes, vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn cost_bound_prunes_distant_goals() {
        let mut map = open_map(10, 1);

        let bounded = map.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(8, 0),
            BlockMask::WALL,
            3,
        );
        assert!(bounded.is_empty());

        let unbounded = map.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(8, 0),
            BlockMask::WALL,
            DEFAULT_SEARCH_BOUND,
        );
        assert_eq!(unbounded.len(), 8);
    }

    #[test]
    fn mask_selects_which_blockers_matter() {
        let mut map = open_map(3, 1);
        let _occupant = map.block_tile(CellCoord::new(1, 0), BlockClass::Character);

        let respecting = map.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
            BlockMask::WALL | BlockMask::CHARACTER,
            DEFAULT_SEARCH_BOUND,
        );
        assert!(respecting.is_empty(), "single row leaves no detour");

        let ignoring = map.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
            BlockMask::WALL,
            DEFAULT_SEARCH_BOUND,
        );
        assert_eq!(ignoring.len(), 2);
    }

    #[test]
    #[should_panic(expected = "path endpoints out of bounds")]
    fn out_of_bounds_endpoint_panics() {
        let mut map = open_map(3, 3);
        let _ = map.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(3, 3),
            BlockMask::WALL,
            DEFAULT_SEARCH_BOUND,
        );
    }
}
