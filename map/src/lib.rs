#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tile map ownership for Gridfare: blocking state, occupancy counters,
//! and the bounded A* search over the grid.
//!
//! The map is a leaf component. It knows nothing about the movers that
//! walk it beyond the occupancy registrations they make through
//! [`TileMap::block_tile`] and [`TileMap::free_tile`]; everything else
//! it offers is a query.

mod pathfinder;

pub use pathfinder::{DEFAULT_SEARCH_BOUND, DIAGONAL_COST, UNIT_COST};

use gridfare_core::{BlockClass, BlockMask, CellCoord};

/// Side length of a square tile measured in pixels.
pub const TILE_LENGTH: u32 = 32;

/// One grid cell: its blocking state plus the search scratch fields.
///
/// The scratch fields are reset lazily. Membership in the open or
/// closed set of a search is encoded by comparing `mark` against the
/// map's current generation markers, so successive searches reuse the
/// storage without a full-grid clear.
#[derive(Clone, Debug)]
pub(crate) struct Tile {
    pub(crate) blockmask: BlockMask,
    pub(crate) g_cost: i32,
    pub(crate) h_cost: i32,
    pub(crate) f_cost: i32,
    pub(crate) mark: u32,
    pub(crate) parent: CellCoord,
}

impl Tile {
    fn new() -> Self {
        Self {
            blockmask: BlockMask::empty(),
            g_cost: 0,
            h_cost: 0,
            f_cost: 0,
            mark: 0,
            parent: CellCoord::new(0, 0),
        }
    }
}

/// Receipt for one occupancy registration on one cell.
///
/// Freeing consumes the handle, so a registration can never be released
/// twice, and `#[must_use]` keeps an acquisition from being dropped
/// unnoticed. Map-lifetime blockers such as walls painted at load time
/// may intentionally retain their handles for as long as the map lives.
#[derive(Debug)]
#[must_use = "occupancy stays registered until the handle is freed"]
pub struct BlockHandle {
    cell: CellCoord,
    class: BlockClass,
}

impl BlockHandle {
    /// Cell the registration blocks.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Category the registration blocks under.
    #[must_use]
    pub const fn class(&self) -> BlockClass {
        self.class
    }
}

/// Dense tile grid with per-category occupancy counters.
///
/// Tiles and counters live for the lifetime of the loaded map. All
/// mutation is single-threaded; the search requires `&mut self` because
/// it stamps scratch state into the tiles.
#[derive(Debug)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    occupation: [Vec<u32>; BlockClass::COUNT],
    open_mark: u32,
    closed_mark: u32,
    last_expansions: u32,
}

impl TileMap {
    /// Creates an all-walkable map of the given dimensions in cells.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            width,
            height,
            tiles: vec![Tile::new(); capacity],
            occupation: std::array::from_fn(|_| vec![0; capacity]),
            closed_mark: 1,
            open_mark: 2,
            last_expansions: 0,
        }
    }

    /// Width of the map in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the map in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether the cell lies within the map bounds.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Reports whether the cell passes the walkability test for `mask`.
    ///
    /// The cell must lie within the map; querying an out-of-bounds cell
    /// is a caller bug and panics.
    #[must_use]
    pub fn walkable(&self, cell: CellCoord, mask: BlockMask) -> bool {
        let index = self
            .index(cell)
            .unwrap_or_else(|| panic!("walkability query out of bounds: {cell:?}"));
        !self.tiles[index].blockmask.intersects(mask)
    }

    /// Registers one blocker of the given category on the cell.
    ///
    /// Counters support overlapping blockers: the cell stays blocked
    /// for the category until every registration has been freed. The
    /// cell must lie within the map.
    pub fn block_tile(&mut self, cell: CellCoord, class: BlockClass) -> BlockHandle {
        let index = self
            .index(cell)
            .unwrap_or_else(|| panic!("block registration out of bounds: {cell:?}"));
        let counter = &mut self.occupation[class.index()][index];
        *counter = counter.saturating_add(1);
        self.tiles[index].blockmask |= class.mask();
        BlockHandle { cell, class }
    }

    /// Releases one blocker previously registered with
    /// [`TileMap::block_tile`], consuming its handle.
    pub fn free_tile(&mut self, handle: BlockHandle) {
        let Some(index) = self.index(handle.cell) else {
            // A handle can only be minted for an in-bounds cell.
            unreachable!("block handle for out-of-bounds cell {:?}", handle.cell);
        };
        let counter = &mut self.occupation[handle.class.index()][index];
        *counter = counter.saturating_sub(1);
        if *counter == 0 {
            self.tiles[index].blockmask &= !handle.class.mask();
        }
    }

    /// Number of cells expanded by the most recent search.
    ///
    /// A search that returns before expanding anything (degenerate
    /// input, blocked goal) reports zero.
    #[must_use]
    pub const fn last_search_expansions(&self) -> u32 {
        self.last_expansions
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    pub(crate) fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    pub(crate) fn tile_mut(&mut self, index: usize) -> &mut Tile {
        &mut self.tiles[index]
    }

    pub(crate) fn advance_marks(&mut self) {
        self.open_mark = self.open_mark.wrapping_add(2);
        self.closed_mark = self.closed_mark.wrapping_add(2);
    }

    pub(crate) const fn open_mark(&self) -> u32 {
        self.open_mark
    }

    pub(crate) const fn closed_mark(&self) -> u32 {
        self.closed_mark
    }

    pub(crate) fn record_expansions(&mut self, expansions: u32) {
        self.last_expansions = expansions;
    }
}
