#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridfare crates.
//!
//! This crate defines the vocabulary that connects the tile map, the
//! movers that walk it, and the adapters that render them: cell and
//! pixel coordinates, blocking categories and walk masks, the facing
//! bitmask, the action state enum, the waypoint path container, and the
//! narrow traits behind which rendering and animation playback live.

use std::collections::VecDeque;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

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
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Reports whether two cells touch orthogonally or diagonally.
    #[must_use]
    pub fn is_adjacent_to(self, other: CellCoord) -> bool {
        let column_diff = self.column.abs_diff(other.column);
        let row_diff = self.row.abs_diff(other.row);
        column_diff <= 1 && row_diff <= 1 && column_diff + row_diff != 0
    }
}

/// Continuous position measured in pixels from the map origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPos {
    /// Horizontal pixel coordinate.
    pub x: i32,
    /// Vertical pixel coordinate.
    pub y: i32,
}

impl PixelPos {
    /// Creates a new pixel position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

bitflags! {
    /// Facing of a mover, encoded as independent direction bits.
    ///
    /// Diagonal facings combine one vertical and one horizontal bit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Facing: u8 {
        /// Toward decreasing row indices.
        const UP = 0b0001;
        /// Toward increasing row indices.
        const DOWN = 0b0010;
        /// Toward decreasing column indices.
        const LEFT = 0b0100;
        /// Toward increasing column indices.
        const RIGHT = 0b1000;
    }
}

impl Facing {
    /// Derives a facing from the signs of a movement delta.
    ///
    /// Horizontal and vertical components are tested independently, so
    /// diagonal deltas yield two set bits. A zero delta yields an empty
    /// facing.
    #[must_use]
    pub fn from_deltas(dx: i64, dy: i64) -> Self {
        let mut facing = Facing::empty();
        if dx > 0 {
            facing |= Facing::RIGHT;
        } else if dx < 0 {
            facing |= Facing::LEFT;
        }
        if dy > 0 {
            facing |= Facing::DOWN;
        } else if dy < 0 {
            facing |= Facing::UP;
        }
        facing
    }

    /// Collapses the bitmask to the single direction a sprite sheet uses.
    ///
    /// Vertical bits win over horizontal bits when both are set. The
    /// precedence is a fixed rule; facing consistency across clients
    /// relies on every implementation agreeing on it.
    #[must_use]
    pub fn sprite_direction(self) -> SpriteDirection {
        if self.contains(Facing::UP) {
            SpriteDirection::Up
        } else if self.contains(Facing::DOWN) {
            SpriteDirection::Down
        } else if self.contains(Facing::RIGHT) {
            SpriteDirection::Right
        } else {
            SpriteDirection::Left
        }
    }
}

/// Single direction selecting a row of a directional sprite sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteDirection {
    /// Facing toward decreasing rows.
    Up,
    /// Facing toward increasing rows.
    Down,
    /// Facing toward decreasing columns.
    Left,
    /// Facing toward increasing columns.
    Right,
}

/// Category under which a blocker registers on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockClass {
    /// Static level geometry.
    Wall,
    /// A player-controlled or player-shaped occupant.
    Character,
    /// A hostile occupant.
    Monster,
}

impl BlockClass {
    /// Number of distinct blocking categories.
    pub const COUNT: usize = 3;

    /// Dense index of the category, used for per-category counter planes.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            BlockClass::Wall => 0,
            BlockClass::Character => 1,
            BlockClass::Monster => 2,
        }
    }

    /// Mask bit contributed by this category.
    #[must_use]
    pub const fn mask(self) -> BlockMask {
        match self {
            BlockClass::Wall => BlockMask::WALL,
            BlockClass::Character => BlockMask::CHARACTER,
            BlockClass::Monster => BlockMask::MONSTER,
        }
    }
}

bitflags! {
    /// Set of blocking categories a walkability query must respect.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct BlockMask: u8 {
        /// Blocked by static level geometry.
        const WALL = 0b0001;
        /// Blocked by characters.
        const CHARACTER = 0b0010;
        /// Blocked by monsters.
        const MONSTER = 0b0100;
    }
}

/// Style of attack animation selected by the equipped weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackStyle {
    /// Bare-handed swing.
    Melee,
    /// Short-bladed stab.
    Thrust,
    /// Projectile release.
    Ranged,
}

/// Weapon category carried by a mover.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponClass {
    /// No weapon equipped.
    #[default]
    Unarmed,
    /// Knives, daggers, and short swords.
    Blade,
    /// Bows.
    Bow,
}

impl WeaponClass {
    /// Attack style played when swinging this weapon.
    #[must_use]
    pub const fn attack_style(self) -> AttackStyle {
        match self {
            WeaponClass::Unarmed => AttackStyle::Melee,
            WeaponClass::Blade => AttackStyle::Thrust,
            WeaponClass::Bow => AttackStyle::Ranged,
        }
    }

    /// Frame count of the attack animation.
    ///
    /// Ranged weapons carry one extra frame for the release.
    #[must_use]
    pub const fn attack_frames(self) -> u32 {
        match self {
            WeaponClass::Unarmed | WeaponClass::Blade => 4,
            WeaponClass::Bow => 5,
        }
    }
}

/// Gameplay action a mover is currently performing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Standing idle.
    #[default]
    Stand,
    /// Walking along a waypoint queue.
    Walk,
    /// Sitting on the ground.
    Sit,
    /// Swinging the equipped weapon.
    Attack(AttackStyle),
    /// Dead; terminal for gameplay purposes.
    Dead,
    /// Reacting to a hit. Transitions into this state are deliberately
    /// ignored; see [`Action::animation`].
    Hurt,
}

impl Action {
    /// Animation played for this action, if the action is playable.
    ///
    /// `Hurt` has no playable animation: entering it is known to leave
    /// movers locked out of attacking until their next move, so
    /// requests to enter it are dropped and this returns `None`.
    #[must_use]
    pub const fn animation(self) -> Option<AnimationId> {
        match self {
            Action::Stand => Some(AnimationId::Stand),
            Action::Walk => Some(AnimationId::Walk),
            Action::Sit => Some(AnimationId::Sit),
            Action::Attack(AttackStyle::Melee) => Some(AnimationId::Attack),
            Action::Attack(AttackStyle::Thrust) => Some(AnimationId::AttackThrust),
            Action::Attack(AttackStyle::Ranged) => Some(AnimationId::AttackRanged),
            Action::Dead => Some(AnimationId::Dead),
            Action::Hurt => None,
        }
    }
}

/// Identifier of an animation clip understood by attached layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationId {
    /// Idle loop.
    Stand,
    /// Walk cycle.
    Walk,
    /// Sitting pose.
    Sit,
    /// Death sequence.
    Dead,
    /// Bare-handed attack swing.
    Attack,
    /// Stabbing attack.
    AttackThrust,
    /// Bow attack with release frame.
    AttackRanged,
}

/// Visual layer slot on a mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerSlot {
    /// Body sprite.
    Base,
    /// Clothing overlay.
    Wear,
    /// Hair overlay.
    Hair,
    /// Equipped weapon overlay.
    Weapon,
}

impl LayerSlot {
    /// Number of layer slots on a mover.
    pub const COUNT: usize = 4;

    /// All slots in draw order, back to front.
    pub const ALL: [LayerSlot; LayerSlot::COUNT] = [
        LayerSlot::Base,
        LayerSlot::Wear,
        LayerSlot::Hair,
        LayerSlot::Weapon,
    ];

    /// Dense index of the slot.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            LayerSlot::Base => 0,
            LayerSlot::Wear => 1,
            LayerSlot::Hair => 2,
            LayerSlot::Weapon => 3,
        }
    }
}

/// Ordered sequence of cells a mover should walk, consumed front to back.
///
/// A path is never restartable: once a waypoint has been taken it is
/// gone, and re-routing requires computing a fresh path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    nodes: VecDeque<CellCoord>,
}

impl Path {
    /// Creates an empty path, the "no route" value.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a path from waypoints ordered start-side first.
    #[must_use]
    pub fn from_nodes(nodes: Vec<CellCoord>) -> Self {
        Self {
            nodes: nodes.into(),
        }
    }

    /// Reports whether any waypoints remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of waypoints remaining.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Next waypoint without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<CellCoord> {
        self.nodes.front().copied()
    }

    /// Consumes and returns the next waypoint.
    pub fn take_next(&mut self) -> Option<CellCoord> {
        self.nodes.pop_front()
    }

    /// Discards all remaining waypoints.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Iterator over the remaining waypoints in walk order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.nodes.iter().copied()
    }
}

/// Animation playback attached to one layer slot of a mover.
///
/// Implementations own frame state; the mover only drives transitions
/// and forwards wall-clock time so frame advancement stays accurate
/// regardless of simulation tick granularity.
pub trait AnimationLayer {
    /// Starts the clip at its natural duration.
    fn play(&mut self, animation: AnimationId);

    /// Starts the clip stretched to the provided total duration.
    fn play_timed(&mut self, animation: AnimationId, duration: Duration);

    /// Rewinds the current clip to frame zero.
    fn reset(&mut self);

    /// Selects the sprite-sheet row for the given facing.
    fn set_direction(&mut self, direction: SpriteDirection);

    /// Advances playback to the provided monotonic timestamp.
    fn update(&mut self, now: Duration);
}

/// Render sink accepting "draw sprite layer at pixel (x, y)" calls.
pub trait Canvas {
    /// Draws one layer of a mover at the given pixel position.
    fn draw_sprite(&mut self, slot: LayerSlot, x: i32, y: i32);
}
