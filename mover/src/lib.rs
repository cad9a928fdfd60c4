#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Mobile entities that walk a [`TileMap`] tick by tick.
//!
//! A [`Mover`] owns its logical cell, an interpolated pixel position,
//! a facing bitmask, an action state machine, and the waypoint queue it
//! is currently consuming. Callers own both the mover and the map and
//! pass the map into every operation that touches blocking state; the
//! mover keeps its occupancy registration paired across steps, map
//! switches, and despawn through the map's block handles.
//!
//! All timing is a monotonic `Duration` since an arbitrary epoch,
//! supplied by the caller. The mover never reads a clock and never
//! blocks.

use std::time::Duration;

use gridfare_core::{
    Action, AnimationLayer, BlockClass, BlockMask, Canvas, CellCoord, Facing, LayerSlot, Path,
    PixelPos, WeaponClass,
};
use gridfare_map::{BlockHandle, TileMap, DEFAULT_SEARCH_BOUND, TILE_LENGTH};
use log::trace;

/// Default walk speed: time to cross one orthogonal cell.
pub const DEFAULT_WALK_SPEED: Duration = Duration::from_millis(150);

/// Default duration of one attack swing.
pub const DEFAULT_ATTACK_SPEED: Duration = Duration::from_millis(350);

/// Ticks an emote bubble stays up.
pub const EMOTE_TICKS: u32 = 150;

/// Wall-clock lifetime of a speech line.
pub const SPEECH_TIME: Duration = Duration::from_millis(5000);

/// Wall-clock lifetime of a hit splash.
pub const HIT_SPLASH_TIME: Duration = Duration::from_millis(3000);

/// Kind of mover, selecting blocking category and walk behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoverKind {
    /// Player-shaped entity.
    Character,
    /// Hostile entity.
    Monster,
}

impl MoverKind {
    /// Category this mover registers under on the map.
    #[must_use]
    pub const fn block_class(self) -> BlockClass {
        match self {
            MoverKind::Character => BlockClass::Character,
            MoverKind::Monster => BlockClass::Monster,
        }
    }

    /// Blocking categories this mover's path queries respect.
    ///
    /// Characters ignore other characters so two of them may overlap a
    /// cell mid-transition; monsters avoid everything.
    #[must_use]
    pub const fn walk_mask(self) -> BlockMask {
        match self {
            MoverKind::Character => BlockMask::WALL.union(BlockMask::MONSTER),
            MoverKind::Monster => BlockMask::WALL
                .union(BlockMask::CHARACTER)
                .union(BlockMask::MONSTER),
        }
    }

    /// Frame count of the walk cycle.
    #[must_use]
    pub const fn walk_frames(self) -> u32 {
        match self {
            MoverKind::Character => 6,
            MoverKind::Monster => 4,
        }
    }
}

/// A mobile entity bound to a tile map.
pub struct Mover {
    kind: MoverKind,
    weapon: WeaponClass,
    cell: CellCoord,
    step_from: CellCoord,
    pixel: PixelPos,
    facing: Facing,
    action: Action,
    path: Path,
    step_started: Duration,
    step_duration: Duration,
    walk_speed: Duration,
    attack_speed: Duration,
    emote: Option<(u8, u32)>,
    speech: Option<(String, Duration)>,
    hit_splash: Option<(u16, Duration)>,
    layers: [Option<Box<dyn AnimationLayer>>; LayerSlot::COUNT],
    occupancy: Option<BlockHandle>,
}

impl std::fmt::Debug for Mover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mover")
            .field("kind", &self.kind)
            .field("cell", &self.cell)
            .field("facing", &self.facing)
            .field("action", &self.action)
            .field("queued", &self.path.len())
            .finish()
    }
}

impl Mover {
    /// Spawns a mover on the map, registering its occupancy.
    ///
    /// The spawn cell must lie within the map.
    pub fn spawn(map: &mut TileMap, kind: MoverKind, cell: CellCoord) -> Self {
        assert!(map.contains(cell), "spawn cell out of bounds: {cell:?}");
        let occupancy = map.block_tile(cell, kind.block_class());
        Self {
            kind,
            weapon: WeaponClass::default(),
            cell,
            step_from: cell,
            pixel: cell_centre(cell),
            facing: Facing::DOWN,
            action: Action::Stand,
            path: Path::empty(),
            step_started: Duration::ZERO,
            step_duration: Duration::ZERO,
            walk_speed: DEFAULT_WALK_SPEED,
            attack_speed: DEFAULT_ATTACK_SPEED,
            emote: None,
            speech: None,
            hit_splash: None,
            layers: std::array::from_fn(|_| None),
            occupancy: Some(occupancy),
        }
    }

    /// Despawns the mover, releasing its occupancy registration and
    /// every attached visual layer.
    pub fn despawn(mut self, map: &mut TileMap) {
        if let Some(handle) = self.occupancy.take() {
            map.free_tile(handle);
        }
        for layer in &mut self.layers {
            let _ = layer.take();
        }
    }

    /// Moves the mover to another map: occupancy is deregistered from
    /// the old map before being registered on the new one. Any queued
    /// path belonged to the old map and is discarded.
    pub fn switch_map(&mut self, old_map: &mut TileMap, new_map: &mut TileMap) {
        assert!(
            new_map.contains(self.cell),
            "mover cell {:?} out of bounds on new map",
            self.cell
        );
        if let Some(handle) = self.occupancy.take() {
            old_map.free_tile(handle);
        }
        self.occupancy = Some(new_map.block_tile(self.cell, self.kind.block_class()));
        self.path.clear();
    }

    /// Kind the mover was spawned as.
    #[must_use]
    pub const fn kind(&self) -> MoverKind {
        self.kind
    }

    /// Logical grid cell the mover occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Current facing bitmask.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Current action state.
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Interpolated pixel position of the cell centre, as of the most
    /// recent [`Mover::logic`] call.
    #[must_use]
    pub const fn pixel_pos(&self) -> PixelPos {
        self.pixel
    }

    /// Expected duration of the step currently being walked.
    #[must_use]
    pub const fn step_duration(&self) -> Duration {
        self.step_duration
    }

    /// Number of waypoints still queued.
    #[must_use]
    pub fn remaining_waypoints(&self) -> usize {
        self.path.len()
    }

    /// Emote currently displayed, if any.
    #[must_use]
    pub fn emote(&self) -> Option<u8> {
        self.emote.map(|(id, _)| id)
    }

    /// Speech line currently displayed, if any.
    #[must_use]
    pub fn speech(&self) -> Option<&str> {
        self.speech.as_ref().map(|(text, _)| text.as_str())
    }

    /// Hit splash currently displayed, if any. Zero means a miss.
    #[must_use]
    pub fn hit_splash(&self) -> Option<u16> {
        self.hit_splash.map(|(amount, _)| amount)
    }

    /// Overrides the walk speed (time per orthogonal cell).
    pub fn set_walk_speed(&mut self, speed: Duration) {
        self.walk_speed = speed;
    }

    /// Overrides the attack swing duration.
    pub fn set_attack_speed(&mut self, speed: Duration) {
        self.attack_speed = speed;
    }

    /// Equips a weapon class, selecting future attack animations.
    pub fn set_weapon(&mut self, weapon: WeaponClass) {
        self.weapon = weapon;
    }

    /// Attaches an animation layer to a slot, replacing any previous
    /// occupant. The layer is synchronised to the current facing and
    /// action before the first tick reaches it.
    pub fn attach_layer(&mut self, slot: LayerSlot, mut layer: Box<dyn AnimationLayer>) {
        layer.set_direction(self.facing.sprite_direction());
        if let Some(animation) = self.action.animation() {
            layer.play(animation);
        }
        self.layers[slot.index()] = Some(layer);
    }

    /// Detaches and returns the layer in a slot.
    pub fn detach_layer(&mut self, slot: LayerSlot) -> Option<Box<dyn AnimationLayer>> {
        self.layers[slot.index()].take()
    }

    /// Reports whether a slot holds a layer.
    #[must_use]
    pub fn has_layer(&self, slot: LayerSlot) -> bool {
        self.layers[slot.index()].is_some()
    }

    /// Borrows the layer in a slot.
    ///
    /// The slot must be occupied; asking for an empty slot is a caller
    /// bug and panics.
    #[must_use]
    pub fn layer(&self, slot: LayerSlot) -> &dyn AnimationLayer {
        self.layers[slot.index()]
            .as_deref()
            .unwrap_or_else(|| panic!("no animation layer in slot {slot:?}"))
    }

    /// Requests movement to a target cell.
    ///
    /// A no-op when already there or when dead. When the map yields no
    /// route the mover stays in its current state. A non-empty route
    /// replaces any queued path, and unless the mover is already
    /// walking the first step is taken immediately so movement starts
    /// without a one-tick stall.
    pub fn set_destination(&mut self, map: &mut TileMap, target: CellCoord, now: Duration) {
        if self.action == Action::Dead || self.cell == target {
            return;
        }

        let path = map.find_path(self.cell, target, self.kind.walk_mask(), DEFAULT_SEARCH_BOUND);
        if path.is_empty() {
            trace!("no route to {target:?}, staying {:?}", self.action);
            return;
        }

        self.path = path;
        if self.action != Action::Walk {
            self.step_started = now;
            self.step_duration = Duration::ZERO;
            self.advance_step(map);
        }
    }

    /// Keyboard-style movement: walks one cell in the direction of the
    /// pressed facing bits.
    ///
    /// A delta axis whose orthogonal neighbour collides is cancelled so
    /// the mover cannot skip a corner; a diagonal whose target collides
    /// falls back to the vertical axis. When no movement is possible
    /// the mover only turns to face the requested direction.
    pub fn walk_towards(&mut self, map: &mut TileMap, direction: Facing, now: Duration) {
        if direction.is_empty() || self.action == Action::Dead {
            return;
        }
        if self.action == Action::Walk && !self.path.is_empty() {
            // Finish the current step first, otherwise the queue and
            // the committed cell drift apart.
            return;
        }

        let mut dx: i64 = 0;
        let mut dy: i64 = 0;
        if direction.contains(Facing::UP) {
            dy -= 1;
        }
        if direction.contains(Facing::DOWN) {
            dy += 1;
        }
        if direction.contains(Facing::LEFT) {
            dx -= 1;
        }
        if direction.contains(Facing::RIGHT) {
            dx += 1;
        }

        if dx != 0 && self.collides(map, dx, 0) {
            dx = 0;
        }
        if dy != 0 && self.collides(map, 0, dy) {
            dy = 0;
        }
        // Blocked diagonal target: prefer the vertical axis.
        if dx != 0 && dy != 0 && self.collides(map, dx, dy) {
            dx = 0;
        }

        if (dx != 0 || dy != 0) && !self.collides(map, dx, dy) {
            let target = offset_cell(self.cell, dx, dy)
                .unwrap_or_else(|| unreachable!("collision test admitted an unmapped cell"));
            self.set_destination(map, target, now);
        } else {
            self.set_facing(direction);
        }
    }

    /// Turns toward a facing and propagates the sprite direction to
    /// every attached layer. Empty facings are ignored.
    pub fn set_facing(&mut self, facing: Facing) {
        if facing.is_empty() {
            return;
        }
        self.facing = facing;
        let direction = facing.sprite_direction();
        for layer in self.layers.iter_mut().flatten() {
            layer.set_direction(direction);
        }
    }

    /// Applies an action transition and drives the attached layers.
    ///
    /// Entering an attack rewinds every layer to frame zero before
    /// playback so no stale frame blends into the swing, and stretches
    /// the clip over the configured attack speed. `Dead` is terminal:
    /// once dead, only `Dead` itself is accepted again. `Hurt` requests
    /// are deliberately ignored; honouring them is known to leave
    /// movers unable to attack again until their next move.
    pub fn set_action(&mut self, action: Action) {
        if self.action == Action::Dead && action != Action::Dead {
            return;
        }
        let Some(animation) = action.animation() else {
            trace!("dropping inert transition to {action:?}");
            return;
        };

        if matches!(action, Action::Attack(_)) {
            for layer in self.layers.iter_mut().flatten() {
                layer.reset();
                layer.play_timed(animation, self.attack_speed);
            }
        } else {
            for layer in self.layers.iter_mut().flatten() {
                layer.play(animation);
            }
        }
        self.action = action;
    }

    /// Starts an attack swing toward a target cell.
    ///
    /// Attacks only begin while standing still. The mover faces the
    /// target first; the vertical axis wins whenever the vertical
    /// distance is at least the horizontal one.
    pub fn attack(&mut self, target: CellCoord, now: Duration) {
        if self.action != Action::Stand {
            return;
        }

        let dx = i64::from(target.column()) - i64::from(self.cell.column());
        let dy = i64::from(target.row()) - i64::from(self.cell.row());
        if dx != 0 || dy != 0 {
            let facing = if dy.abs() >= dx.abs() {
                if dy > 0 {
                    Facing::DOWN
                } else {
                    Facing::UP
                }
            } else if dx > 0 {
                Facing::RIGHT
            } else {
                Facing::LEFT
            };
            self.set_facing(facing);
        }

        self.set_action(Action::Attack(self.weapon.attack_style()));
        self.step_started = now;
    }

    /// Toggles between standing and sitting.
    pub fn toggle_sit(&mut self) {
        match self.action {
            Action::Stand => self.set_action(Action::Sit),
            Action::Sit => self.set_action(Action::Stand),
            _ => {}
        }
    }

    /// Kills the mover. Terminal: walk and attack requests are ignored
    /// from here on; removal from the world stays with the owner.
    pub fn die(&mut self) {
        self.set_action(Action::Dead);
    }

    /// Requests the hurt reaction. Deliberately inert; see
    /// [`Mover::set_action`].
    pub fn hurt(&mut self) {
        self.set_action(Action::Hurt);
    }

    /// Shows an emote bubble for [`EMOTE_TICKS`] simulation ticks.
    pub fn set_emote(&mut self, emote: u8) {
        self.emote = Some((emote, EMOTE_TICKS));
    }

    /// Shows a speech line for [`SPEECH_TIME`].
    pub fn say(&mut self, text: String, now: Duration) {
        self.speech = Some((text, now));
    }

    /// Shows a hit splash for [`HIT_SPLASH_TIME`]. Zero means a miss.
    pub fn show_hit(&mut self, amount: u16, now: Duration) {
        self.hit_splash = Some((amount, now));
    }

    /// Frame of the current walk or attack animation at `now`, clamped
    /// to the clip's last frame. Idle actions report frame zero.
    #[must_use]
    pub fn current_frame(&self, now: Duration) -> u32 {
        let (frames, duration) = match self.action {
            Action::Walk => (self.kind.walk_frames(), self.walk_speed),
            Action::Attack(_) => (self.weapon.attack_frames(), self.attack_speed),
            _ => return 0,
        };
        let duration_ms = duration.as_millis().max(1) as u64;
        let elapsed_ms = now.saturating_sub(self.step_started).as_millis() as u64;
        let frame = elapsed_ms * u64::from(frames) / duration_ms;
        u32::try_from(frame.min(u64::from(frames.saturating_sub(1)))).unwrap_or(0)
    }

    /// Advances one simulation tick.
    ///
    /// Walk steps and attack completion fire here; the interpolated
    /// pixel position, the timed visual counters, and every attached
    /// layer are brought up to `now` afterwards, so a following draw
    /// never observes a half-updated position/facing pair.
    pub fn logic(&mut self, map: &mut TileMap, now: Duration) {
        match self.action {
            Action::Walk => {
                if now.saturating_sub(self.step_started) >= self.step_duration {
                    self.advance_step(map);
                }
            }
            Action::Attack(_) => {
                if now.saturating_sub(self.step_started) >= self.attack_speed {
                    self.advance_step(map);
                }
            }
            _ => {}
        }

        if let Some((id, ticks)) = self.emote.take() {
            let ticks = ticks.saturating_sub(1);
            if ticks > 0 {
                self.emote = Some((id, ticks));
            }
        }
        let speech_expired = self
            .speech
            .as_ref()
            .map_or(false, |(_, since)| now.saturating_sub(*since) > SPEECH_TIME);
        if speech_expired {
            self.speech = None;
        }
        if let Some((_, since)) = self.hit_splash {
            if now.saturating_sub(since) > HIT_SPLASH_TIME {
                self.hit_splash = None;
            }
        }

        self.update_pixel_pos(now);

        for layer in self.layers.iter_mut().flatten() {
            layer.update(now);
        }
    }

    /// Draws every attached layer at the interpolated pixel position.
    /// Side-effect free with respect to game state.
    pub fn draw(&self, canvas: &mut dyn Canvas, offset_x: i32, offset_y: i32) {
        for slot in LayerSlot::ALL {
            if self.layers[slot.index()].is_some() {
                canvas.draw_sprite(slot, self.pixel.x + offset_x, self.pixel.y + offset_y);
            }
        }
    }

    /// Consumes the next waypoint, or stands when none remain.
    ///
    /// The target cell is re-validated against the walk mask right
    /// before committing: a cell that turned blocked since the path was
    /// planned reverts the mover to standing and discards the rest of
    /// the queue. No partial re-route is attempted; callers issue a
    /// fresh destination request instead.
    fn advance_step(&mut self, map: &mut TileMap) {
        let Some(node) = self.path.take_next() else {
            self.set_action(Action::Stand);
            return;
        };

        if !map.walkable(node, self.kind.walk_mask()) {
            trace!("step target {node:?} turned blocked, dropping path");
            self.path.clear();
            self.set_action(Action::Stand);
            return;
        }

        let dx = i64::from(node.column()) - i64::from(self.cell.column());
        let dy = i64::from(node.row()) - i64::from(self.cell.row());
        self.set_facing(Facing::from_deltas(dx, dy));

        if let Some(handle) = self.occupancy.take() {
            map.free_tile(handle);
        }
        self.occupancy = Some(map.block_tile(node, self.kind.block_class()));

        self.step_from = self.cell;
        self.cell = node;
        self.set_action(Action::Walk);

        // The new step's clock starts where the previous step ended,
        // not at the tick that noticed it, so timing never drifts.
        self.step_started += self.step_duration;
        self.step_duration = step_duration(self.walk_speed, dx, dy);
    }

    fn update_pixel_pos(&mut self, now: Duration) {
        let centre = cell_centre(self.cell);
        let tile = TILE_LENGTH as i64;
        let step_x = (i64::from(self.cell.column()) - i64::from(self.step_from.column())) * tile;
        let step_y = (i64::from(self.cell.row()) - i64::from(self.step_from.row())) * tile;
        self.pixel = PixelPos::new(
            centre.x + self.walk_offset(now, step_x),
            centre.y + self.walk_offset(now, step_y),
        );
    }

    /// Pixel offset from the step's target cell back toward its source,
    /// proportional to the time still remaining in the step.
    fn walk_offset(&self, now: Duration, step: i64) -> i32 {
        if self.action != Action::Walk || step == 0 {
            return 0;
        }
        let duration_ms = self.step_duration.as_millis() as i64;
        if duration_ms == 0 {
            return 0;
        }

        let elapsed_ms = now.saturating_sub(self.step_started).as_millis() as i64;
        let magnitude = step.abs();
        let mut offset = elapsed_ms * magnitude / duration_ms - magnitude;
        if offset > 0 {
            offset = 0;
        }
        if step < 0 {
            offset = -offset;
        }
        i32::try_from(offset).unwrap_or(0)
    }

    fn collides(&self, map: &TileMap, dx: i64, dy: i64) -> bool {
        match offset_cell(self.cell, dx, dy) {
            Some(cell) => !map.contains(cell) || !map.walkable(cell, self.kind.walk_mask()),
            None => true,
        }
    }
}

/// Duration of one step covering the given cell delta, scaled by the
/// Euclidean step length so diagonals take proportionally longer.
fn step_duration(walk_speed: Duration, dx: i64, dy: i64) -> Duration {
    let length = (((dx * dx) + (dy * dy)) as f64).sqrt();
    let millis = walk_speed.as_millis() as f64 * length;
    Duration::from_millis(millis as u64)
}

fn cell_centre(cell: CellCoord) -> PixelPos {
    let tile = TILE_LENGTH as i64;
    let x = i64::from(cell.column()) * tile + tile / 2;
    let y = i64::from(cell.row()) * tile + tile / 2;
    PixelPos::new(
        i32::try_from(x).unwrap_or(i32::MAX),
        i32::try_from(y).unwrap_or(i32::MAX),
    )
}

fn offset_cell(cell: CellCoord, dx: i64, dy: i64) -> Option<CellCoord> {
    let column = i64::from(cell.column()) + dx;
    let row = i64::from(cell.row()) + dy;
    match (u32::try_from(column), u32::try_from(row)) {
        (Ok(column), Ok(row)) => Some(CellCoord::new(column, row)),
        _ => None,
    }
}
