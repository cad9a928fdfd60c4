use std::time::Duration;

use gridfare_core::{Action, BlockClass, BlockMask, CellCoord, Facing, PixelPos};
use gridfare_map::TileMap;
use gridfare_mover::{Mover, MoverKind};

#[test]
fn first_step_is_taken_without_a_tick_stall() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.set_destination(&mut map, CellCoord::new(3, 0), ms(0));

    assert_eq!(mover.action(), Action::Walk);
    assert_eq!(mover.cell(), CellCoord::new(1, 0));
    assert_eq!(mover.facing(), Facing::RIGHT);
    assert_eq!(mover.remaining_waypoints(), 2);
}

#[test]
fn destination_already_reached_is_a_no_op() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(2, 2));

    mover.set_destination(&mut map, CellCoord::new(2, 2), ms(0));

    assert_eq!(mover.action(), Action::Stand);
    assert_eq!(mover.remaining_waypoints(), 0);
}

#[test]
fn unreachable_destination_leaves_current_state() {
    let mut map = TileMap::new(5, 5);
    for cell in [(3, 4), (3, 3), (4, 3)] {
        let _wall = map.block_tile(CellCoord::new(cell.0, cell.1), BlockClass::Wall);
    }
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.set_destination(&mut map, CellCoord::new(4, 4), ms(0));

    assert_eq!(mover.action(), Action::Stand);
    assert_eq!(mover.cell(), CellCoord::new(0, 0));
    assert_eq!(mover.remaining_waypoints(), 0);
}

#[test]
fn steps_advance_on_the_step_cadence() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.set_destination(&mut map, CellCoord::new(2, 0), ms(0));
    assert_eq!(mover.cell(), CellCoord::new(1, 0));
    assert_eq!(mover.step_duration(), ms(150));

    mover.logic(&mut map, ms(149));
    assert_eq!(mover.cell(), CellCoord::new(1, 0), "step must not fire early");

    mover.logic(&mut map, ms(150));
    assert_eq!(mover.cell(), CellCoord::new(2, 0));
    assert_eq!(mover.action(), Action::Walk);

    mover.logic(&mut map, ms(300));
    assert_eq!(mover.action(), Action::Stand, "exhausted queue must stand");
}

#[test]
fn diagonal_steps_take_proportionally_longer() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.set_destination(&mut map, CellCoord::new(2, 2), ms(0));
    assert_eq!(mover.cell(), CellCoord::new(1, 1));
    assert_eq!(mover.facing(), Facing::RIGHT | Facing::DOWN);
    assert_eq!(mover.step_duration(), ms(212));

    mover.logic(&mut map, ms(211));
    assert_eq!(mover.cell(), CellCoord::new(1, 1));

    mover.logic(&mut map, ms(212));
    assert_eq!(mover.cell(), CellCoord::new(2, 2));
}

#[test]
fn walk_speed_override_rescales_step_durations() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));
    mover.set_walk_speed(ms(100));

    mover.set_destination(&mut map, CellCoord::new(1, 1), ms(0));
    assert_eq!(mover.step_duration(), ms(141));

    mover.logic(&mut map, ms(141));
    assert_eq!(mover.action(), Action::Stand);
    assert_eq!(mover.cell(), CellCoord::new(1, 1));
}

#[test]
fn newly_blocked_waypoint_reverts_to_stand_and_discards_queue() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.set_destination(&mut map, CellCoord::new(3, 0), ms(0));
    assert_eq!(mover.cell(), CellCoord::new(1, 0));
    assert_eq!(mover.remaining_waypoints(), 2);

    // The second waypoint turns into a wall between ticks.
    let _wall = map.block_tile(CellCoord::new(2, 0), BlockClass::Wall);

    mover.logic(&mut map, ms(150));
    assert_eq!(mover.action(), Action::Stand);
    assert_eq!(mover.cell(), CellCoord::new(1, 0));
    assert_eq!(
        mover.remaining_waypoints(),
        0,
        "a blocked step must discard the remaining queue"
    );
}

#[test]
fn occupancy_follows_the_mover() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));
    assert!(!map.walkable(CellCoord::new(0, 0), BlockMask::CHARACTER));

    mover.set_destination(&mut map, CellCoord::new(1, 0), ms(0));

    assert!(map.walkable(CellCoord::new(0, 0), BlockMask::CHARACTER));
    assert!(!map.walkable(CellCoord::new(1, 0), BlockMask::CHARACTER));
}

#[test]
fn monsters_route_around_characters() {
    let mut map = TileMap::new(3, 3);
    let _character = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(1, 1));
    let mut monster = Mover::spawn(&mut map, MoverKind::Monster, CellCoord::new(0, 1));

    monster.set_destination(&mut map, CellCoord::new(2, 1), ms(0));
    assert_eq!(monster.action(), Action::Walk);

    for tick in 1..40 {
        monster.logic(&mut map, ms(tick * 50));
        assert_ne!(
            monster.cell(),
            CellCoord::new(1, 1),
            "monster must never enter the character-held cell"
        );
    }
    assert_eq!(monster.cell(), CellCoord::new(2, 1));
    assert_eq!(monster.action(), Action::Stand);
}

#[test]
fn pixel_position_interpolates_between_cells() {
    let mut map = TileMap::new(5, 5);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));
    assert_eq!(mover.pixel_pos(), PixelPos::new(16, 16));

    mover.set_destination(&mut map, CellCoord::new(1, 0), ms(0));

    mover.logic(&mut map, ms(75));
    assert_eq!(
        mover.pixel_pos(),
        PixelPos::new(32, 16),
        "halfway through the step the pixel position sits between the cells"
    );

    mover.logic(&mut map, ms(150));
    assert_eq!(mover.action(), Action::Stand);
    assert_eq!(mover.pixel_pos(), PixelPos::new(48, 16));
}

#[test]
fn walk_towards_cancels_the_corner_cutting_axis() {
    let mut map = TileMap::new(3, 3);
    let _wall = map.block_tile(CellCoord::new(1, 0), BlockClass::Wall);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.walk_towards(&mut map, Facing::RIGHT | Facing::DOWN, ms(0));

    assert_eq!(mover.action(), Action::Walk);
    assert_eq!(mover.cell(), CellCoord::new(0, 1));
}

#[test]
fn walk_towards_only_turns_when_fully_blocked() {
    let mut map = TileMap::new(3, 3);
    for cell in [(1, 0), (0, 1), (1, 1)] {
        let _wall = map.block_tile(CellCoord::new(cell.0, cell.1), BlockClass::Wall);
    }
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));

    mover.walk_towards(&mut map, Facing::RIGHT | Facing::DOWN, ms(0));

    assert_eq!(mover.action(), Action::Stand);
    assert_eq!(mover.cell(), CellCoord::new(0, 0));
    assert_eq!(mover.facing(), Facing::RIGHT | Facing::DOWN);
}

#[test]
fn switching_maps_moves_the_occupancy_registration() {
    let mut old_map = TileMap::new(3, 3);
    let mut new_map = TileMap::new(4, 4);
    let cell = CellCoord::new(1, 1);
    let mut mover = Mover::spawn(&mut old_map, MoverKind::Character, cell);

    mover.switch_map(&mut old_map, &mut new_map);

    assert!(old_map.walkable(cell, BlockMask::CHARACTER));
    assert!(!new_map.walkable(cell, BlockMask::CHARACTER));
}

#[test]
fn despawn_releases_the_occupancy_registration() {
    let mut map = TileMap::new(3, 3);
    let cell = CellCoord::new(2, 0);
    let mover = Mover::spawn(&mut map, MoverKind::Monster, cell);
    assert!(!map.walkable(cell, BlockMask::MONSTER));

    mover.despawn(&mut map);
    assert!(map.walkable(cell, BlockMask::MONSTER));
}

#[test]
fn dead_movers_decline_destinations() {
    let mut map = TileMap::new(3, 3);
    let mut mover = Mover::spawn(&mut map, MoverKind::Character, CellCoord::new(0, 0));
    mover.die();

    mover.set_destination(&mut map, CellCoord::new(2, 2), ms(0));
    mover.walk_towards(&mut map, Facing::RIGHT, ms(0));

    assert_eq!(mover.action(), Action::Dead);
    assert_eq!(mover.cell(), CellCoord::new(0, 0));
    assert_eq!(mover.remaining_waypoints(), 0);
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
