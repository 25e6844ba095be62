//! Turn and step primitives on the toroidal grid

use crate::game::state::{Direction, Position, TurnDirection};

/// Rotate one step along UP -> RIGHT -> DOWN -> LEFT
#[inline]
pub fn turn(direction: Direction, turn: TurnDirection) -> Direction {
    let len = Direction::CYCLE.len();
    let idx = direction.index();
    let next = match turn {
        TurnDirection::Left => (idx + len - 1) % len,
        TurnDirection::Right => (idx + 1) % len,
    };
    Direction::CYCLE[next]
}

/// Step one cell in `direction`, wrapping on both axes
#[inline]
pub fn step(position: Position, direction: Direction, width: u32, height: u32) -> Position {
    let Position { x, y } = position;
    match direction {
        Direction::Up => Position::new(x, if y == 0 { height - 1 } else { y - 1 }),
        Direction::Right => Position::new(if x + 1 >= width { 0 } else { x + 1 }, y),
        Direction::Down => Position::new(x, if y + 1 >= height { 0 } else { y + 1 }),
        Direction::Left => Position::new(if x == 0 { width - 1 } else { x - 1 }, y),
    }
}
