//! Game state definitions and structures
//!
//! Contains the grid paint map, ants, players and the wire-facing enums.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::grid::UNPAINTED;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Unique ant identifier
pub type AntId = Uuid;

/// A `#RRGGBB` color string
pub type Color = String;

/// Cell coordinate on the toroidal grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Facing direction, cyclic in declaration order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in clockwise order
    pub const CYCLE: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }
}

/// Turn command carried by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Parse the wire form (`"LEFT"` / `"RIGHT"`)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LEFT" => Some(TurnDirection::Left),
            "RIGHT" => Some(TurnDirection::Right),
            _ => None,
        }
    }
}

/// A single transition rule: on `current_color`, paint `new_color` and turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub current_color: Color,
    pub new_color: Color,
    pub turn_direction: TurnDirection,
}

impl Rule {
    pub fn new(
        current_color: impl Into<Color>,
        new_color: impl Into<Color>,
        turn_direction: TurnDirection,
    ) -> Self {
        Self {
            current_color: current_color.into(),
            new_color: new_color.into(),
            turn_direction,
        }
    }
}

/// Autonomous agent owned by a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ant {
    pub id: AntId,
    pub position: Position,
    pub direction: Direction,
    /// Owning player's display color
    pub color: Color,
    pub rules: Vec<Rule>,
}

impl Ant {
    /// First rule whose `current_color` equals `cell_color` exactly
    pub fn matching_rule(&self, cell_color: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.current_color == cell_color)
    }
}

/// Connected player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub color: Color,
    pub ant_id: Option<AntId>,
}

impl Player {
    pub fn new(id: PlayerId, color: Color) -> Self {
        Self {
            id,
            color,
            ant_id: None,
        }
    }
}

/// Sparse paint map. Only non-sentinel colors are stored.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: u32,
    pub height: u32,
    pub cells: HashMap<Position, Color>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: HashMap::new(),
        }
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Stored color of a cell, or the unpainted sentinel
    #[inline]
    pub fn color_at(&self, position: Position) -> &str {
        self.cells
            .get(&position)
            .map(String::as_str)
            .unwrap_or(UNPAINTED)
    }

    /// Paint a cell. Painting the sentinel clears the entry.
    pub fn paint(&mut self, position: Position, color: &str) {
        if color == UNPAINTED {
            self.cells.remove(&position);
        } else if self.cells.get(&position).map(String::as_str) != Some(color) {
            self.cells.insert(position, color.to_string());
        }
    }

    pub fn painted_count(&self) -> usize {
        self.cells.len()
    }
}

/// Authoritative game state: grid, ants (creation order) and players
#[derive(Debug, Clone)]
pub struct GameState {
    pub grid: Grid,
    pub ants: Vec<Ant>,
    pub players: HashMap<PlayerId, Player>,
}

impl GameState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: Grid::new(width, height),
            ants: Vec::new(),
            players: HashMap::new(),
        }
    }

    pub fn get_player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    pub fn get_ant(&self, ant_id: AntId) -> Option<&Ant> {
        self.ants.iter().find(|a| a.id == ant_id)
    }

    /// Ant owned by a player, if one has been placed
    pub fn ant_for_player(&self, player_id: PlayerId) -> Option<&Ant> {
        let ant_id = self.players.get(&player_id)?.ant_id?;
        self.get_ant(ant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_wire_format() {
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"UP\"");
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"LEFT\"");
    }

    #[test]
    fn test_rule_wire_format() {
        let rule = Rule::new("#FFFFFF", "#000000", TurnDirection::Right);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["currentColor"], "#FFFFFF");
        assert_eq!(json["newColor"], "#000000");
        assert_eq!(json["turnDirection"], "RIGHT");
    }

    #[test]
    fn test_turn_direction_parse() {
        assert_eq!(TurnDirection::parse("LEFT"), Some(TurnDirection::Left));
        assert_eq!(TurnDirection::parse("RIGHT"), Some(TurnDirection::Right));
        assert_eq!(TurnDirection::parse("left"), None);
        assert_eq!(TurnDirection::parse("INVALID"), None);
    }

    #[test]
    fn test_grid_unpainted_by_default() {
        let grid = Grid::new(10, 10);
        assert_eq!(grid.color_at(Position::new(3, 4)), UNPAINTED);
        assert_eq!(grid.painted_count(), 0);
    }

    #[test]
    fn test_grid_paint_sentinel_clears() {
        let mut grid = Grid::new(10, 10);
        let pos = Position::new(1, 1);

        grid.paint(pos, "#123456");
        assert_eq!(grid.color_at(pos), "#123456");

        grid.paint(pos, UNPAINTED);
        assert!(!grid.cells.contains_key(&pos));
        assert_eq!(grid.color_at(pos), UNPAINTED);
    }

    #[test]
    fn test_grid_contains() {
        let grid = Grid::new(10, 5);
        assert!(grid.contains(Position::new(9, 4)));
        assert!(!grid.contains(Position::new(10, 0)));
        assert!(!grid.contains(Position::new(0, 5)));
    }

    #[test]
    fn test_matching_rule_first_wins() {
        let ant = Ant {
            id: Uuid::new_v4(),
            position: Position::new(0, 0),
            direction: Direction::Up,
            color: "#AA0000".to_string(),
            rules: vec![
                Rule::new("#FFFFFF", "#000000", TurnDirection::Right),
                Rule::new("#FFFFFF", "#111111", TurnDirection::Left),
                Rule::new("#000000", "#FFFFFF", TurnDirection::Left),
            ],
        };

        let rule = ant.matching_rule("#FFFFFF").unwrap();
        assert_eq!(rule.new_color, "#000000");
        assert_eq!(ant.matching_rule("#000000").unwrap().new_color, "#FFFFFF");
        assert!(ant.matching_rule("#ABCDEF").is_none());
    }
}
