//! Owned copy of the paint state and ants, as sent to clients

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::state::{Ant, Color, GameState, Position};

/// Painted cells grouped by column: `{"<x>": {"<y>": "#RRGGBB"}}`
pub type CellMap = BTreeMap<u32, BTreeMap<u32, Color>>;

/// Full paint state and ant list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub cells: CellMap,
    /// Ants in creation order
    pub ants: Vec<Ant>,
}

impl GameSnapshot {
    pub fn from_game_state(state: &GameState) -> Self {
        let mut cells = CellMap::new();
        for (pos, color) in &state.grid.cells {
            cells.entry(pos.x).or_default().insert(pos.y, color.clone());
        }

        Self {
            cells,
            ants: state.ants.clone(),
        }
    }

    /// Color at a cell, if painted
    pub fn color_at(&self, position: Position) -> Option<&str> {
        self.cells
            .get(&position.x)
            .and_then(|column| column.get(&position.y))
            .map(String::as_str)
    }

    /// Number of painted cells
    pub fn painted_count(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }
}
