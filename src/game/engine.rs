//! Simulation engine
//!
//! Owns the paint grid, player and ant registries and the chunk occupancy index.
//! All mutation goes through `&mut self`, so callers serialize access by owning
//! the engine behind a single lock.
//!
//! A tick runs in three phases:
//! 1. Decide: each ant matches its cell color against its rules (read-only,
//!    parallel for large ant counts), then paints and turns in creation order.
//! 2. Resolve: candidate moves are committed in creation order against a set of
//!    claimed cells. Earlier ants win contested cells; blocked ants stay put.
//! 3. Reindex: the chunk index drops old cells, then adds new ones.

use hashbrown::HashSet;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::debug;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::constants::grid::UNPAINTED;
use crate::game::constants::tick::PARALLEL_DECISION_THRESHOLD;
use crate::game::movement::{step, turn};
use crate::game::palette::ColorPalette;
use crate::game::snapshot::GameSnapshot;
use crate::game::spatial::ChunkIndex;
use crate::game::state::{Ant, Direction, GameState, Player, PlayerId, Position, Rule};

/// Errors raised by engine operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Maximum number of players reached")]
    CapacityExceeded,
    #[error("Player not found")]
    UnknownPlayer,
    #[error("Player already has an ant")]
    DuplicateAnt,
    #[error("Position out of bounds")]
    OutOfBounds(Position),
    #[error("Rules cannot be empty")]
    InvalidRules,
    #[error("Cell already occupied by another ant")]
    CellOccupied(Position),
}

/// Per-ant outcome of the decide phase
#[derive(Debug, Clone)]
struct AntDecision {
    new_color: String,
    facing: Direction,
    candidate: Position,
}

/// Result of a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Ants that matched a rule (painted and turned)
    pub active: usize,
    /// Ants whose position changed
    pub moved: usize,
    /// Active ants that lost a contested cell
    pub blocked: usize,
}

/// Authoritative simulation engine
pub struct GameEngine {
    config: GameConfig,
    state: GameState,
    chunks: ChunkIndex,
    palette: ColorPalette,
    tick: u64,
}

impl GameEngine {
    pub fn new(config: GameConfig) -> Self {
        let state = GameState::new(config.grid_width, config.grid_height);
        let chunks = ChunkIndex::new(config.grid_width, config.grid_height, config.chunk_size);

        Self {
            config,
            state,
            chunks,
            palette: ColorPalette::new(),
            tick: 0,
        }
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Register a new player with a unique color
    pub fn add_player(&mut self) -> Result<Player, EngineError> {
        if self.state.players.len() >= self.config.max_players {
            return Err(EngineError::CapacityExceeded);
        }

        let color = {
            let taken: HashSet<&str> = self
                .state
                .players
                .values()
                .map(|p| p.color.as_str())
                .collect();
            self.palette.next_distinct(&taken)
        };

        let player = Player::new(Uuid::new_v4(), color);
        self.state.players.insert(player.id, player.clone());
        debug!("Added player {} with color {}", player.id, player.color);

        Ok(player)
    }

    /// Remove a player and its ant. Unknown ids are ignored.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Player> {
        let player = self.state.players.remove(&player_id)?;

        if let Some(ant_id) = player.ant_id {
            if let Some(idx) = self.state.ants.iter().position(|a| a.id == ant_id) {
                let ant = self.state.ants.remove(idx);
                self.chunks.remove(ant.position);
            }
        }

        debug!("Removed player {}", player_id);
        Some(player)
    }

    // ========================================================================
    // Ants
    // ========================================================================

    /// Place the player's single ant facing up
    pub fn place_ant(
        &mut self,
        player_id: PlayerId,
        position: Position,
        rules: Vec<Rule>,
    ) -> Result<Ant, EngineError> {
        let player = self
            .state
            .players
            .get(&player_id)
            .ok_or(EngineError::UnknownPlayer)?;
        if player.ant_id.is_some() {
            return Err(EngineError::DuplicateAnt);
        }
        if !self.state.grid.contains(position) {
            return Err(EngineError::OutOfBounds(position));
        }
        if rules.is_empty() {
            return Err(EngineError::InvalidRules);
        }
        if self.chunks.is_occupied(position) {
            return Err(EngineError::CellOccupied(position));
        }

        let ant = Ant {
            id: Uuid::new_v4(),
            position,
            direction: Direction::Up,
            color: player.color.clone(),
            rules,
        };

        self.chunks.insert(position);
        self.state.ants.push(ant.clone());
        if let Some(player) = self.state.players.get_mut(&player_id) {
            player.ant_id = Some(ant.id);
        }

        debug!("Player {} placed ant {} at {}", player_id, ant.id, position);
        Ok(ant)
    }

    /// Replace the rules of the player's ant. False if the player has no ant.
    pub fn update_rules(&mut self, player_id: PlayerId, rules: Vec<Rule>) -> bool {
        let Some(ant_id) = self.state.players.get(&player_id).and_then(|p| p.ant_id) else {
            return false;
        };

        match self.state.ants.iter_mut().find(|a| a.id == ant_id) {
            Some(ant) => {
                ant.rules = rules;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Tiles
    // ========================================================================

    /// Paint a cell with the player's color if it is unpainted or already theirs
    pub fn flip_tile(&mut self, player_id: PlayerId, position: Position) -> bool {
        let Some(player) = self.state.players.get(&player_id) else {
            return false;
        };
        if !self.state.grid.contains(position) {
            return false;
        }

        let current = self.state.grid.color_at(position);
        if current != UNPAINTED && current != player.color {
            return false;
        }

        let color = player.color.clone();
        self.state.grid.paint(position, &color);
        true
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Advance the simulation by one step
    pub fn tick(&mut self) -> TickSummary {
        self.tick += 1;

        let decisions = self.decide();
        let active = decisions.iter().filter(|d| d.is_some()).count();

        // Paint and turn in creation order
        for (ant, decision) in self.state.ants.iter_mut().zip(&decisions) {
            if let Some(decision) = decision {
                self.state.grid.paint(ant.position, &decision.new_color);
                ant.direction = decision.facing;
            }
        }

        let candidates: Vec<Option<Position>> = decisions
            .iter()
            .map(|d| d.as_ref().map(|d| d.candidate))
            .collect();
        let targets = self.resolve_moves(&candidates);

        // Remove every vacated cell before inserting, so an ant moving into a
        // cell vacated this tick is not erased by the previous occupant.
        let mut moves: Vec<(usize, Position, Position)> = Vec::new();
        for (idx, (ant, target)) in self.state.ants.iter().zip(&targets).enumerate() {
            if *target != ant.position {
                moves.push((idx, ant.position, *target));
            }
        }
        for &(_, from, _) in &moves {
            self.chunks.remove(from);
        }
        for &(idx, _, to) in &moves {
            self.state.ants[idx].position = to;
            self.chunks.insert(to);
        }

        let blocked = candidates
            .iter()
            .zip(&targets)
            .filter(|(candidate, target)| matches!(candidate, Some(c) if c != *target))
            .count();

        TickSummary {
            active,
            moved: moves.len(),
            blocked,
        }
    }

    /// Match each ant's rules against its current cell (read-only)
    fn decide(&self) -> Vec<Option<AntDecision>> {
        let grid = &self.state.grid;
        let (width, height) = (grid.width, grid.height);

        let decide_one = |ant: &Ant| -> Option<AntDecision> {
            let rule = ant.matching_rule(grid.color_at(ant.position))?;
            let facing = turn(ant.direction, rule.turn_direction);
            Some(AntDecision {
                new_color: rule.new_color.clone(),
                facing,
                candidate: step(ant.position, facing, width, height),
            })
        };

        if self.state.ants.len() >= PARALLEL_DECISION_THRESHOLD {
            self.state.ants.par_iter().map(decide_one).collect()
        } else {
            self.state.ants.iter().map(decide_one).collect()
        }
    }

    /// Final position of every ant given its candidate move (None = inert)
    ///
    /// Resting ants claim their cells first. Moving ants then claim candidates
    /// in creation order; a taken candidate blocks the ant, which then rests.
    /// Repeats until no new ant is blocked, so a blocked ant can never share
    /// its cell with an earlier ant that moved into it.
    fn resolve_moves(&self, candidates: &[Option<Position>]) -> Vec<Position> {
        let ants = &self.state.ants;
        let mut resting: Vec<bool> = candidates.iter().map(Option::is_none).collect();

        loop {
            let mut claimed: FxHashSet<Position> =
                FxHashSet::with_capacity_and_hasher(ants.len(), Default::default());
            for (ant, _) in ants.iter().zip(&resting).filter(|(_, rest)| **rest) {
                claimed.insert(ant.position);
            }

            let mut newly_blocked = false;
            for (idx, candidate) in candidates.iter().enumerate() {
                if resting[idx] {
                    continue;
                }
                let Some(candidate) = candidate else { continue };
                if !claimed.insert(*candidate) {
                    resting[idx] = true;
                    newly_blocked = true;
                }
            }

            if !newly_blocked {
                break;
            }
        }

        ants.iter()
            .zip(candidates)
            .zip(&resting)
            .map(|((ant, candidate), rest)| match candidate {
                Some(c) if !rest => *c,
                _ => ant.position,
            })
            .collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Read-only view of the authoritative state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Owned wire snapshot of paint state and ants
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from_game_state(&self.state)
    }

    pub fn chunk_index(&self) -> &ChunkIndex {
        &self.chunks
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.state.get_player(player_id)
    }

    pub fn ant_for_player(&self, player_id: PlayerId) -> Option<&Ant> {
        self.state.ant_for_player(player_id)
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.chunks.is_occupied(position)
    }

    pub fn player_count(&self) -> usize {
        self.state.players.len()
    }

    pub fn ant_count(&self) -> usize {
        self.state.ants.len()
    }

    /// Ticks run since startup
    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
