//! Game session hub - owns the shared engine, applies client messages and
//! broadcasts state to every connected session

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::game::constants::session::OUTBOUND_QUEUE_CAPACITY;
use crate::game::constants::timing::STATS_LOG_INTERVAL_SECS;
use crate::game::engine::{EngineError, GameEngine};
use crate::game::state::PlayerId;
use crate::metrics::Metrics;
use crate::net::protocol::{decode_client_message, ClientMessage, ServerMessage};
use crate::net::rate_limit::RateLimitConfig;
use crate::net::session::{Broadcaster, OutboundReceiver, Session};

/// Engine handle shared by the tick driver and every connection
pub type SharedEngine = Arc<RwLock<GameEngine>>;

/// Shared hub between connections, the tick driver and the heartbeat
pub struct GameSession {
    engine: SharedEngine,
    broadcaster: Broadcaster,
    rate_limit: RateLimitConfig,
    tick_interval: Duration,
    heartbeat_interval: Duration,
    metrics: Arc<Metrics>,
}

impl GameSession {
    pub fn new(config: &ServerConfig, metrics: Arc<Metrics>) -> Self {
        info!(
            "Game session: {}x{} grid, chunk {}, max {} players",
            config.game.grid_width,
            config.game.grid_height,
            config.game.chunk_size,
            config.game.max_players
        );

        Self {
            engine: Arc::new(RwLock::new(GameEngine::new(config.game.clone()))),
            broadcaster: Broadcaster::new(),
            rate_limit: RateLimitConfig {
                max_messages: config.rate_limit_max_messages,
                window: config.rate_limit_window,
            },
            tick_interval: config.game.tick_interval,
            heartbeat_interval: config.game.heartbeat_interval,
            metrics,
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Admit a new connection
    ///
    /// Registers the player, broadcasts PLAYER_JOIN to everyone (newcomer
    /// included) and queues the current snapshot for the newcomer. Both frames
    /// are queued under the engine lock so the newcomer sees its join first.
    pub async fn connect(&self) -> Result<(Session, OutboundReceiver), EngineError> {
        let mut engine = self.engine.write().await;
        let player = engine.add_player()?;

        let session = Session::new(player.id, player.color.clone(), self.rate_limit);
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        self.broadcaster.register(player.id, session.handle(tx));
        self.metrics.connection_opened();

        self.broadcast(&ServerMessage::PlayerJoin {
            player_id: player.id,
            color: player.color.clone(),
        });
        self.broadcaster
            .send_to(player.id, &ServerMessage::GameStateSnapshot(engine.snapshot()));
        self.record_population(&engine);
        drop(engine);

        info!("Player {} joined with color {}", player.id, player.color);
        Ok((session, rx))
    }

    /// Tear down a connection. Safe to call more than once.
    pub async fn disconnect(&self, player_id: PlayerId) {
        let removed = {
            let mut engine = self.engine.write().await;
            let removed = engine.remove_player(player_id);
            self.record_population(&engine);
            removed
        };
        let registered = self.broadcaster.unregister(player_id);

        if removed.is_none() && !registered {
            return;
        }

        self.metrics.connection_closed();
        self.broadcast(&ServerMessage::PlayerLeave { player_id });
        info!("Player {} left", player_id);
    }

    /// Validate and apply one inbound text frame
    pub async fn handle_text(&self, session: &mut Session, text: &str) {
        self.metrics.message_received();
        session.mark_alive();
        let player_id = session.player_id;

        if let Err(e) = session.check_rate() {
            debug!("Player {} rate limited", player_id);
            self.metrics.message_rate_limited();
            self.send_error(player_id, e.to_string());
            return;
        }

        let message = match decode_client_message(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Rejected message from {}: {}", player_id, e);
                self.send_error(player_id, e.to_string());
                return;
            }
        };

        match message {
            ClientMessage::PlaceAnt { position, rules } => {
                let placed = {
                    let mut engine = self.engine.write().await;
                    let placed = engine
                        .place_ant(player_id, position, rules)
                        .map(|_| engine.snapshot());
                    self.record_population(&engine);
                    placed
                };

                match placed {
                    Ok(snapshot) => {
                        self.broadcast(&ServerMessage::PlaceAnt(snapshot));
                    }
                    Err(e) => {
                        debug!("Player {} could not place ant: {}", player_id, e);
                        self.send_error(player_id, e.to_string());
                    }
                }
            }

            ClientMessage::RuleChange { rules } => {
                let updated = self
                    .engine
                    .write()
                    .await
                    .update_rules(player_id, rules.clone());
                if !updated {
                    debug!("Player {} changed rules without an ant", player_id);
                }
                self.broadcast(&ServerMessage::RuleChange { player_id, rules });
            }

            ClientMessage::TileFlip { position } => {
                let snapshot = {
                    let mut engine = self.engine.write().await;
                    if !engine.flip_tile(player_id, position) {
                        debug!("Player {} could not flip tile {}", player_id, position);
                    }
                    engine.snapshot()
                };
                self.broadcast(&ServerMessage::TileFlip(snapshot));
            }

            ClientMessage::ServerOnly(ty) => {
                debug!("Ignoring {} sent by player {}", ty.as_str(), player_id);
            }
        }
    }

    /// Queue a message for every session
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let sent = self.broadcaster.broadcast(message);
        self.metrics.record_broadcast(sent);
        sent
    }

    fn send_error(&self, player_id: PlayerId, message: String) {
        self.metrics.message_rejected();
        self.broadcaster
            .send_to(player_id, &ServerMessage::Error { message });
    }

    fn record_population(&self, engine: &GameEngine) {
        let state = engine.state();
        self.metrics.record_population(
            state.players.len(),
            state.ants.len(),
            state.grid.painted_count(),
        );
    }

    /// Run one tick and broadcast the resulting snapshot
    pub async fn run_tick(&self) {
        let (snapshot, elapsed) = {
            let mut engine = self.engine.write().await;
            let started = Instant::now();
            let summary = engine.tick();
            let elapsed = started.elapsed();
            if summary.blocked > 0 {
                debug!("Tick {}: {} ants blocked", engine.tick_count(), summary.blocked);
            }
            self.record_population(&engine);
            (engine.snapshot(), elapsed)
        };

        self.metrics.record_tick_time(elapsed);
        self.broadcast(&ServerMessage::GameStateSnapshot(snapshot));
    }

    /// One liveness sweep. Stale sessions are disconnected here, without
    /// waiting on their connection task, and returned.
    pub async fn heartbeat(&self) -> Vec<PlayerId> {
        let stale = self.broadcaster.sweep();
        for player_id in &stale {
            info!("Player {} missed heartbeat, disconnecting", player_id);
            self.disconnect(*player_id).await;
        }
        stale
    }

    /// Ask every connection to close (server shutdown)
    pub fn close_all(&self) {
        let closed = self.broadcaster.close_all();
        info!("Closing {} sessions", closed);
    }
}

/// Start the tick driver background task
pub fn start_game_loop(session: Arc<GameSession>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tick_duration = session.tick_interval;
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Game loop started, tick every {:?}", tick_duration);
        let start = Instant::now();
        let stats_every =
            (STATS_LOG_INTERVAL_SECS * 1000 / tick_duration.as_millis().max(1) as u64).max(1);
        let mut tick_count: u64 = 0;

        loop {
            ticker.tick().await;
            tick_count += 1;

            session.run_tick().await;

            // Log stats periodically
            if tick_count % stats_every == 0 {
                let engine = session.engine.read().await;
                let chunks = engine.chunk_index().stats();
                info!(
                    "Game: {}s, tick {}, {} players, {} ants, {} painted | chunks {}/{} occupied, max {} per chunk | p95 {}us",
                    start.elapsed().as_secs(),
                    engine.tick_count(),
                    engine.player_count(),
                    engine.ant_count(),
                    engine.state().grid.painted_count(),
                    chunks.occupied_chunks,
                    chunks.total_chunks,
                    chunks.max_per_chunk,
                    session
                        .metrics
                        .tick_time_p95_us
                        .load(std::sync::atomic::Ordering::Relaxed),
                );
            }
        }
    })
}

/// Start the heartbeat background task
pub fn start_heartbeat(session: Arc<GameSession>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(session.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let stale = session.heartbeat().await;
            if !stale.is_empty() {
                warn!("Heartbeat: {} stale sessions", stale.len());
            }
        }
    })
}
