use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::game::state::{Color, PlayerId};
use crate::net::protocol::{encode_server_message, ServerMessage};
use crate::net::rate_limit::{MessageRateLimiter, RateLimitConfig, RateLimitError};

/// Frame queued for a connection's writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded JSON, shared across every recipient of a broadcast
    Text(Arc<str>),
    /// Liveness probe
    Ping,
    /// Flush a close frame and stop writing
    Close,
}

pub type OutboundSender = mpsc::Sender<Outbound>;
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// State owned by one connection task
#[derive(Debug)]
pub struct Session {
    pub player_id: PlayerId,
    pub color: Color,
    pub connected_at: Instant,
    alive: Arc<AtomicBool>,
    evicted: Arc<Notify>,
    #[cfg_attr(not(feature = "ratelimit"), allow(dead_code))]
    limiter: MessageRateLimiter,
}

impl Session {
    pub fn new(player_id: PlayerId, color: Color, rate_limit: RateLimitConfig) -> Self {
        Self {
            player_id,
            color,
            connected_at: Instant::now(),
            alive: Arc::new(AtomicBool::new(true)),
            evicted: Arc::new(Notify::new()),
            limiter: MessageRateLimiter::new(rate_limit),
        }
    }

    /// Registry entry pointing at this session
    pub fn handle(&self, outbound: OutboundSender) -> SessionHandle {
        SessionHandle {
            outbound,
            alive: self.alive.clone(),
            evicted: self.evicted.clone(),
        }
    }

    /// Signalled once the session is dropped from the registry
    ///
    /// Fires even if nobody is waiting yet, so the connection task can select
    /// on it at any point after registration.
    pub fn eviction(&self) -> Arc<Notify> {
        self.evicted.clone()
    }

    /// Any inbound frame or pong proves the peer is still there
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Count one inbound message against the session's window
    #[cfg(feature = "ratelimit")]
    pub fn check_rate(&mut self) -> Result<(), RateLimitError> {
        self.limiter.check()
    }

    #[cfg(not(feature = "ratelimit"))]
    pub fn check_rate(&mut self) -> Result<(), RateLimitError> {
        Ok(())
    }
}

/// Registry side of a session: its outbound queue, liveness flag and
/// eviction signal
#[derive(Debug, Clone)]
pub struct SessionHandle {
    outbound: OutboundSender,
    alive: Arc<AtomicBool>,
    evicted: Arc<Notify>,
}

impl SessionHandle {
    fn send(&self, frame: Outbound) -> Result<(), TrySendError<Outbound>> {
        self.outbound.try_send(frame)
    }
}

/// Fan-out registry of live sessions
///
/// Queues are bounded and written with `try_send`, so the lock is never held
/// across an await. A session whose queue is full is evicted.
#[derive(Debug, Default)]
pub struct Broadcaster {
    sessions: RwLock<HashMap<PlayerId, SessionHandle>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, player_id: PlayerId, handle: SessionHandle) {
        self.sessions.write().insert(player_id, handle);
    }

    /// Drop a session and wake its connection task.
    /// Returns false if the session was not registered.
    pub fn unregister(&self, player_id: PlayerId) -> bool {
        let Some(handle) = self.sessions.write().remove(&player_id) else {
            return false;
        };
        handle.evicted.notify_one();
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a message for every registered session. Returns frames queued.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let Some(text) = encode(message) else {
            return 0;
        };

        let mut sent = 0;
        let mut lagging = Vec::new();
        {
            let sessions = self.sessions.read();
            for (player_id, handle) in sessions.iter() {
                match handle.send(Outbound::Text(text.clone())) {
                    Ok(()) => sent += 1,
                    Err(TrySendError::Full(_)) => lagging.push(*player_id),
                    Err(TrySendError::Closed(_)) => {
                        debug!("Broadcast to {}: receiver dropped", player_id)
                    }
                }
            }
        }

        for player_id in lagging {
            warn!("Player {} outbound queue full, evicting", player_id);
            self.unregister(player_id);
        }
        sent
    }

    /// Queue a message for one session
    pub fn send_to(&self, player_id: PlayerId, message: &ServerMessage) -> bool {
        let Some(text) = encode(message) else {
            return false;
        };

        let result = match self.sessions.read().get(&player_id) {
            Some(handle) => handle.send(Outbound::Text(text)),
            None => return false,
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Player {} outbound queue full, evicting", player_id);
                self.unregister(player_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Liveness sweep
    ///
    /// Returns sessions whose flag is still cleared since the previous sweep,
    /// or whose ping could not be queued. Every other session has its flag
    /// cleared and is pinged. Stale sessions stay registered; the caller runs
    /// the disconnect path for them.
    pub fn sweep(&self) -> Vec<PlayerId> {
        let sessions = self.sessions.read();
        let mut stale = Vec::new();

        for (player_id, handle) in sessions.iter() {
            if !handle.alive.swap(false, Ordering::AcqRel) || handle.send(Outbound::Ping).is_err() {
                stale.push(*player_id);
            }
        }
        stale
    }

    /// Ask every session to close. Sessions are woken even when their queue
    /// has no room for the close frame.
    pub fn close_all(&self) -> usize {
        let sessions = self.sessions.read();
        for handle in sessions.values() {
            let _ = handle.send(Outbound::Close);
            handle.evicted.notify_one();
        }
        sessions.len()
    }
}

fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    match encode_server_message(message) {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            warn!("Failed to encode {:?} message: {}", message.message_type(), e);
            None
        }
    }
}
