//! WebSocket server implementation
//!
//! HTTP routes via axum. `/` and `/ws` upgrade to the game socket after an
//! origin check; `/health` and `/metrics` serve plain text.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::game::constants::session::CLOSE_GRACE_MS;
use crate::metrics::Metrics;
use crate::net::game_session::{start_game_loop, start_heartbeat, GameSession};
use crate::net::protocol::{encode_server_message, ServerMessage};
use crate::net::session::Outbound;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub session: Arc<GameSession>,
    pub metrics: Arc<Metrics>,
}

/// WebSocket game server
pub struct GameServer {
    state: AppState,
}

impl GameServer {
    pub fn new(config: ServerConfig, metrics: Arc<Metrics>) -> Self {
        let session = Arc::new(GameSession::new(&config, metrics.clone()));

        Self {
            state: AppState {
                config: Arc::new(config),
                session,
                metrics,
            },
        }
    }

    pub fn session(&self) -> &Arc<GameSession> {
        &self.state.session
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.state.config.bind_address, self.state.config.port)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("WebSocket server listening on {}", listener.local_addr()?);

        let game_loop = start_game_loop(self.state.session.clone());
        let heartbeat = start_heartbeat(self.state.session.clone());

        let session = self.state.session.clone();
        let shutdown = async move {
            shutdown.await;
            session.close_all();
        };

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        game_loop.abort();
        heartbeat.abort();
        result?;
        Ok(())
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Origin check happens before the upgrade so rejected clients never join
async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if !state.config.origin_allowed(origin) {
        tracing::warn!("Rejected connection from origin {:?}", origin);
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let hub = state.session;

    let (mut session, mut outbound) = match hub.connect().await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::warn!("Connection rejected: {}", e);
            if let Ok(text) = encode_server_message(&ServerMessage::error(e.to_string())) {
                let _ = sender.send(Message::Text(text)).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    let player_id = session.player_id;
    let evicted = session.eviction();

    // Writes run on their own task so a peer that stops reading cannot stall
    // the reader or the eviction signal
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let message = match frame {
                Outbound::Text(text) => Message::Text(text.to_string()),
                Outbound::Ping => Message::Ping(Vec::new()),
                Outbound::Close => break,
            };
            if sender.send(message).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });
    let mut writer_done = false;

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    hub.handle_text(&mut session, &text).await;
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => hub.handle_text(&mut session, &text).await,
                    Err(_) => {
                        session.mark_alive();
                        tracing::debug!("Ignoring non-UTF-8 frame from {}", player_id);
                    }
                },
                // axum answers pings itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => session.mark_alive(),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!("Socket error for {}: {}", player_id, e);
                    break;
                }
            },

            _ = evicted.notified() => {
                tracing::debug!("Session {} evicted", player_id);
                break;
            }

            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    // Dropping the registry entry closes the queue, so the writer flushes
    // what is left plus a close frame, unless the peer is not reading
    hub.disconnect(player_id).await;
    if !writer_done && timeout(Duration::from_millis(CLOSE_GRACE_MS), &mut writer).await.is_err() {
        tracing::debug!("Writer for {} still blocked, aborting", player_id);
        writer.abort();
    }

    tracing::debug!(
        "Connection closed for {} after {:?}",
        player_id,
        session.connected_at.elapsed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig {
            port: 9123,
            ..ServerConfig::default()
        };
        let server = GameServer::new(config, Arc::new(Metrics::new()));
        assert_eq!(server.bind_addr().port(), 9123);
    }

    #[tokio::test]
    async fn test_health_and_metrics_routes() {
        let server = GameServer::new(ServerConfig::default(), Arc::new(Metrics::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = server.router();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let body = http_get(addr, "/health").await;
        assert!(body.starts_with("HTTP/1.1 200"));
        assert!(body.ends_with("ok"));

        let body = http_get(addr, "/metrics").await;
        assert!(body.contains("ant_arena_tick_count"));
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, addr);
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }
}
