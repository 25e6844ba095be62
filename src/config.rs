use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{grid, players, rate_limit, timing};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    /// Side length of a chunk in the occupancy index
    pub chunk_size: u32,
    /// Delay between simulation ticks
    pub tick_interval: Duration,
    pub max_players: usize,
    /// Delay between liveness sweeps
    pub heartbeat_interval: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: grid::DEFAULT_WIDTH,
            grid_height: grid::DEFAULT_HEIGHT,
            chunk_size: grid::DEFAULT_CHUNK_SIZE,
            tick_interval: Duration::from_millis(timing::DEFAULT_TICK_INTERVAL_MS),
            max_players: players::DEFAULT_MAX,
            heartbeat_interval: Duration::from_millis(timing::DEFAULT_HEARTBEAT_INTERVAL_MS),
        }
    }
}

impl GameConfig {
    /// Chunks in the occupancy index for this grid
    pub fn chunk_count(&self) -> u64 {
        let size = self.chunk_size.max(1);
        u64::from(self.grid_width.div_ceil(size)) * u64::from(self.grid_height.div_ceil(size))
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed to open a WebSocket. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Messages accepted per session in one window
    pub rate_limit_max_messages: u32,
    /// Length of the rate-limit window
    pub rate_limit_window: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            allowed_origins: Vec::new(),
            rate_limit_max_messages: rate_limit::DEFAULT_MAX_MESSAGES,
            rate_limit_window: Duration::from_millis(rate_limit::DEFAULT_WINDOW_MS),
            game: GameConfig::default(),
        }
    }
}

/// Parse a positive number from the environment, keeping `current` when unset or invalid
fn env_positive<T>(name: &str, current: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let Ok(raw) = std::env::var(name) else {
        return current;
    };

    match raw.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => parsed,
        Ok(_) => {
            tracing::warn!("{} must be > 0, using default", name);
            current
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            current
        }
    }
}

/// Like `env_positive`, but values above `max` are also rejected
fn env_bounded<T>(name: &str, current: T, max: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    let parsed = env_positive(name, current);
    if parsed > max {
        tracing::warn!("{} must be 1-{}, using default", name, max);
        return current;
    }
    parsed
}

fn env_millis(name: &str, current: Duration) -> Duration {
    Duration::from_millis(env_positive(name, current.as_millis() as u64))
}

/// Split a comma separated origin list, dropping blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        config.port = env_positive("PORT", config.port);

        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins(&origins);
        }

        config.rate_limit_max_messages =
            env_positive("RATE_LIMIT_MAX_MESSAGES", config.rate_limit_max_messages);
        config.rate_limit_window = env_millis("RATE_LIMIT_WINDOW_MS", config.rate_limit_window);

        let game = &mut config.game;
        game.grid_width = env_bounded("GRID_WIDTH", game.grid_width, grid::MAX_DIMENSION);
        game.grid_height = env_bounded("GRID_HEIGHT", game.grid_height, grid::MAX_DIMENSION);
        game.chunk_size = env_positive("CHUNK_SIZE", game.chunk_size);
        if game.chunk_count() > grid::MAX_CHUNKS {
            tracing::warn!(
                "CHUNK_SIZE {} gives more than {} chunks, using default",
                game.chunk_size,
                grid::MAX_CHUNKS
            );
            game.chunk_size = grid::DEFAULT_CHUNK_SIZE;
        }
        game.tick_interval = env_millis("TICK_INTERVAL_MS", game.tick_interval);
        game.max_players = env_positive("MAX_PLAYERS", game.max_players);
        game.heartbeat_interval = env_millis("HEARTBEAT_INTERVAL_MS", game.heartbeat_interval);

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.rate_limit_max_messages == 0 {
            return Err("rate_limit_max_messages must be at least 1".to_string());
        }
        if self.rate_limit_window.is_zero() {
            return Err("rate_limit_window must be non-zero".to_string());
        }

        let game = &self.game;
        if game.grid_width == 0 || game.grid_height == 0 {
            return Err("grid dimensions must be at least 1".to_string());
        }
        if game.grid_width > grid::MAX_DIMENSION || game.grid_height > grid::MAX_DIMENSION {
            return Err(format!("grid dimensions must be at most {}", grid::MAX_DIMENSION));
        }
        if game.chunk_size == 0 {
            return Err("chunk_size must be at least 1".to_string());
        }
        if game.chunk_count() > grid::MAX_CHUNKS {
            return Err(format!(
                "chunk_size {} gives {} chunks, at most {} allowed",
                game.chunk_size,
                game.chunk_count(),
                grid::MAX_CHUNKS
            ));
        }
        if game.max_players == 0 {
            return Err("max_players must be at least 1".to_string());
        }
        if game.tick_interval.is_zero() || game.heartbeat_interval.is_zero() {
            return Err("tick and heartbeat intervals must be non-zero".to_string());
        }
        Ok(())
    }

    /// Whether a WebSocket upgrade from `origin` may proceed
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|origin| self.allowed_origins.iter().any(|allowed| allowed == origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.rate_limit_max_messages, 30);
        assert_eq!(config.rate_limit_window, Duration::from_millis(1000));

        let game = &config.game;
        assert_eq!(game.grid_width, 1000);
        assert_eq!(game.grid_height, 1000);
        assert_eq!(game.chunk_size, 50);
        assert_eq!(game.tick_interval, Duration::from_millis(250));
        assert_eq!(game.max_players, 10);
        assert_eq!(game.heartbeat_interval, Duration::from_millis(10_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = ServerConfig::load_or_default();
        assert!(config.port > 0);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = ServerConfig::default();
        config.game.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.game.grid_height = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.game.max_players = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.rate_limit_window = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_grid() {
        let mut config = ServerConfig::default();
        config.game.grid_width = u32::MAX;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.game.grid_width = grid::MAX_DIMENSION;
        config.game.grid_height = grid::MAX_DIMENSION;
        config.game.chunk_size = 1;
        assert!(config.validate().is_err());

        config.game.chunk_size = grid::DEFAULT_CHUNK_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunk_count() {
        let game = GameConfig {
            grid_width: 101,
            grid_height: 50,
            chunk_size: 50,
            ..GameConfig::default()
        };
        assert_eq!(game.chunk_count(), 3);
        assert_eq!(GameConfig::default().chunk_count(), 400);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test "),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ServerConfig::default();
        assert!(config.origin_allowed(None));
        assert!(config.origin_allowed(Some("http://anything")));

        config.allowed_origins = vec!["http://localhost:3000".to_string()];
        assert!(config.origin_allowed(Some("http://localhost:3000")));
        assert!(!config.origin_allowed(Some("http://evil.test")));
        assert!(!config.origin_allowed(None));
    }
}
