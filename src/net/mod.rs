pub mod game_session;
pub mod protocol;
pub mod rate_limit;
pub mod session;
pub mod transport;
