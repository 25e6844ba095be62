pub mod constants;
pub mod engine;
pub mod movement;
pub mod palette;
pub mod snapshot;
pub mod spatial;
pub mod state;
