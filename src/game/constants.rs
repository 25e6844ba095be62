/// Grid and paint constants
pub mod grid {
    /// Reserved "unpainted" color. Never stored in the paint map.
    pub const UNPAINTED: &str = "#FFFFFF";
    /// Default grid width in cells
    pub const DEFAULT_WIDTH: u32 = 1000;
    /// Default grid height in cells
    pub const DEFAULT_HEIGHT: u32 = 1000;
    /// Default chunk edge length in cells (occupancy index granularity)
    pub const DEFAULT_CHUNK_SIZE: u32 = 50;
    /// Largest accepted grid edge in cells
    pub const MAX_DIMENSION: u32 = 20_000;
    /// Largest accepted chunk count (chunks are allocated up front)
    pub const MAX_CHUNKS: u64 = 1_000_000;
}

/// Simulation timing constants
pub mod timing {
    /// Default tick interval in milliseconds (4 Hz)
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 250;
    /// Default heartbeat interval in milliseconds
    pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;
    /// Seconds between periodic stats log lines
    pub const STATS_LOG_INTERVAL_SECS: u64 = 30;
}

/// Player admission constants
pub mod players {
    /// Default maximum concurrent players
    pub const DEFAULT_MAX: usize = 10;
}

/// Player color generation
pub mod palette {
    /// Saturation range for generated colors (HSV, 0-1)
    pub const SATURATION_MIN: f32 = 0.55;
    pub const SATURATION_MAX: f32 = 0.95;
    /// Value/brightness range for generated colors (HSV, 0-1)
    /// Capped below 1.0 so a generated color can never be the unpainted white.
    pub const VALUE_MIN: f32 = 0.55;
    pub const VALUE_MAX: f32 = 0.9;
    /// Golden ratio conjugate, used to spread consecutive hues apart
    pub const GOLDEN_RATIO_CONJUGATE: f32 = 0.618_034;
    /// Attempts before falling back to a uniformly random color
    pub const MAX_DISTINCT_ATTEMPTS: usize = 64;
}

/// Tick processing constants
pub mod tick {
    /// Ant count above which rule decisions are computed in parallel
    pub const PARALLEL_DECISION_THRESHOLD: usize = 512;
}

/// Per-connection outbound queue
pub mod session {
    /// Frames buffered for one connection before it is dropped as a slow consumer
    pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;
    /// Time a closing connection gets to flush its queue before the writer is aborted
    pub const CLOSE_GRACE_MS: u64 = 1000;
}

/// Rate limiting defaults
pub mod rate_limit {
    /// Messages allowed per window before rejection
    pub const DEFAULT_MAX_MESSAGES: u32 = 30;
    /// Window length in milliseconds
    pub const DEFAULT_WINDOW_MS: u64 = 1000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_value_never_white() {
        // Value below 1.0 keeps every channel below 0xFF
        assert!(palette::VALUE_MAX < 1.0);
        assert!(palette::SATURATION_MIN > 0.0);
    }

    #[test]
    fn test_default_chunking_covers_grid() {
        assert_eq!(grid::DEFAULT_WIDTH % grid::DEFAULT_CHUNK_SIZE, 0);
        assert_eq!(grid::DEFAULT_HEIGHT % grid::DEFAULT_CHUNK_SIZE, 0);
    }

    #[test]
    fn test_grid_caps_fit_u32_wrap() {
        // step() adds one to a coordinate below the edge length
        assert!(grid::MAX_DIMENSION < u32::MAX);
        let max_chunks_at_default = (grid::MAX_DIMENSION / grid::DEFAULT_CHUNK_SIZE) as u64;
        assert!(max_chunks_at_default * max_chunks_at_default <= grid::MAX_CHUNKS);
    }
}
