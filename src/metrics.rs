//! Prometheus-compatible metrics
//!
//! Counters and gauges are plain atomics updated from the tick driver and the
//! connection tasks. Served as text at `GET /metrics`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Samples kept for tick-time percentiles
const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the game server
#[derive(Debug)]
pub struct Metrics {
    // Population
    pub players: AtomicU64,
    pub ants: AtomicU64,
    pub painted_cells: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // Network
    pub connections_active: AtomicU64,
    pub messages_received: AtomicU64,
    pub messages_rejected: AtomicU64,
    pub messages_rate_limited: AtomicU64,
    pub frames_broadcast: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            players: AtomicU64::new(0),
            ants: AtomicU64::new(0),
            painted_cells: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_rejected: AtomicU64::new(0),
            messages_rate_limited: AtomicU64::new(0),
            frames_broadcast: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        let mut sorted: Vec<u64> = history.iter().copied().collect();
        drop(history);
        sorted.sort_unstable();

        let p95_idx = ((sorted.len() as f32 * 0.95) as usize).min(sorted.len() - 1);
        self.tick_time_p95_us.store(sorted[p95_idx], Ordering::Relaxed);
        self.tick_time_max_us
            .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
    }

    /// Refresh population gauges after a tick or lifecycle change
    pub fn record_population(&self, players: usize, ants: usize, painted_cells: usize) {
        self.players.store(players as u64, Ordering::Relaxed);
        self.ants.store(ants as u64, Ordering::Relaxed);
        self.painted_cells.store(painted_cells as u64, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Saturate at zero
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_rate_limited(&self) {
        self.messages_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self, count: usize) {
        self.frames_broadcast.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("ant_arena_players", "Connected players", "gauge",
            self.players.load(Ordering::Relaxed));
        metric!("ant_arena_ants", "Ants on the grid", "gauge",
            self.ants.load(Ordering::Relaxed));
        metric!("ant_arena_painted_cells", "Painted grid cells", "gauge",
            self.painted_cells.load(Ordering::Relaxed));

        metric!("ant_arena_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("ant_arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("ant_arena_tick_time_max_microseconds", "Maximum recent tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("ant_arena_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        metric!("ant_arena_connections_active", "Open WebSocket sessions", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("ant_arena_messages_received_total", "Inbound messages", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("ant_arena_messages_rejected_total", "Inbound messages answered with ERROR", "counter",
            self.messages_rejected.load(Ordering::Relaxed));
        metric!("ant_arena_messages_rate_limited_total", "Inbound messages dropped by the rate limiter", "counter",
            self.messages_rate_limited.load(Ordering::Relaxed));
        metric!("ant_arena_frames_broadcast_total", "Outbound frames queued to sessions", "counter",
            self.frames_broadcast.load(Ordering::Relaxed));

        metric!("ant_arena_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.players.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_tick_time() {
        let metrics = Metrics::new();

        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert_eq!(metrics.tick_time_us.load(Ordering::Relaxed), 1090);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
        let p95 = metrics.tick_time_p95_us.load(Ordering::Relaxed);
        assert!(p95 >= 1000 && p95 <= 1090);
    }

    #[test]
    fn test_connection_gauge_saturates() {
        let metrics = Metrics::new();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.connection_closed();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.record_population(3, 2, 40);
        metrics.message_received();
        metrics.message_rate_limited();

        let output = metrics.to_prometheus();

        assert!(output.contains("ant_arena_players 3"));
        assert!(output.contains("ant_arena_ants 2"));
        assert!(output.contains("ant_arena_painted_cells 40"));
        assert!(output.contains("ant_arena_messages_received_total 1"));
        assert!(output.contains("ant_arena_messages_rate_limited_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE ant_arena_tick_count counter"));
    }
}
