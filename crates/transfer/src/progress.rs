//! Throughput of a sequential upload.

use tokio::time::Instant;

/// Tracks the rate of the last chunk and of the whole upload so far.
#[derive(Debug, Clone)]
pub struct RateMeter {
    started_at: Instant,
    last_at: Instant,
    total: u64,
    last_rate: f64,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateMeter {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started_at: now,
            last_at: now,
            total: 0,
            last_rate: 0.0,
        }
    }

    /// Records a chunk of `bytes` finished now.
    pub fn record(&mut self, bytes: u64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_at);
        self.last_rate = if elapsed.is_zero() {
            0.0
        } else {
            bytes as f64 / elapsed.as_secs_f64()
        };
        self.last_at = now;
        self.total += bytes;
    }

    /// Bytes/second of the most recent chunk.
    pub fn chunk_rate(&self) -> f64 {
        self.last_rate
    }

    /// Bytes/second since the meter was created.
    pub fn overall_rate(&self) -> f64 {
        let elapsed = self.started_at.elapsed();
        if elapsed.is_zero() {
            return 0.0;
        }
        self.total as f64 / elapsed.as_secs_f64()
    }
}

/// Human-readable rate, e.g. `12.50 MiB/s`.
pub fn format_rate(bytes_per_second: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut value = bytes_per_second.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}
