//! Tokio-driven wall clock
//!
//! Timestamps follow the tokio clock, so paused test time also pauses the
//! timestamps stamped on readings.

use chrono::{DateTime, Utc};
use seawatch::clock::to_chrono;
use seawatch::Clock;
use tokio::time::Instant;

/// Wall clock anchored to a tokio instant
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall_origin: DateTime<Utc>,
    origin: Instant,
}

impl TokioClock {
    /// Anchor at the current system time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchor at a given wall time
    pub fn starting_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            wall_origin,
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.wall_origin + to_chrono(self.origin.elapsed())
    }
}
