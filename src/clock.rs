use chrono::{DateTime, Utc};
use std::{sync::Mutex, time::Duration};
use tracing::debug;

/// Source of record timestamps. Every call to [Clock::now] returns a value strictly
/// later than the previous one, even when the system clock has not advanced.
#[derive(Debug, Default)]
pub struct Clock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut now = Utc::now();

        if let Some(prev) = *last {
            if now <= prev {
                now = prev + chrono::Duration::microseconds(1);
            }
        }

        *last = Some(now);
        now
    }

    /// Make sure subsequent timestamps are later than `at`.
    /// Used when seeding records that carry their own timestamps.
    pub fn observe(&self, at: DateTime<Utc>) {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if last.map_or(true, |prev| prev < at) {
            *last = Some(at);
        }
    }
}

/// Kind of store operation, each with its own simulated round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    ListAll,
    Get,
    ListByFolder,
    Mutate,
    Search,
    Roots,
    Children,
    Toggle,
}

impl OpKind {
    fn base_delay(self) -> Duration {
        let ms = match self {
            OpKind::ListAll | OpKind::Mutate => 300,
            OpKind::ListByFolder | OpKind::Roots => 250,
            OpKind::Get | OpKind::Search | OpKind::Children => 200,
            OpKind::Toggle => 150,
        };
        Duration::from_millis(ms)
    }
}

/// Artificial latency applied before a store touches its collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Latency {
    /// Operations complete without suspending on a timer.
    None,

    /// Operations sleep for their base delay multiplied by `scale`.
    Simulated { scale: f64 },
}

impl Latency {
    pub fn none() -> Self {
        Self::None
    }

    pub fn simulated() -> Self {
        Self::Simulated { scale: 1.0 }
    }

    /// Delay for `op`. Negative or NaN scales mean no delay, overflowing ones saturate.
    pub fn delay_for(&self, op: OpKind) -> Duration {
        match self {
            Latency::None => Duration::ZERO,
            Latency::Simulated { scale } if scale.is_nan() || *scale <= 0.0 => Duration::ZERO,
            Latency::Simulated { scale } => {
                Duration::try_from_secs_f64(op.base_delay().as_secs_f64() * scale)
                    .unwrap_or(Duration::MAX)
            }
        }
    }

    pub async fn pause(&self, op: OpKind) {
        let delay = self.delay_for(op);

        if delay.is_zero() {
            // Still yield so concurrent callers interleave like they would on a timer
            tokio::task::yield_now().await;
            return;
        }

        debug!("Simulating {op:?} latency of {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::simulated()
    }
}
