//! Per-actor cooldown tracking
//!
//! Caller-side rate limiting: the command layer checks an actor's
//! cooldown before invoking the engine. The engine itself imposes no
//! throughput limit. The tracker is an explicit service object with an
//! injected clock, constructed once per process and shared by handlers;
//! expired entries are removed as they are touched.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Time source, injectable for tests
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    /// Actor may proceed; their window has been restarted
    Ready,
    /// Actor must wait this long before the next action
    Cooling(Duration),
}

/// Tracks the last action time per actor within a fixed window
pub struct CooldownTracker<C: Clock = SystemClock> {
    window: Duration,
    clock: C,
    // Map: actor id -> last action time
    last_action: DashMap<String, DateTime<Utc>>,
}

impl CooldownTracker<SystemClock> {
    /// Tracker on the system clock
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, SystemClock)
    }
}

impl<C: Clock> CooldownTracker<C> {
    /// Tracker with an injected clock
    pub fn with_clock(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            last_action: DashMap::new(),
        }
    }

    /// Check whether `actor` may act now. `Ready` both answers yes and
    /// records the action; `Cooling` reports the remaining wait.
    /// Expired entries are evicted rather than kept around.
    pub fn check_and_touch(&self, actor: &str) -> CooldownStatus {
        let now = self.clock.now();

        if let Some(entry) = self.last_action.get(actor) {
            let elapsed = now - *entry.value();
            if elapsed < self.window {
                return CooldownStatus::Cooling(self.window - elapsed);
            }
            drop(entry);
            self.last_action.remove(actor);
        }

        self.last_action.insert(actor.to_string(), now);
        CooldownStatus::Ready
    }

    /// Clear an actor's window (manual override)
    pub fn reset(&self, actor: &str) {
        self.last_action.remove(actor);
    }

    /// Number of actors currently inside a window or awaiting eviction
    pub fn tracked_actors(&self) -> usize {
        self.last_action.len()
    }
}
