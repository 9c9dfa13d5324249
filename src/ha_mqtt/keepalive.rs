use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Time source for the keepalive scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Lets a run loop be stepped without
/// real time passing.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Decides when the broker needs a keepalive ping.
///
/// The ping interval is 80% of the client keepalive, truncated to whole
/// seconds, so a ping always lands before the broker's own deadline.
#[derive(Debug, Clone)]
pub struct KeepaliveSchedule {
    interval: Duration,
    last_ping: Instant,
}

impl KeepaliveSchedule {
    pub fn new(keepalive: Duration, now: Instant) -> Self {
        Self {
            interval: Duration::from_secs(keepalive.as_secs() * 4 / 5),
            last_ping: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_ping(&self) -> Instant {
        self.last_ping
    }

    /// True once strictly more than one interval has passed since the last ping.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_ping) > self.interval
    }

    pub fn record_ping(&mut self, now: Instant) {
        self.last_ping = now;
    }
}
