//! Time sources for sleeps and timed waits

use crossbeam::atomic::AtomicCell;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Monotonic time since an arbitrary origin
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Duration;
}

/// Wall clock
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock moved only by the host, for deterministic runs
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicCell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.store(self.now.load() + by);
    }

    pub fn set(&self, now: Duration) {
        self.now.store(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.load()
    }
}
