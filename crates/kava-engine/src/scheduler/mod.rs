//! Cooperative scheduling
//!
//! A single host thread interleaves every Java thread one step at a time.
//! Time comes from a [`Clock`] so tests can drive sleeps and timed waits
//! deterministically.

mod clock;
mod pacing;
#[allow(clippy::module_inception)]
mod scheduler;
mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use pacing::FramePacer;
pub use scheduler::{FrameReport, Halt, Scheduler, SchedulerStats, TickOutcome};
pub use timer::TimerQueue;
