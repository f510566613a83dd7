//! Monitors and semaphores
//!
//! Both block Java threads, never host threads: a blocked thread leaves the
//! run queue and the scheduler runs another one.

mod monitor;
mod semaphore;

pub use monitor::{EnterResult, Monitor, MonitorError, MonitorEvent, MonitorRegistry};
pub use semaphore::{Semaphore, SemaphoreError, SemaphoreRegistry};
