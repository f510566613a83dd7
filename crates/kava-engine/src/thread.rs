//! Java threads
//!
//! A thread owns its stack, its open try regions and the list of monitors it
//! holds. The scheduler is the only thing that changes its state, and every
//! change goes through [`Thread::transition`].

use crate::error::{EngineError, EngineResult};
use crate::exception::{JavaException, PendingFinally, TryRegion};
use crate::program::IoToken;
use crate::stack::Stack;
use crate::value::{ObjectId, Value};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique thread identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ThreadId(u64);

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

impl ThreadId {
    pub fn new() -> Self {
        ThreadId(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Java thread states
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ThreadState {
    /// Created, not yet started
    New,
    /// In the run queue
    Runnable,
    /// Executing the current tick
    Running,
    /// Blocked without a deadline
    Waiting,
    /// Blocked until a deadline or an earlier wakeup
    TimedWaiting,
    /// Finished; never changes again
    Terminated,
}

impl ThreadState {
    pub fn can_transition_to(self, to: ThreadState) -> bool {
        use ThreadState::*;
        match (self, to) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (New, Runnable) => true,
            (Runnable, Running) => true,
            (Running, Runnable | Waiting | TimedWaiting) => true,
            (Waiting | TimedWaiting, Runnable) => true,
            // a timed wait that timed out and now queues for its monitor
            (TimedWaiting, Waiting) => true,
            // a notified waiter keeps waiting, for the monitor this time
            (Waiting, Waiting) => true,
            _ => false,
        }
    }

    pub fn is_alive(self) -> bool {
        !matches!(self, ThreadState::New | ThreadState::Terminated)
    }

    pub fn is_blocked(self) -> bool {
        matches!(self, ThreadState::Waiting | ThreadState::TimedWaiting)
    }
}

/// What a blocked thread waits for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Queued on a monitor's entry queue
    MonitorEnter(ObjectId),
    /// In a monitor's wait set
    MonitorWait(ObjectId),
    /// Another thread to terminate
    Join(ThreadId),
    Sleep,
    /// Permits of a semaphore
    Semaphore(ObjectId),
    /// Host I/O completion
    Io(IoToken),
}

/// Action applied before the thread's next step
#[derive(Debug, Clone)]
pub(crate) enum Resume {
    Push(Value),
    Throw(Arc<JavaException>),
}

/// A Java thread
#[derive(Debug)]
pub struct Thread {
    id: ThreadId,
    name: String,
    state: ThreadState,
    pub(crate) stack: Stack,
    pub(crate) try_regions: Vec<TryRegion>,
    pub(crate) pending_finally: Vec<PendingFinally>,
    /// One entry per monitor hold, in acquisition order
    held_monitors: Vec<ObjectId>,
    pub(crate) blocked_on: Option<BlockReason>,
    /// Threads blocked in `join` on this one
    pub(crate) joiners: Vec<ThreadId>,
    /// Bumped on every wakeup so stale timer entries are ignored
    pub(crate) wake_generation: u64,
    pub(crate) resume: Option<Resume>,
    step_count: u64,
}

impl Thread {
    pub fn new(name: impl Into<String>, max_stack_depth: usize) -> Self {
        Self {
            id: ThreadId::new(),
            name: name.into(),
            state: ThreadState::New,
            stack: Stack::with_capacity(max_stack_depth),
            try_regions: Vec::new(),
            pending_finally: Vec::new(),
            held_monitors: Vec::new(),
            blocked_on: None,
            joiners: Vec::new(),
            wake_generation: 0,
            resume: None,
            step_count: 0,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Change state, rejecting moves the state machine forbids
    pub fn transition(&mut self, to: ThreadState) -> EngineResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(EngineError::IllegalStateTransition {
                thread: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn blocked_on(&self) -> Option<&BlockReason> {
        self.blocked_on.as_ref()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub(crate) fn count_step(&mut self) {
        self.step_count += 1;
    }

    pub fn try_depth(&self) -> usize {
        self.try_regions.len()
    }

    // ========================================================================
    // Held Monitors
    // ========================================================================

    pub fn held_monitors(&self) -> &[ObjectId] {
        &self.held_monitors
    }

    pub fn add_held_monitor(&mut self, monitor: ObjectId) {
        self.held_monitors.push(monitor);
    }

    /// Forget the most recent hold of `monitor`
    pub fn remove_held_monitor(&mut self, monitor: ObjectId) -> bool {
        match self.held_monitors.iter().rposition(|m| *m == monitor) {
            Some(pos) => {
                self.held_monitors.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every hold of `monitor`
    pub fn remove_all_holds(&mut self, monitor: ObjectId) {
        self.held_monitors.retain(|m| *m != monitor);
    }

    /// Holds recorded after `mark`, in acquisition order
    pub fn take_monitors_since(&mut self, mark: usize) -> Vec<ObjectId> {
        if mark >= self.held_monitors.len() {
            return Vec::new();
        }
        self.held_monitors.split_off(mark)
    }

    /// Distinct held monitors, most recent first
    pub(crate) fn take_all_monitors(&mut self) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = Vec::new();
        for monitor in self.held_monitors.drain(..).rev() {
            if !out.contains(&monitor) {
                out.push(monitor);
            }
        }
        out
    }
}
