//! Reentrant object monitors
//!
//! Every object can be locked. A monitor has one owner with a hold count, a
//! FIFO entry queue of threads waiting to own it, and a FIFO wait set of
//! threads parked in `Object.wait`. Releasing the last hold hands ownership
//! straight to the head of the entry queue.

use crate::thread::ThreadId;
use crate::value::ObjectId;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::VecDeque;

/// Errors raised by monitor operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    /// Operation requires ownership the thread does not have
    #[error("Thread {thread} does not own monitor {monitor:?}")]
    NotOwner { thread: ThreadId, monitor: ObjectId },

    /// No monitor exists for the object
    #[error("Monitor {0:?} not found")]
    NotFound(ObjectId),
}

/// Outcome of a monitor enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterResult {
    Acquired,
    /// Queued behind the current owner
    Blocked,
}

/// Monitor of one object
#[derive(Debug)]
pub struct Monitor {
    id: ObjectId,
    owner: Option<ThreadId>,
    count: usize,
    /// Threads waiting to own the monitor, with the hold count to restore
    entry_queue: VecDeque<(ThreadId, usize)>,
    /// Threads in `Object.wait`, with the hold count they gave up
    wait_set: VecDeque<(ThreadId, usize)>,
}

impl Monitor {
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            owner: None,
            count: 0,
            entry_queue: VecDeque::new(),
            wait_set: VecDeque::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    /// Hold count of the owner
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn entry_queue_len(&self) -> usize {
        self.entry_queue.len()
    }

    pub fn wait_set_len(&self) -> usize {
        self.wait_set.len()
    }

    pub fn is_owned_by(&self, thread: ThreadId) -> bool {
        self.owner == Some(thread)
    }

    /// Nobody owns, queues for or waits on the monitor
    pub fn is_idle(&self) -> bool {
        self.owner.is_none() && self.entry_queue.is_empty() && self.wait_set.is_empty()
    }

    /// Acquire with `count` holds, or queue behind the owner
    ///
    /// Reentry by the owner adds to its hold count.
    pub fn enter(&mut self, thread: ThreadId, count: usize) -> EnterResult {
        match self.owner {
            None => {
                self.owner = Some(thread);
                self.count = count;
                EnterResult::Acquired
            }
            Some(owner) if owner == thread => {
                self.count += count;
                EnterResult::Acquired
            }
            Some(_) => {
                self.entry_queue.push_back((thread, count));
                EnterResult::Blocked
            }
        }
    }

    /// Release one hold; returns the thread that now owns the monitor
    pub fn exit(&mut self, thread: ThreadId) -> Result<Option<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        self.count -= 1;
        if self.count > 0 {
            return Ok(None);
        }
        Ok(self.hand_off())
    }

    /// Release every hold and join the wait set
    ///
    /// Returns the hold count given up and the thread that now owns the monitor.
    pub fn wait(&mut self, thread: ThreadId) -> Result<(usize, Option<ThreadId>), MonitorError> {
        self.check_owner(thread)?;
        let count = self.count;
        self.wait_set.push_back((thread, count));
        Ok((count, self.hand_off()))
    }

    /// Move the longest waiter to the entry queue
    pub fn notify(&mut self, thread: ThreadId) -> Result<Option<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        let woken = self.wait_set.pop_front();
        if let Some(entry) = woken {
            self.entry_queue.push_back(entry);
        }
        Ok(woken.map(|(t, _)| t))
    }

    /// Move every waiter to the entry queue, oldest first
    pub fn notify_all(&mut self, thread: ThreadId) -> Result<Vec<ThreadId>, MonitorError> {
        self.check_owner(thread)?;
        let woken: Vec<ThreadId> = self.wait_set.iter().map(|(t, _)| *t).collect();
        self.entry_queue.extend(self.wait_set.drain(..));
        Ok(woken)
    }

    /// Take a timed-out waiter out of the wait set; returns its saved hold count
    pub fn cancel_wait(&mut self, thread: ThreadId) -> Option<usize> {
        let pos = self.wait_set.iter().position(|(t, _)| *t == thread)?;
        self.wait_set.remove(pos).map(|(_, count)| count)
    }

    /// Remove every trace of a terminating thread
    ///
    /// Returns the thread that now owns the monitor, if ownership moved.
    pub fn abandon(&mut self, thread: ThreadId) -> Option<ThreadId> {
        self.entry_queue.retain(|(t, _)| *t != thread);
        self.wait_set.retain(|(t, _)| *t != thread);
        if self.owner == Some(thread) {
            self.hand_off()
        } else {
            None
        }
    }

    fn hand_off(&mut self) -> Option<ThreadId> {
        match self.entry_queue.pop_front() {
            Some((next, count)) => {
                self.owner = Some(next);
                self.count = count;
                Some(next)
            }
            None => {
                self.owner = None;
                self.count = 0;
                None
            }
        }
    }

    fn check_owner(&self, thread: ThreadId) -> Result<(), MonitorError> {
        if self.owner == Some(thread) {
            Ok(())
        } else {
            Err(MonitorError::NotOwner {
                thread,
                monitor: self.id,
            })
        }
    }
}

/// Monitor journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorEvent {
    Acquired { thread: ThreadId, monitor: u64 },
    Released { thread: ThreadId, monitor: u64 },
}

/// Monitors of all objects, created on first use
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    monitors: FxHashMap<ObjectId, Monitor>,
    journal: Option<Vec<MonitorEvent>>,
}

impl MonitorRegistry {
    pub fn new(record_events: bool) -> Self {
        Self {
            monitors: FxHashMap::default(),
            journal: record_events.then(Vec::new),
        }
    }

    pub fn get_or_create(&mut self, id: ObjectId) -> &mut Monitor {
        self.monitors.entry(id).or_insert_with(|| Monitor::new(id))
    }

    pub fn get(&self, id: ObjectId) -> Option<&Monitor> {
        self.monitors.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut Monitor, MonitorError> {
        self.monitors.get_mut(&id).ok_or(MonitorError::NotFound(id))
    }

    /// Drop the monitor once nothing refers to it
    pub fn remove_if_idle(&mut self, id: ObjectId) {
        if self.monitors.get(&id).is_some_and(Monitor::is_idle) {
            self.monitors.remove(&id);
        }
    }

    pub fn count(&self) -> usize {
        self.monitors.len()
    }

    pub fn clear(&mut self) {
        self.monitors.clear();
    }

    pub fn record(&mut self, event: MonitorEvent) {
        if let Some(journal) = &mut self.journal {
            journal.push(event);
        }
    }

    /// Journal entries, empty unless recording is enabled
    pub fn events(&self) -> &[MonitorEvent] {
        self.journal.as_deref().unwrap_or(&[])
    }
}
