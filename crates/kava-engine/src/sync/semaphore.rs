//! Counting semaphores backing `java.util.concurrent.Semaphore`

use crate::thread::ThreadId;
use crate::value::ObjectId;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Errors that can occur when using a Semaphore
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemaphoreError {
    /// Object has no semaphore attached
    #[error("Semaphore {0:?} not found")]
    NotFound(ObjectId),

    /// Constructor ran twice on one object
    #[error("Semaphore {0:?} already initialized")]
    AlreadyInitialized(ObjectId),
}

/// Semaphore with a FIFO queue of blocked threads
///
/// Permits are not capped: releasing more than was acquired raises the count,
/// as in Java. The count may start negative, in which case releases pay off
/// the deficit before any acquire succeeds.
#[derive(Debug)]
pub struct Semaphore {
    id: ObjectId,
    permits: i64,
    /// Blocked threads with their requested permit counts
    wait_queue: VecDeque<(ThreadId, usize)>,
}

impl Semaphore {
    pub fn new(id: ObjectId, permits: i64) -> Self {
        Self {
            id,
            permits,
            wait_queue: VecDeque::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn available_permits(&self) -> i64 {
        self.permits
    }

    /// Take `count` permits, or queue the thread
    ///
    /// A request never overtakes threads already queued.
    pub fn try_acquire(&mut self, thread: ThreadId, count: usize) -> bool {
        let permits = permit_count(count);
        if self.wait_queue.is_empty() && self.permits >= permits {
            self.permits -= permits;
            return true;
        }
        self.wait_queue.push_back((thread, count));
        false
    }

    /// Return permits; the threads whose requests are now satisfied are returned in order
    pub fn release(&mut self, count: usize) -> Vec<ThreadId> {
        self.permits = self.permits.saturating_add(permit_count(count));
        let mut resumed = Vec::new();
        while let Some(&(thread, needed)) = self.wait_queue.front() {
            let needed = permit_count(needed);
            if self.permits < needed {
                break;
            }
            self.permits -= needed;
            self.wait_queue.pop_front();
            resumed.push(thread);
        }
        resumed
    }

    /// Drop a terminating thread from the queue
    ///
    /// Threads behind it may now be satisfiable; they are returned.
    pub fn cancel(&mut self, thread: ThreadId) -> Vec<ThreadId> {
        let before = self.wait_queue.len();
        self.wait_queue.retain(|(t, _)| *t != thread);
        if self.wait_queue.len() == before {
            return Vec::new();
        }
        self.release(0)
    }

    pub fn waiting_count(&self) -> usize {
        self.wait_queue.len()
    }
}

fn permit_count(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Semaphores keyed by the object they belong to
#[derive(Debug, Default)]
pub struct SemaphoreRegistry {
    semaphores: FxHashMap<ObjectId, Semaphore>,
}

impl SemaphoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: ObjectId, permits: i64) -> Result<&mut Semaphore, SemaphoreError> {
        if self.semaphores.contains_key(&id) {
            return Err(SemaphoreError::AlreadyInitialized(id));
        }
        Ok(self
            .semaphores
            .entry(id)
            .or_insert_with(|| Semaphore::new(id, permits)))
    }

    pub fn get(&self, id: ObjectId) -> Result<&Semaphore, SemaphoreError> {
        self.semaphores.get(&id).ok_or(SemaphoreError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut Semaphore, SemaphoreError> {
        self.semaphores.get_mut(&id).ok_or(SemaphoreError::NotFound(id))
    }

    /// Remove a thread from every queue; returns threads that became satisfiable
    pub fn cancel_thread(&mut self, thread: ThreadId) -> Vec<ThreadId> {
        self.semaphores
            .values_mut()
            .flat_map(|s| s.cancel(thread))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.semaphores.len()
    }

    pub fn clear(&mut self) {
        self.semaphores.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release() {
        let mut sem = Semaphore::new(ObjectId::new(), 2);
        let t = ThreadId::new();
        assert!(sem.try_acquire(t, 2));
        assert_eq!(sem.available_permits(), 0);
        assert!(sem.release(1).is_empty());
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn test_waiters_resume_in_order() {
        let mut sem = Semaphore::new(ObjectId::new(), 0);
        let (a, b, c) = (ThreadId::new(), ThreadId::new(), ThreadId::new());
        assert!(!sem.try_acquire(a, 2));
        assert!(!sem.try_acquire(b, 1));
        // b alone would fit, but a is ahead
        assert!(sem.release(1).is_empty());
        assert_eq!(sem.release(2), vec![a, b]);
        assert!(!sem.try_acquire(c, 1));
        assert_eq!(sem.waiting_count(), 1);
    }

    #[test]
    fn test_release_beyond_initial() {
        let mut sem = Semaphore::new(ObjectId::new(), 1);
        sem.release(3);
        assert_eq!(sem.available_permits(), 4);
    }

    #[test]
    fn test_negative_start_pays_off_deficit() {
        let mut sem = Semaphore::new(ObjectId::new(), -2);
        let t = ThreadId::new();
        assert!(!sem.try_acquire(t, 1));
        assert!(sem.release(2).is_empty());
        assert_eq!(sem.available_permits(), 0);
        assert_eq!(sem.release(1), vec![t]);
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn test_cancel_unblocks_followers() {
        let mut sem = Semaphore::new(ObjectId::new(), 1);
        let (a, b) = (ThreadId::new(), ThreadId::new());
        assert!(!sem.try_acquire(a, 5));
        assert!(!sem.try_acquire(b, 1));
        assert_eq!(sem.cancel(a), vec![b]);
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn test_registry() {
        let mut reg = SemaphoreRegistry::new();
        let id = ObjectId::new();
        reg.create(id, 3).unwrap();
        assert_eq!(reg.create(id, 1).unwrap_err(), SemaphoreError::AlreadyInitialized(id));
        assert_eq!(reg.get(id).unwrap().available_permits(), 3);
        assert!(reg.get(ObjectId::new()).is_err());
    }
}
