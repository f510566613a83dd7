//! Deadlines of sleeping and timed-waiting threads

use crate::thread::ThreadId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// Entry in the timer heap
#[derive(Debug)]
struct SleepEntry {
    wake_at: Duration,
    thread: ThreadId,
    /// Wake generation of the thread when the entry was scheduled
    generation: u64,
}

// Reversed so the heap pops the earliest deadline first
impl Ord for SleepEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wake_at
            .cmp(&self.wake_at)
            .then_with(|| other.thread.cmp(&self.thread))
    }
}

impl PartialOrd for SleepEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SleepEntry {
    fn eq(&self, other: &Self) -> bool {
        self.wake_at == other.wake_at && self.thread == other.thread
    }
}

impl Eq for SleepEntry {}

/// Min-heap of thread deadlines
///
/// Entries are never removed early. A thread woken by other means bumps its
/// wake generation, and the stale entry is dropped when it comes due.
#[derive(Debug, Default)]
pub struct TimerQueue {
    sleeping: BinaryHeap<SleepEntry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, thread: ThreadId, generation: u64, wake_at: Duration) {
        self.sleeping.push(SleepEntry {
            wake_at,
            thread,
            generation,
        });
    }

    /// Remove and return every entry due at `now`, earliest first
    pub fn pop_due(&mut self, now: Duration) -> Vec<(ThreadId, u64)> {
        let mut due = Vec::new();
        while let Some(entry) = self.sleeping.peek() {
            if entry.wake_at > now {
                break;
            }
            if let Some(entry) = self.sleeping.pop() {
                due.push((entry.thread, entry.generation));
            }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.sleeping.peek().map(|e| e.wake_at)
    }

    pub fn len(&self) -> usize {
        self.sleeping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sleeping.is_empty()
    }

    pub fn clear(&mut self) {
        self.sleeping.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_deadline_order() {
        let mut timers = TimerQueue::new();
        let (a, b, c) = (ThreadId::new(), ThreadId::new(), ThreadId::new());
        timers.schedule(a, 0, Duration::from_millis(30));
        timers.schedule(b, 0, Duration::from_millis(10));
        timers.schedule(c, 4, Duration::from_millis(20));

        assert_eq!(timers.next_deadline(), Some(Duration::from_millis(10)));
        assert!(timers.pop_due(Duration::from_millis(5)).is_empty());
        assert_eq!(timers.pop_due(Duration::from_millis(20)), vec![(b, 0), (c, 4)]);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.pop_due(Duration::from_secs(1)), vec![(a, 0)]);
        assert!(timers.is_empty());
    }
}
