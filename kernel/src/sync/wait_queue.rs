//! Wait Queue
//!
//! A mechanism for threads to sleep until an event occurs. The caller
//! registers itself while still holding the lock that protects the condition,
//! drops that lock, then blocks; notifiers run under the same lock.

use crate::process::Pid;
use crate::scheduler::Scheduler;
use alloc::vec::Vec;
use spin::Mutex;

/// A queue of waiting threads
pub struct WaitQueue {
    waiting: Mutex<Vec<Pid>>,
}

impl WaitQueue {
    /// Create a new wait queue
    pub const fn new() -> Self {
        Self {
            waiting: Mutex::new(Vec::new()),
        }
    }

    /// Register `pid` as a waiter without blocking yet
    pub fn prepare(&self, pid: Pid) {
        let mut waiting = self.waiting.lock();
        if !waiting.contains(&pid) {
            waiting.push(pid);
        }
    }

    /// Drop `pid` from the queue if it is still listed (spurious wake-up).
    ///
    /// Returns true if it was still waiting.
    pub fn cancel(&self, pid: Pid) -> bool {
        let mut waiting = self.waiting.lock();
        match waiting.iter().position(|&x| x == pid) {
            Some(pos) => {
                waiting.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Wake up all waiting threads; returns how many were woken
    pub fn notify_all(&self, scheduler: &dyn Scheduler) -> usize {
        let mut waiting = self.waiting.lock();
        let count = waiting.len();
        for pid in waiting.drain(..) {
            scheduler.unblock(pid);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.waiting.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
