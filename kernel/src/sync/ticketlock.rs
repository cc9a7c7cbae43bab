//! Ticket lock
//!
//! Fair spinlock: every `acquire` draws a ticket with one atomic fetch-and-add
//! and spins until `now_serving` reaches it, so holders enter in the order
//! they called `acquire`.
//!
//! Spinning burns CPU while waiting; use it for short critical sections only.
//!
//! Caller obligations (not checked):
//! - `release` only by the current holder, once per `acquire`;
//! - no recursive `acquire` by the holder (it deadlocks);
//! - `init` only while nobody else touches the lock.

use core::fmt;
use core::hint::spin_loop;
use core::sync::atomic::{AtomicU32, Ordering};

/// Spins before giving the processor away (host builds only)
#[cfg(feature = "std")]
const SPINS_BEFORE_YIELD: u32 = 64;

/// Ticket drawn by `acquire`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u32);

impl Ticket {
    pub fn value(self) -> u32 {
        self.0
    }
}

pub struct TicketLock {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
}

impl TicketLock {
    /// Create an initialized lock (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
        }
    }

    /// Reset both counters to zero
    pub fn init(&self) {
        self.next_ticket.store(0, Ordering::Relaxed);
        self.now_serving.store(0, Ordering::Release);
    }

    /// Draw a ticket and spin until it is served
    pub fn acquire(&self) -> Ticket {
        let my_ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "std")]
        let mut spins = 0u32;
        while self.now_serving.load(Ordering::Acquire) != my_ticket {
            spin_loop();
            #[cfg(feature = "std")]
            {
                spins += 1;
                if spins % SPINS_BEFORE_YIELD == 0 {
                    std::thread::yield_now();
                }
            }
        }
        Ticket(my_ticket)
    }

    /// Take the lock only if it is free and nobody is queued
    pub fn try_acquire(&self) -> Option<Ticket> {
        let serving = self.now_serving.load(Ordering::Acquire);
        self.next_ticket
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .ok()
            .map(Ticket)
    }

    /// Serve the next ticket
    pub fn release(&self) {
        self.now_serving.fetch_add(1, Ordering::Release);
    }

    /// Acquire and return a guard that releases on drop
    pub fn lock(&self) -> TicketGuard<'_> {
        let ticket = self.acquire();
        TicketGuard { lock: self, ticket }
    }

    /// Is a ticket currently being served?
    pub fn is_locked(&self) -> bool {
        self.queue_len() != 0
    }

    /// Tickets drawn but not yet released (holder included)
    pub fn queue_len(&self) -> u32 {
        let next = self.next_ticket.load(Ordering::Relaxed);
        let serving = self.now_serving.load(Ordering::Relaxed);
        next.wrapping_sub(serving)
    }

    /// Ticket currently allowed into the critical section
    pub fn now_serving(&self) -> u32 {
        self.now_serving.load(Ordering::Relaxed)
    }
}

impl Default for TicketLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TicketLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketLock")
            .field("next_ticket", &self.next_ticket.load(Ordering::Relaxed))
            .field("now_serving", &self.now_serving.load(Ordering::Relaxed))
            .finish()
    }
}

/// Guard that releases the lock when dropped
pub struct TicketGuard<'a> {
    lock: &'a TicketLock,
    ticket: Ticket,
}

impl TicketGuard<'_> {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
