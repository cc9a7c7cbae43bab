//! Ticketlock calls
//!
//! Callers pass a `TicketLock`, normally a `static` visible to the whole
//! clone family; these are thin wrappers kept for the user-facing names.

use crate::sync::TicketLock;

pub fn initlock_t(lock: &TicketLock) {
    lock.init();
}

pub fn acquire_t(lock: &TicketLock) {
    lock.acquire();
}

pub fn release_t(lock: &TicketLock) {
    lock.release();
}
