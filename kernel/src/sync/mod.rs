pub mod ticketlock;
pub mod wait_queue;

pub use ticketlock::{Ticket, TicketGuard, TicketLock};
pub use wait_queue::WaitQueue;
