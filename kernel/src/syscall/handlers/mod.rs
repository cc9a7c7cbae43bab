//! System Call Handlers
//!
//! Organized by category:
//! - process: clone / join / exit and the process calls they rely on
//! - sync: ticketlock calls

pub mod process;
pub mod sync;
