//! Memory management subsystem
//!
//! Only what the thread core needs: user addresses and the shared address
//! space. Page tables stay outside the core.

pub mod address;
pub mod address_space;

// Re-exports
pub use address::{page_round_up, VirtAddr, PGSIZE, WORD_SIZE};
pub use address_space::{AddressSpace, Global, DATA_BASE, HEAP_BASE};
