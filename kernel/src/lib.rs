// src/lib.rs
// Point d'entrée de la bibliothèque: cœur threads (clone / join / ticketlock)
#![cfg_attr(not(feature = "std"), no_std)]

// Import de alloc pour les allocations dynamiques
extern crate alloc;

// Modules du noyau
pub mod config;
pub mod error;
pub mod kernel;
pub mod logger;
pub mod memory;
pub mod process;
pub mod scheduler;
pub mod sync;
pub mod syscall;

// Réexportations
pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use kernel::{Context, ExitRecord, Kernel, StatsSnapshot};
pub use memory::{AddressSpace, Global, VirtAddr, PGSIZE};
pub use process::{Pid, ProcessInfo, ThreadEntry};
pub use scheduler::{Scheduler, ThreadState, KILLED_STATUS};
pub use sync::{TicketGuard, TicketLock};

#[cfg(feature = "std")]
pub use scheduler::HostScheduler;
