//! # Interface des appels système
//!
//! Handlers returning plain integers (`-1` on any error), plus the global
//! kernel instance used by user programs. The global is set once and never
//! replaced.

pub mod handlers;

pub use handlers::process::{sys_clone, sys_exit, sys_getpid, sys_join, sys_sbrk, sys_sleep};
pub use handlers::sync::{acquire_t, initlock_t, release_t};

use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use alloc::sync::Arc;
use spin::Once;

static KERNEL: Once<Arc<Kernel>> = Once::new();

/// Make `kernel` the global kernel. A kernel installed earlier wins.
pub fn install(kernel: Arc<Kernel>) -> &'static Arc<Kernel> {
    KERNEL.call_once(|| kernel)
}

/// Initialise le noyau global (host scheduler) et le logger.
///
/// Idempotent: later calls return the kernel built by the first one.
#[cfg(feature = "std")]
pub fn init(config: crate::config::KernelConfig) -> KernelResult<&'static Arc<Kernel>> {
    if let Some(kernel) = KERNEL.get() {
        return Ok(kernel);
    }
    crate::logger::init_with_level(config.log_level);
    let kernel = Kernel::host(config)?;
    Ok(install(kernel))
}

/// The global kernel
pub fn kernel() -> KernelResult<&'static Arc<Kernel>> {
    KERNEL.get().ok_or(KernelError::NotInitialized)
}
