//! Scheduler subsystem
//!
//! The thread core does not pick what runs next. It hands runnable TCBs to a
//! [`Scheduler`] and relies on it to eventually run every one of them.

pub mod thread;

#[cfg(feature = "std")]
pub mod host;

// Re-exports
pub use thread::{StackRegion, ThreadState};

#[cfg(feature = "std")]
pub use host::HostScheduler;

use crate::error::KernelResult;
use crate::process::Pid;
use alloc::boxed::Box;

/// Exit status of a thread whose body faulted
pub const KILLED_STATUS: i32 = -1;

/// Body handed to [`Scheduler::launch`]
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling collaborator of the thread core
pub trait Scheduler: Send + Sync {
    /// Make `pid` runnable; `task` runs once when it is first dispatched.
    fn launch(&self, pid: Pid, task: Task) -> KernelResult<()>;

    /// Bind the calling thread of control to `pid`.
    fn attach_current(&self, pid: Pid);

    /// Undo [`Scheduler::attach_current`].
    fn detach_current(&self);

    /// Block the current thread until [`Scheduler::unblock`] targets it.
    ///
    /// May return spuriously. An unblock that happens between the caller
    /// registering as a waiter and calling this must not be lost.
    fn block_current(&self);

    /// Wake a blocked thread
    fn unblock(&self, pid: Pid);

    /// Sleep for `ticks` timer ticks
    fn sleep(&self, ticks: u64);

    /// Run a user body and return its exit status: 0 if it returned, the
    /// status passed to [`Scheduler::exit_current`] if it exited,
    /// [`KILLED_STATUS`] if it faulted.
    fn run_user(&self, body: &mut dyn FnMut()) -> i32;

    /// Leave the current user body for good.
    fn exit_current(&self, status: i32) -> !;
}
