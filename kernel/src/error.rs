//! Kernel Error Handling
//!
//! Typed errors for process table, clone/join and memory operations.
//! At the syscall boundary every error collapses to `-1`.

use crate::process::Pid;
use crate::scheduler::thread::ThreadState;
use core::fmt;

/// Kernel error types with context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    // ═══════════════════════════════════════════════════════════════
    // Resource Exhaustion
    // ═══════════════════════════════════════════════════════════════

    /// No free TCB slot left in the process table
    ProcessTableFull { max: usize },

    /// Heap growth refused (sbrk past the configured limit)
    OutOfMemory { requested: usize, available: usize },

    /// The scheduler could not start the thread
    SpawnFailed { pid: Pid },

    // ═══════════════════════════════════════════════════════════════
    // Invalid Arguments
    // ═══════════════════════════════════════════════════════════════

    /// Stack region is misaligned, too small or unmapped
    InvalidStack { addr: usize, reason: &'static str },

    /// Stack region overlaps the stack of another live thread
    StackOverlap { addr: usize, owner: Pid },

    /// Access to an unmapped or misaligned user address
    BadAddress { addr: usize },

    /// Rejected configuration value
    InvalidConfig { reason: &'static str },

    // ═══════════════════════════════════════════════════════════════
    // Protocol
    // ═══════════════════════════════════════════════════════════════

    /// join() called by a process without live or zombie children
    NoChildren { pid: Pid },

    /// Process not found in the table
    ProcessNotFound { pid: Pid },

    /// Invalid TCB state transition
    InvalidStateTransition { pid: Pid, from: ThreadState, to: ThreadState },

    /// The calling host thread is not bound to a TCB
    NoCurrentProcess,

    /// Global kernel not initialized
    NotInitialized,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessTableFull { max } => {
                write!(f, "Process table full: {} slots in use", max)
            }
            Self::OutOfMemory { requested, available } => {
                write!(f, "OOM: requested {} bytes, {} available", requested, available)
            }
            Self::SpawnFailed { pid } => write!(f, "Failed to start thread {}", pid),
            Self::InvalidStack { addr, reason } => {
                write!(f, "Invalid stack at {:#x}: {}", addr, reason)
            }
            Self::StackOverlap { addr, owner } => {
                write!(f, "Stack at {:#x} overlaps stack of pid {}", addr, owner)
            }
            Self::BadAddress { addr } => write!(f, "Bad user address {:#x}", addr),
            Self::InvalidConfig { reason } => write!(f, "Invalid config: {}", reason),
            Self::NoChildren { pid } => write!(f, "Process {} has no children to join", pid),
            Self::ProcessNotFound { pid } => write!(f, "Process {} not found", pid),
            Self::InvalidStateTransition { pid, from, to } => {
                write!(f, "Process {}: invalid transition {} -> {}", pid, from, to)
            }
            Self::NoCurrentProcess => write!(f, "No current process"),
            Self::NotInitialized => write!(f, "Kernel not initialized"),
        }
    }
}

impl KernelError {
    /// Value returned to user space for this error
    pub fn errno(&self) -> isize {
        -1
    }

    /// Is this error local to the caller (the kernel keeps running)?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidStateTransition { .. } | Self::NotInitialized)
    }

    /// Get recovery hint for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::ProcessTableFull { .. } => "Join finished threads or raise max_processes",
            Self::OutOfMemory { .. } => "Raise max_heap_pages or allocate less",
            Self::InvalidStack { .. } => "Pass a page-aligned page obtained from sbrk",
            Self::StackOverlap { .. } => "Give every live thread its own stack page",
            Self::NoChildren { .. } => "Nothing to join",
            Self::NotInitialized => "Call syscall::init() first",
            _ => "Check thread lifecycle management",
        }
    }
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_every_error_is_minus_one() {
        assert_eq!(KernelError::ProcessTableFull { max: 64 }.errno(), -1);
        assert_eq!(KernelError::NoChildren { pid: 3 }.errno(), -1);
        assert_eq!(KernelError::BadAddress { addr: 0 }.errno(), -1);
    }

    #[test]
    fn test_display() {
        let err = KernelError::InvalidStack { addr: 0x2004, reason: "not page aligned" };
        assert_eq!(err.to_string(), "Invalid stack at 0x2004: not page aligned");

        let err = KernelError::InvalidStateTransition {
            pid: 4,
            from: ThreadState::Zombie,
            to: ThreadState::Running,
        };
        assert_eq!(err.to_string(), "Process 4: invalid transition ZOMBIE -> RUNNING");
    }

    #[test]
    fn test_recoverable() {
        assert!(KernelError::ProcessTableFull { max: 1 }.is_recoverable());
        assert!(KernelError::NoChildren { pid: 1 }.is_recoverable());
        assert!(!KernelError::NotInitialized.is_recoverable());
        assert_eq!(
            KernelError::NotInitialized.recovery_hint(),
            "Call syscall::init() first"
        );
    }
}
