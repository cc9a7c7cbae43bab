//! State - TCB state machine
//!
//! Manages thread lifecycle and state transitions:
//!
//! ```text
//! UNUSED -> EMBRYO -> RUNNABLE <-> RUNNING -> ZOMBIE -> UNUSED
//!                        ^            |
//!                        +- SLEEPING <+
//! ```

use core::fmt;

/// Thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ThreadState {
    /// Free table slot
    #[default]
    Unused = 0,

    /// Slot allocated, thread being set up
    Embryo = 1,

    /// Thread is ready to run
    Runnable = 2,

    /// Thread is currently running
    Running = 3,

    /// Thread is blocked (join wait or sleep)
    Sleeping = 4,

    /// Thread has terminated and waits to be reaped
    Zombie = 5,
}

impl ThreadState {
    /// Check if the slot holds a TCB (anything but UNUSED)
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Unused)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unused => write!(f, "UNUSED"),
            Self::Embryo => write!(f, "EMBRYO"),
            Self::Runnable => write!(f, "RUNNABLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Sleeping => write!(f, "SLEEPING"),
            Self::Zombie => write!(f, "ZOMBIE"),
        }
    }
}

/// Validate state transition
pub fn validate_transition(from: ThreadState, to: ThreadState) -> bool {
    use ThreadState::*;

    match (from, to) {
        // Slot allocation
        (Unused, Embryo) => true,

        // Clone finished setting up the thread
        (Embryo, Runnable) => true,

        // Clone failed after allocation
        (Embryo, Unused) => true,

        // Dispatch / preemption
        (Runnable, Running) => true,
        (Running, Runnable) => true,

        // join() wait or sleep()
        (Running, Sleeping) => true,

        // Woken up
        (Sleeping, Runnable) => true,

        // exit()
        (Running, Zombie) => true,

        // Reaped
        (Zombie, Unused) => true,

        // All other transitions invalid
        _ => false,
    }
}
