//! Thread module

pub mod state;
pub mod stack;

pub use state::{validate_transition, ThreadState};
pub use stack::{frame_arg, StackRegion, FAKE_RETURN_ADDR, THREAD_STACK_SIZE};
