//! Process management
//!
//! TCBs, the process table, and the clone / join / exit lifecycle.

pub mod clone;
pub mod join;
pub mod table;
pub mod tcb;

/// Process ID
pub type Pid = u64;

pub use table::{ProcessTable, TableInner};
pub use tcb::{ProcessInfo, Tcb, TcbFlags, ThreadContext, ThreadEntry};
