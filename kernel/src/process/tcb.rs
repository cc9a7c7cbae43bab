//! Thread Control Block
//!
//! One slot of the process table. A cloned thread is an ordinary TCB that
//! shares its parent's address space and carries the `THREAD` flag.

use super::Pid;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Context;
use crate::memory::{AddressSpace, VirtAddr};
use crate::scheduler::thread::{validate_transition, StackRegion, ThreadState};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

bitflags::bitflags! {
    /// TCB flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TcbFlags: u8 {
        /// Created by clone, shares its parent's address space
        const THREAD = 1 << 0;
        /// Parent exited first; reclaimed at its own exit
        const ORPHAN = 1 << 1;
        /// Started by `Kernel::exec`
        const INIT   = 1 << 2;
    }
}

/// Entry point of a cloned thread
pub type ThreadEntry = fn(&Context, VirtAddr);

/// Saved context of a thread that has not run yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadContext {
    /// Stack pointer (points at the fake return address)
    pub sp: VirtAddr,
    /// Instruction pointer (entry address)
    pub ip: usize,
}

pub struct Tcb {
    pub pid: Pid,
    state: ThreadState,
    pub name: String,
    pub space: Option<Arc<AddressSpace>>,
    /// Lookup only; `None` for init processes and orphans
    pub parent: Option<Pid>,
    /// Live and zombie children, in creation order
    pub children: Vec<Pid>,
    pub flags: TcbFlags,
    /// Caller-owned stack page (never freed by the kernel)
    pub stack: Option<StackRegion>,
    pub context: ThreadContext,
    pub entry: Option<ThreadEntry>,
    pub exit_status: i32,
}

impl Tcb {
    /// Empty slot
    pub fn unused() -> Self {
        Self {
            pid: 0,
            state: ThreadState::Unused,
            name: String::new(),
            space: None,
            parent: None,
            children: Vec::new(),
            flags: TcbFlags::empty(),
            stack: None,
            context: ThreadContext::default(),
            entry: None,
            exit_status: 0,
        }
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn set_state(&mut self, to: ThreadState) -> KernelResult<()> {
        let from = self.state;
        if !validate_transition(from, to) {
            return Err(KernelError::InvalidStateTransition { pid: self.pid, from, to });
        }
        log::debug!("pid {}: {} -> {}", self.pid, from, to);
        self.state = to;
        Ok(())
    }

    /// Clear everything but the (already UNUSED) state
    pub(crate) fn clear(&mut self) {
        debug_assert_eq!(self.state, ThreadState::Unused);
        *self = Self::unused();
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            parent: self.parent,
            state: self.state,
            name: self.name.clone(),
            flags: self.flags,
            children: self.children.len(),
        }
    }
}

impl Default for Tcb {
    fn default() -> Self {
        Self::unused()
    }
}

impl fmt::Debug for Tcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tcb")
            .field("pid", &self.pid)
            .field("state", &self.state)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("flags", &self.flags)
            .field("stack", &self.stack)
            .field("context", &self.context)
            .finish()
    }
}

/// Snapshot of one TCB, as listed by `Kernel::ps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub state: ThreadState,
    pub name: String,
    pub flags: TcbFlags,
    pub children: usize,
}

impl ProcessInfo {
    pub fn is_thread(&self) -> bool {
        self.flags.contains(TcbFlags::THREAD)
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pid, self.state, self.name)?;
        if let Some(ppid) = self.parent {
            write!(f, " (parent {})", ppid)?;
        }
        Ok(())
    }
}
