//! Process table
//!
//! Fixed array of TCB slots behind a single lock. Allocation, marking a TCB
//! ZOMBIE and reclaiming it all happen under that lock, so they are atomic
//! with respect to each other. Pids come from a counter that is only bumped
//! under the lock: they never repeat and always increase.

use super::tcb::{ProcessInfo, Tcb};
use super::Pid;
use crate::error::{KernelError, KernelResult};
use crate::memory::AddressSpace;
use crate::scheduler::thread::{StackRegion, ThreadState};
use crate::sync::WaitQueue;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// First pid handed out
const FIRST_PID: Pid = 1;

pub struct ProcessTable {
    inner: Mutex<TableInner>,
    /// Child-exit wait queue of the TCB in the slot with the same index
    child_exit: Box<[WaitQueue]>,
}

pub struct TableInner {
    slots: Vec<Tcb>,
    next_pid: Pid,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Tcb::unused);
        let child_exit = (0..capacity).map(|_| WaitQueue::new()).collect();
        Self {
            inner: Mutex::new(TableInner { slots, next_pid: FIRST_PID }),
            child_exit,
        }
    }

    /// Take the table lock
    pub fn lock(&self) -> MutexGuard<'_, TableInner> {
        self.inner.lock()
    }

    /// Child-exit wait queue of slot `idx`
    pub fn child_exit(&self, idx: usize) -> &WaitQueue {
        &self.child_exit[idx]
    }

    pub fn capacity(&self) -> usize {
        self.child_exit.len()
    }

    /// Snapshot of every live TCB, by pid
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        self.lock().snapshot()
    }
}

impl TableInner {
    /// Claim a free slot (UNUSED -> EMBRYO) and give it the next pid.
    pub fn allocate(&mut self) -> KernelResult<(usize, Pid)> {
        let max = self.slots.len();
        let idx = self
            .slots
            .iter()
            .position(|t| t.state() == ThreadState::Unused)
            .ok_or(KernelError::ProcessTableFull { max })?;
        let pid = self.next_pid;
        let tcb = &mut self.slots[idx];
        tcb.pid = pid;
        tcb.set_state(ThreadState::Embryo)?;
        self.next_pid += 1;
        Ok((idx, pid))
    }

    pub fn index_of(&self, pid: Pid) -> Option<usize> {
        self.slots
            .iter()
            .position(|t| t.state().is_live() && t.pid == pid)
    }

    pub fn get(&self, pid: Pid) -> KernelResult<&Tcb> {
        self.index_of(pid)
            .map(|idx| &self.slots[idx])
            .ok_or(KernelError::ProcessNotFound { pid })
    }

    pub fn get_mut(&mut self, pid: Pid) -> KernelResult<&mut Tcb> {
        match self.index_of(pid) {
            Some(idx) => Ok(&mut self.slots[idx]),
            None => Err(KernelError::ProcessNotFound { pid }),
        }
    }

    pub fn slot_mut(&mut self, idx: usize) -> &mut Tcb {
        &mut self.slots[idx]
    }

    /// Reclaim a ZOMBIE (or a never-started EMBRYO) TCB.
    pub fn release(&mut self, pid: Pid) -> KernelResult<()> {
        let tcb = self.get_mut(pid)?;
        tcb.set_state(ThreadState::Unused)?;
        tcb.clear();
        Ok(())
    }

    /// Zombie child of `parent` with the lowest pid
    pub fn zombie_child_of(&self, parent: Pid) -> Option<Pid> {
        self.slots
            .iter()
            .filter(|t| t.state() == ThreadState::Zombie && t.parent == Some(parent))
            .map(|t| t.pid)
            .min()
    }

    /// Live TCB of `space` whose stack overlaps `region`
    pub fn stack_owner(&self, space: &Arc<AddressSpace>, region: &StackRegion) -> Option<Pid> {
        self.slots
            .iter()
            .filter(|t| t.state().is_live())
            .filter(|t| t.space.as_ref().is_some_and(|s| Arc::ptr_eq(s, space)))
            .find(|t| t.stack.is_some_and(|s| s.overlaps(region)))
            .map(|t| t.pid)
    }

    /// Number of slots not UNUSED
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|t| t.state().is_live()).count()
    }

    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        let mut infos: Vec<ProcessInfo> = self
            .slots
            .iter()
            .filter(|t| t.state().is_live())
            .map(Tcb::info)
            .collect();
        infos.sort_by_key(|info| info.pid);
        infos
    }
}
