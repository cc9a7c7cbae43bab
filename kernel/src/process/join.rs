//! join / exit / sleep
//!
//! exit marks the TCB ZOMBIE under the table lock and wakes the parent if it
//! sits in its child-exit queue. join reaps the zombie child with the lowest
//! pid, or sleeps on that queue until a child exits. Marking and reaping
//! share the table lock, so every store a child made before exiting is
//! visible to the parent once join returns it.
//!
//! TCBs without a parent (init processes, orphans) are reclaimed at exit.

use super::tcb::TcbFlags;
use super::{Pid, TableInner};
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::scheduler::thread::ThreadState;
use core::mem;

/// Reap one zombie child of `pid`, waiting for one if needed.
///
/// Returns the child's pid and exit status. Fails with `NoChildren` at once
/// if `pid` has neither live nor zombie children.
pub fn join(kernel: &Kernel, pid: Pid) -> KernelResult<(Pid, i32)> {
    let mut table = kernel.table().lock();
    loop {
        if table.get(pid)?.children.is_empty() {
            log::debug!("join: pid {} has no children", pid);
            return Err(KernelError::NoChildren { pid });
        }

        if let Some(child) = table.zombie_child_of(pid) {
            let status = reap(&mut table, pid, child)?;
            kernel.counters().record_join();
            log::info!("Join: parent={} reaped child={} (status {})", pid, child, status);
            return Ok((child, status));
        }

        let idx = table
            .index_of(pid)
            .ok_or(KernelError::ProcessNotFound { pid })?;
        let queue = kernel.table().child_exit(idx);
        table.get_mut(pid)?.set_state(ThreadState::Sleeping)?;
        queue.prepare(pid);
        drop(table);

        kernel.scheduler().block_current();

        table = kernel.table().lock();
        // Still queued means nobody woke us.
        queue.cancel(pid);
        let tcb = table.get_mut(pid)?;
        if tcb.state() == ThreadState::Sleeping {
            tcb.set_state(ThreadState::Runnable)?;
        }
        tcb.set_state(ThreadState::Running)?;
    }
}

/// ZOMBIE -> UNUSED and unlink from the parent. Returns the exit status.
fn reap(table: &mut TableInner, parent: Pid, child: Pid) -> KernelResult<i32> {
    let status = table.get(child)?.exit_status;
    table.release(child)?;
    table.get_mut(parent)?.children.retain(|&c| c != child);
    Ok(status)
}

/// Terminate `pid` with `status`. Called once the user body is gone.
pub fn retire(kernel: &Kernel, pid: Pid, status: i32) {
    let mut table = kernel.table().lock();
    if let Err(e) = exit_locked(kernel, &mut table, pid, status) {
        log::error!("exit: pid {}: {}", pid, e);
    }
}

fn exit_locked(kernel: &Kernel, table: &mut TableInner, pid: Pid, status: i32) -> KernelResult<()> {
    let (parent, children) = {
        let tcb = table.get_mut(pid)?;
        tcb.exit_status = status;
        tcb.set_state(ThreadState::Zombie)?;
        (tcb.parent, mem::take(&mut tcb.children))
    };
    kernel.counters().record_exit();
    log::info!("Process {} exiting with code {}", pid, status);

    for child in children {
        let Ok(tcb) = table.get_mut(child) else { continue };
        tcb.parent = None;
        if tcb.state() == ThreadState::Zombie {
            table.release(child)?;
            kernel.counters().record_orphan_reaped();
            log::debug!("exit: reaped zombie orphan {}", child);
        } else {
            tcb.flags.insert(TcbFlags::ORPHAN);
            log::debug!("exit: {} orphaned", child);
        }
    }

    match parent.and_then(|ppid| table.index_of(ppid).map(|idx| (ppid, idx))) {
        Some((ppid, idx)) => {
            let woken = kernel.table().child_exit(idx).notify_all(kernel.scheduler());
            if woken > 0 {
                let tcb = table.get_mut(ppid)?;
                if tcb.state() == ThreadState::Sleeping {
                    tcb.set_state(ThreadState::Runnable)?;
                }
            }
        }
        None => {
            let flags = table.get(pid)?.flags;
            debug_assert!(flags.intersects(TcbFlags::INIT | TcbFlags::ORPHAN));
            table.release(pid)?;
            if flags.contains(TcbFlags::INIT) {
                log::debug!("exit: init process {} reclaimed", pid);
            } else {
                kernel.counters().record_orphan_reaped();
                log::debug!("exit: orphan {} reclaimed", pid);
            }
        }
    }
    Ok(())
}

/// Put `pid` to sleep for `ticks` timer ticks.
pub fn sleep(kernel: &Kernel, pid: Pid, ticks: u64) -> KernelResult<()> {
    kernel
        .table()
        .lock()
        .get_mut(pid)?
        .set_state(ThreadState::Sleeping)?;

    kernel.scheduler().sleep(ticks);

    let mut table = kernel.table().lock();
    let tcb = table.get_mut(pid)?;
    tcb.set_state(ThreadState::Runnable)?;
    tcb.set_state(ThreadState::Running)
}
