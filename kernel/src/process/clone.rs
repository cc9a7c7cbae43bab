//! clone - lightweight threads sharing the caller's address space
//!
//! The caller supplies a one-page stack (usually fresh from sbrk). The child
//! gets a new TCB and pid, the caller's `Arc<AddressSpace>`, and an initial
//! frame on that stack: the argument at `top - 4` and a fake return address
//! at `top - 8`. Everything up to handing the thread to the scheduler is done
//! under the table lock.

use super::tcb::{TcbFlags, ThreadContext, ThreadEntry};
use super::{join, Pid};
use crate::error::{KernelError, KernelResult};
use crate::kernel::{Context, Kernel};
use crate::memory::VirtAddr;
use crate::scheduler::thread::{frame_arg, StackRegion, ThreadState, THREAD_STACK_SIZE};
use crate::scheduler::KILLED_STATUS;
use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;

/// Create a thread running `entry(ctx, arg)` on the page at `stack`.
///
/// Returns the child's pid, always greater than every pid issued before.
pub fn clone_thread(
    kernel: &Arc<Kernel>,
    parent: Pid,
    entry: ThreadEntry,
    arg: VirtAddr,
    stack: VirtAddr,
) -> KernelResult<Pid> {
    let result = spawn(kernel, parent, entry, arg, stack);
    match result {
        Ok(child) => {
            kernel.counters().record_clone();
            log::info!("Clone: parent={} -> child={} (stack {:#x})", parent, child, stack);
        }
        Err(e) => {
            kernel.counters().record_clone_failure();
            log::warn!("clone: parent={} failed: {} ({})", parent, e, e.recovery_hint());
        }
    }
    result
}

fn spawn(
    kernel: &Arc<Kernel>,
    parent: Pid,
    entry: ThreadEntry,
    arg: VirtAddr,
    stack: VirtAddr,
) -> KernelResult<Pid> {
    let region = StackRegion::new(stack, THREAD_STACK_SIZE);
    let mut table = kernel.table().lock();

    let (space, parent_name) = {
        let tcb = table.get(parent)?;
        let space = tcb
            .space
            .clone()
            .ok_or(KernelError::ProcessNotFound { pid: parent })?;
        (space, tcb.name.clone())
    };
    region.validate(&space)?;
    if let Some(owner) = table.stack_owner(&space, &region) {
        return Err(KernelError::StackOverlap { addr: stack.value(), owner });
    }

    let (idx, child) = table.allocate()?;
    let sp = match region.push_initial_frame(&space, arg) {
        Ok(sp) => sp,
        Err(e) => {
            table.release(child)?;
            return Err(e);
        }
    };

    let tcb = table.slot_mut(idx);
    tcb.name = format!("{}.t{}", parent_name, child);
    tcb.space = Some(space);
    tcb.parent = Some(parent);
    tcb.flags = TcbFlags::THREAD;
    tcb.stack = Some(region);
    tcb.context = ThreadContext { sp, ip: entry as usize };
    tcb.entry = Some(entry);

    // Launched while still EMBRYO: the new thread needs the table lock
    // before it can look at its TCB.
    let task_kernel = Arc::clone(kernel);
    if let Err(e) = kernel
        .scheduler()
        .launch(child, Box::new(move || thread_start(task_kernel, child)))
    {
        table.release(child)?;
        return Err(e);
    }

    table.slot_mut(idx).set_state(ThreadState::Runnable)?;
    table.get_mut(parent)?.children.push(child);
    Ok(child)
}

/// First code run by a cloned thread
fn thread_start(kernel: Arc<Kernel>, pid: Pid) {
    let start = {
        let mut table = kernel.table().lock();
        table.get_mut(pid).and_then(|tcb| {
            tcb.set_state(ThreadState::Running)?;
            match (tcb.entry, tcb.space.clone()) {
                (Some(entry), Some(space)) => Ok((entry, space, tcb.context.sp)),
                _ => Err(KernelError::ProcessNotFound { pid }),
            }
        })
    };
    let (entry, space, sp) = match start {
        Ok(start) => start,
        Err(e) => {
            log::error!("thread {}: cannot start: {}", pid, e);
            return;
        }
    };

    let status = match frame_arg(&space, sp) {
        Ok(arg) => {
            let ctx = Context::new(Arc::clone(&kernel), pid, space);
            kernel.scheduler().run_user(&mut || entry(&ctx, arg))
        }
        Err(e) => {
            log::warn!("thread {}: bad initial frame: {}", pid, e);
            KILLED_STATUS
        }
    };
    join::retire(&kernel, pid, status);
}
