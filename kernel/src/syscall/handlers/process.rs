//! Process Management System Call Handlers
//!
//! Handles clone, join, exit, getpid, sbrk and sleep. Every failure is
//! reported to the caller as `-1`.

use crate::error::KernelResult;
use crate::kernel::Context;
use crate::memory::VirtAddr;
use crate::process::ThreadEntry;

fn to_ret(result: KernelResult<isize>) -> isize {
    result.unwrap_or_else(|e| {
        if e.is_recoverable() {
            log::debug!("syscall failed: {}", e);
        } else {
            log::error!("syscall failed: {} ({})", e, e.recovery_hint());
        }
        e.errno()
    })
}

/// Create a thread sharing the caller's address space.
///
/// `stack` is the lowest address of a page the caller owns.
pub fn sys_clone(ctx: &Context, entry: ThreadEntry, arg: VirtAddr, stack: VirtAddr) -> isize {
    log::debug!("sys_clone: pid={} stack={:#x} arg={:#x}", ctx.getpid(), stack, arg);
    to_ret(ctx.clone_thread(entry, arg, stack).map(|pid| pid as isize))
}

/// Reap a child thread; `-1` if the caller has none
pub fn sys_join(ctx: &Context) -> isize {
    log::debug!("sys_join: pid={}", ctx.getpid());
    to_ret(ctx.join().map(|pid| pid as isize))
}

pub fn sys_exit(ctx: &Context, code: i32) -> ! {
    ctx.exit_with(code)
}

pub fn sys_getpid(ctx: &Context) -> isize {
    ctx.getpid() as isize
}

/// Grow the heap; returns the old break
pub fn sys_sbrk(ctx: &Context, n: isize) -> isize {
    let Ok(bytes) = usize::try_from(n) else {
        log::debug!("sys_sbrk: shrinking not supported (n={})", n);
        return -1;
    };
    to_ret(ctx.sbrk(bytes).map(|old| old.value() as isize))
}

pub fn sys_sleep(ctx: &Context, ticks: isize) -> isize {
    let Ok(ticks) = u64::try_from(ticks) else {
        return -1;
    };
    to_ret(ctx.sleep(ticks).map(|()| 0))
}
