//! Host scheduler
//!
//! Runs every TCB on its own host thread and lets the host OS do the
//! (preemptive) scheduling. Blocking uses park/unpark, whose wake-up token
//! covers the window between "registered as waiter" and "parked". exit()
//! unwinds the user body with a private payload caught in `run_user`.

use super::{Scheduler, Task, KILLED_STATUS};
use crate::error::{KernelError, KernelResult};
use crate::process::Pid;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::cell::Cell;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;
use spin::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, Thread};

thread_local! {
    static CURRENT: Cell<Option<Pid>> = const { Cell::new(None) };
}

/// Unwind payload of exit()
struct ThreadExit {
    status: i32,
}

type Registry = Arc<Mutex<BTreeMap<Pid, Thread>>>;

pub struct HostScheduler {
    /// Host thread of every running TCB, for unpark
    threads: Registry,
    tick: Duration,
    launched: AtomicU64,
}

impl HostScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            threads: Arc::new(Mutex::new(BTreeMap::new())),
            tick,
            launched: AtomicU64::new(0),
        }
    }

    /// Number of TCBs currently bound to a host thread
    pub fn live_threads(&self) -> usize {
        self.threads.lock().len()
    }

    /// Number of successful launches
    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }
}

fn bind(registry: &Registry, pid: Pid) {
    CURRENT.with(|c| c.set(Some(pid)));
    registry.lock().insert(pid, thread::current());
}

fn unbind(registry: &Registry) {
    if let Some(pid) = CURRENT.with(|c| c.take()) {
        registry.lock().remove(&pid);
    }
}

impl Scheduler for HostScheduler {
    fn launch(&self, pid: Pid, task: Task) -> KernelResult<()> {
        let registry = Arc::clone(&self.threads);
        thread::Builder::new()
            .name(format!("exo-pid{}", pid))
            .spawn(move || {
                // Registered before the body runs, so any unblock aimed at
                // this pid finds the host thread.
                bind(&registry, pid);
                task();
                unbind(&registry);
            })
            .map_err(|e| {
                log::warn!("host: cannot spawn thread for pid {}: {}", pid, e);
                KernelError::SpawnFailed { pid }
            })?;
        self.launched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn attach_current(&self, pid: Pid) {
        bind(&self.threads, pid);
    }

    fn detach_current(&self) {
        unbind(&self.threads);
    }

    fn block_current(&self) {
        thread::park();
    }

    fn unblock(&self, pid: Pid) {
        match self.threads.lock().get(&pid) {
            Some(t) => t.unpark(),
            None => log::warn!("host: unblock of unknown pid {}", pid),
        }
    }

    fn sleep(&self, ticks: u64) {
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        thread::sleep(self.tick.saturating_mul(ticks));
    }

    fn run_user(&self, body: &mut dyn FnMut()) -> i32 {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(()) => 0,
            Err(payload) => match payload.downcast::<ThreadExit>() {
                Ok(exit) => exit.status,
                Err(_) => KILLED_STATUS,
            },
        }
    }

    fn exit_current(&self, status: i32) -> ! {
        panic::resume_unwind(Box::new(ThreadExit { status }))
    }
}
