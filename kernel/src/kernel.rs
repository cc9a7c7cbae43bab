//! Kernel facade
//!
//! Owns the process table and the scheduler collaborator, runs init
//! programs, and hands every user thread a [`Context`] through which it
//! makes its system calls.

use crate::config::KernelConfig;
use crate::error::KernelResult;
use crate::memory::{AddressSpace, VirtAddr};
use crate::process::tcb::{ProcessInfo, TcbFlags, ThreadEntry};
use crate::process::{clone, join, Pid, ProcessTable};
use crate::scheduler::thread::ThreadState;
use crate::scheduler::Scheduler;
use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters
#[derive(Debug, Default)]
pub struct KernelStats {
    clones: AtomicU64,
    clone_failures: AtomicU64,
    joins: AtomicU64,
    exits: AtomicU64,
    orphans_reaped: AtomicU64,
}

impl KernelStats {
    pub(crate) fn record_clone(&self) {
        self.clones.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_clone_failure(&self) {
        self.clone_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exit(&self) {
        self.exits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_orphan_reaped(&self) {
        self.orphans_reaped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            clones: self.clones.load(Ordering::Relaxed),
            clone_failures: self.clone_failures.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            exits: self.exits.load(Ordering::Relaxed),
            orphans_reaped: self.orphans_reaped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub clones: u64,
    pub clone_failures: u64,
    pub joins: u64,
    pub exits: u64,
    pub orphans_reaped: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clones={} (failed {}) joins={} exits={} orphans_reaped={}",
            self.clones, self.clone_failures, self.joins, self.exits, self.orphans_reaped
        )
    }
}

/// How an init program ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRecord {
    pub pid: Pid,
    pub status: i32,
}

pub struct Kernel {
    config: KernelConfig,
    table: ProcessTable,
    scheduler: Box<dyn Scheduler>,
    stats: KernelStats,
}

impl Kernel {
    pub fn new(config: KernelConfig, scheduler: Box<dyn Scheduler>) -> KernelResult<Arc<Self>> {
        config.validate()?;
        log::info!(
            "kernel: {} TCB slots, heap limit {} pages, tick {:?}",
            config.max_processes,
            config.max_heap_pages,
            config.tick
        );
        Ok(Arc::new(Self {
            config,
            table: ProcessTable::new(config.max_processes),
            scheduler,
            stats: KernelStats::default(),
        }))
    }

    /// Kernel backed by the host scheduler (one host thread per TCB)
    #[cfg(feature = "std")]
    pub fn host(config: KernelConfig) -> KernelResult<Arc<Self>> {
        let scheduler = crate::scheduler::HostScheduler::new(config.tick);
        Self::new(config, Box::new(scheduler))
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        &*self.scheduler
    }

    pub(crate) fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub(crate) fn counters(&self) -> &KernelStats {
        &self.stats
    }

    /// Run `main` as a new init process on the calling thread.
    ///
    /// The process gets a fresh address space and no parent; it is reclaimed
    /// as soon as `main` returns or exits.
    pub fn exec<F>(self: &Arc<Self>, name: &str, main: F) -> KernelResult<ExitRecord>
    where
        F: FnOnce(&Context),
    {
        let space = Arc::new(AddressSpace::new(self.config.max_heap_pages));
        let pid = {
            let mut table = self.table.lock();
            let (idx, pid) = table.allocate()?;
            let tcb = table.slot_mut(idx);
            tcb.name = name.to_string();
            tcb.space = Some(Arc::clone(&space));
            tcb.flags = TcbFlags::INIT;
            tcb.set_state(ThreadState::Runnable)?;
            tcb.set_state(ThreadState::Running)?;
            pid
        };
        log::info!("exec: {} as pid {}", name, pid);

        self.scheduler.attach_current(pid);
        let ctx = Context::new(Arc::clone(self), pid, space);
        let mut main = Some(main);
        let status = self.scheduler.run_user(&mut || {
            if let Some(main) = main.take() {
                main(&ctx);
            }
        });
        join::retire(self, pid, status);
        self.scheduler.detach_current();

        Ok(ExitRecord { pid, status })
    }

    /// Live TCBs, by pid
    pub fn ps(&self) -> Vec<ProcessInfo> {
        self.table.snapshot()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of TCB slots in use
    pub fn live_processes(&self) -> usize {
        self.table.lock().live()
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("capacity", &self.table.capacity())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// System call handle of one user thread
///
/// Bound to the thread it was created for, hence neither `Send` nor `Sync`.
pub struct Context {
    kernel: Arc<Kernel>,
    pid: Pid,
    space: Arc<AddressSpace>,
    _not_send: PhantomData<*const ()>,
}

impl Context {
    pub(crate) fn new(kernel: Arc<Kernel>, pid: Pid, space: Arc<AddressSpace>) -> Self {
        Self { kernel, pid, space, _not_send: PhantomData }
    }

    pub fn getpid(&self) -> Pid {
        self.pid
    }

    /// Address space shared with every thread of the clone family
    pub fn memory(&self) -> &AddressSpace {
        &self.space
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    /// Start `entry(ctx, arg)` in a new thread on the page at `stack`.
    pub fn clone_thread(
        &self,
        entry: ThreadEntry,
        arg: VirtAddr,
        stack: VirtAddr,
    ) -> KernelResult<Pid> {
        clone::clone_thread(&self.kernel, self.pid, entry, arg, stack)
    }

    /// Wait for a child to exit and reap it
    pub fn join(&self) -> KernelResult<Pid> {
        self.join_status().map(|(pid, _)| pid)
    }

    /// Like [`Context::join`], also returning the child's exit status
    pub fn join_status(&self) -> KernelResult<(Pid, i32)> {
        join::join(&self.kernel, self.pid)
    }

    pub fn exit(&self) -> ! {
        self.exit_with(0)
    }

    pub fn exit_with(&self, status: i32) -> ! {
        log::debug!("sys_exit: pid={} code={}", self.pid, status);
        self.kernel.scheduler().exit_current(status)
    }

    /// Grow the heap by `bytes`; returns the old break
    pub fn sbrk(&self, bytes: usize) -> KernelResult<VirtAddr> {
        self.space.sbrk(bytes)
    }

    pub fn sleep(&self, ticks: u64) -> KernelResult<()> {
        join::sleep(&self.kernel, self.pid, ticks)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("pid", &self.pid).finish()
    }
}
