//! Runs several tests of the ticketlock.

use exo_thread_core::memory::Global;
use exo_thread_core::syscall::{
    acquire_t, initlock_t, release_t, sys_clone, sys_getpid, sys_join, sys_sbrk, sys_sleep,
};
use exo_thread_core::{Context, TicketLock, VirtAddr, PGSIZE};
use exo_thread_tests::{or_exit, run, Report};

static SHARED_VAL: Global = Global::new(0);
const NUM_ADDITIONS: u32 = 200;
static LOCK: TicketLock = TicketLock::new();

/// Unlocked read-modify-write; only correct under LOCK
fn increment(ctx: &Context) {
    let mem = ctx.memory();
    let value = or_exit(ctx, mem.load_global(SHARED_VAL), "load sharedVal");
    or_exit(ctx, mem.store_global(SHARED_VAL, value + 1), "store sharedVal");
}

/// `sleep_ticks` is a tick count smuggled through the argument
fn child_func(ctx: &Context, sleep_ticks: VirtAddr) {
    let pid = sys_getpid(ctx);
    sys_sleep(ctx, sleep_ticks.value() as isize);

    for i in 0..NUM_ADDITIONS {
        println!("({}) i is {}", pid, i);
        acquire_t(&LOCK);
        increment(ctx);
        release_t(&LOCK);
    }
    println!("({}) Finished", pid);
    ctx.exit()
}

fn spawn(ctx: &Context, sleep_ticks: usize) -> isize {
    let stack = sys_sbrk(ctx, PGSIZE as isize);
    if stack == -1 {
        return -1;
    }
    sys_clone(ctx, child_func, VirtAddr::new(sleep_ticks), VirtAddr::new(stack as usize))
}

fn test_single_process(ctx: &Context) {
    initlock_t(&LOCK);
    for _ in 0..NUM_ADDITIONS {
        acquire_t(&LOCK);
        increment(ctx);
        release_t(&LOCK);
    }
    let value = or_exit(ctx, ctx.memory().load_global(SHARED_VAL), "load sharedVal");
    println!("sharedVal is now {}", value);
}

fn test_cloned_process(ctx: &Context, report: &mut Report) {
    initlock_t(&LOCK);
    report.check(spawn(ctx, 0) != -1, "clone failed");
    report.check(sys_join(ctx) != -1, "join failed");
}

fn test_two_cloned_processes(ctx: &Context, report: &mut Report) {
    initlock_t(&LOCK);
    report.check(spawn(ctx, 10) != -1, "clone failed");
    report.check(spawn(ctx, 0) != -1, "clone failed");
    report.check(sys_join(ctx) != -1, "join failed");
    report.check(sys_join(ctx) != -1, "join failed");
}

fn main() {
    let status = run("locktest", |ctx| {
        let mut report = Report::new();

        println!("Testing single process");
        test_single_process(ctx);
        println!("Testing cloned process");
        test_cloned_process(ctx, &mut report);
        println!("Testing two cloned processes");
        test_two_cloned_processes(ctx, &mut report);

        let value = or_exit(ctx, ctx.memory().load_global(SHARED_VAL), "load sharedVal");
        println!("Parent: sharedVal is now {}", value);
        report.check(value == 4 * NUM_ADDITIONS, "sharedVal should be 800");

        ctx.exit_with(report.finish())
    });
    std::process::exit(status);
}
