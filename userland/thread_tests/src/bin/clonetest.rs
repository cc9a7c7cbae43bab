//! Walks through an example of clone(). Prints results to stdout.

use exo_thread_core::memory::Global;
use exo_thread_core::syscall::{sys_clone, sys_getpid, sys_join, sys_sbrk, sys_sleep};
use exo_thread_core::{Context, VirtAddr, PGSIZE};
use exo_thread_tests::{or_exit, run, Report};

/// Must be visible to, and modifiable by, the child
static SHARED_VAL: Global = Global::new(0);
/// Handed to the child by address
static TEST_VAL: Global = Global::new(1);

fn func(ctx: &Context, arg: VirtAddr) {
    let mem = ctx.memory();
    println!("Child: pid is {}", sys_getpid(ctx));

    let value = or_exit(ctx, mem.load(arg), "load arg");
    println!("Child: Dereferenced function arg to {}", value);
    or_exit(ctx, mem.store(arg, value + 10), "store arg");
    println!("Child: Incremented arg's value by 10. arg is now {}", value + 10);

    let shared = or_exit(ctx, mem.load_global(SHARED_VAL), "load sharedVal") + 10;
    or_exit(ctx, mem.store_global(SHARED_VAL, shared), "store sharedVal");
    println!("Child: Incremented sharedVal by 10. sharedVal is now {}", shared);

    ctx.exit()
}

fn main() {
    let status = run("clonetest", |ctx| {
        let mem = ctx.memory();
        let mut report = Report::new();
        or_exit(ctx, mem.store_global(SHARED_VAL, 20), "init sharedVal");

        let parent_pid = sys_getpid(ctx);
        println!("Parent: pid is {}", parent_pid);

        // Bottom of one fresh page
        let stack_bottom = sys_sbrk(ctx, PGSIZE as isize);
        report.check(stack_bottom != -1, "sbrk failed");

        let child_pid = sys_clone(ctx, func, TEST_VAL.addr(), VirtAddr::new(stack_bottom as usize));
        report.check(child_pid != -1, "clone failed");

        // Give the child time to run, then reap it so the checks below see
        // all of its writes.
        sys_sleep(ctx, 10);
        report.check(sys_join(ctx) == child_pid, "join() did not return the child's pid");

        println!("Parent: pid of cloned thread is {}", child_pid);
        report.check(child_pid > parent_pid, "Child pid should be greater than parent pid");

        let test_val = or_exit(ctx, mem.load_global(TEST_VAL), "load test_val");
        println!("Parent: test_val is now {}", test_val);
        report.check(test_val == 10, "test_val should have been incremented by 10");

        let shared = or_exit(ctx, mem.load_global(SHARED_VAL), "load sharedVal");
        println!("Parent: sharedVal is now {}", shared);
        report.check(shared == 30, "sharedVal should have been incremented to 30");

        ctx.exit_with(report.finish())
    });
    std::process::exit(status);
}
