//! Exercises join(): with no threads, then after one clone().

use exo_thread_core::syscall::{sys_clone, sys_join, sys_sbrk};
use exo_thread_core::{Context, VirtAddr, PGSIZE};
use exo_thread_tests::{run, Report};

fn func(ctx: &Context, _arg: VirtAddr) {
    ctx.exit()
}

fn main() {
    let status = run("jointest", |ctx| {
        let mut report = Report::new();

        // No threads yet
        report.check(
            sys_join(ctx) == -1,
            "join() result should be -1 if this process has no threads",
        );

        let stack_bottom = sys_sbrk(ctx, PGSIZE as isize);
        report.check(stack_bottom != -1, "sbrk failed");
        let child_pid = sys_clone(ctx, func, VirtAddr::NULL, VirtAddr::new(stack_bottom as usize));
        report.check(child_pid != -1, "clone failed");

        let freed_pid = sys_join(ctx);
        report.check(freed_pid == child_pid, "join() did not return the child's pid");

        ctx.exit_with(report.finish())
    });
    std::process::exit(status);
}
