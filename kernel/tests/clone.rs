//! clone(): pids, shared memory, stack checks, termination

mod common;

use common::{
    add_ten, count_in, exit_now, kernel, kernel_with, stack, wait_flag, wait_until, word, CleanExit,
};
use exo_thread_core::memory::{Global, PGSIZE};
use exo_thread_core::syscall::{sys_clone, sys_getpid};
use exo_thread_core::{
    Context, KernelConfig, KernelError, Pid, ThreadState, VirtAddr, KILLED_STATUS,
};
use proptest::prelude::*;

#[test]
fn child_pid_greater_than_parent_and_every_previous_pid() {
    let kernel = kernel();
    kernel
        .exec("pids", |ctx| {
            let mut last = ctx.getpid();
            for _ in 0..5 {
                let child = ctx.clone_thread(exit_now, VirtAddr::NULL, stack(ctx)).unwrap();
                assert!(child > last);
                assert_eq!(ctx.join().unwrap(), child);
                last = child;
            }
        })
        .expect_clean();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // `true` clones a thread, `false` joins one; slots are reused as soon as
    // the table fills up.
    #[test]
    fn pids_increase_across_interleaved_joins(
        max in 2usize..5,
        plan in prop::collection::vec(any::<bool>(), 1..32),
    ) {
        let kernel = kernel_with(
            KernelConfig::default().with_max_processes(max).with_max_heap_pages(40),
        );
        let mut parent: Pid = 0;
        let mut issued: Vec<Pid> = Vec::new();
        kernel
            .exec("pidprop", |ctx| {
                parent = ctx.getpid();
                let mut live = 0;
                for &clone in &plan {
                    if clone && live < max - 1 {
                        let child = ctx.clone_thread(exit_now, VirtAddr::NULL, stack(ctx));
                        issued.push(child.unwrap());
                        live += 1;
                    } else if live > 0 {
                        ctx.join().unwrap();
                        live -= 1;
                    }
                }
                for _ in 0..live {
                    ctx.join().unwrap();
                }
                assert_eq!(ctx.join(), Err(KernelError::NoChildren { pid: parent }));
            })
            .expect_clean();

        let mut last = parent;
        for &pid in &issued {
            prop_assert!(pid > last, "pid {} issued after {}", pid, last);
            last = pid;
        }
        prop_assert!(kernel.ps().is_empty());
    }
}

#[test]
fn child_writes_are_visible_after_join() {
    static SHARED: Global = Global::new(0);

    fn child(ctx: &Context, arg: VirtAddr) {
        let mem = ctx.memory();
        let value = mem.load(arg).unwrap();
        mem.store(arg, value + 10).unwrap();
        let shared = mem.load_global(SHARED).unwrap();
        mem.store_global(SHARED, shared + 10).unwrap();
        ctx.exit()
    }

    let kernel = kernel();
    kernel
        .exec("visibility", |ctx| {
            let mem = ctx.memory();
            mem.store_global(SHARED, 20).unwrap();
            let test_val = word(ctx);

            let pid = ctx.clone_thread(child, test_val, stack(ctx)).unwrap();
            assert_eq!(ctx.join().unwrap(), pid);

            assert_eq!(mem.load(test_val).unwrap(), 10);
            assert_eq!(mem.load_global(SHARED).unwrap(), 30);
        })
        .expect_clean();
}

#[test]
fn clone_rejects_invalid_stacks() {
    let kernel = kernel();
    kernel
        .exec("stacks", |ctx| {
            let page = stack(ctx);

            let misaligned = ctx.clone_thread(exit_now, VirtAddr::NULL, page.add(4));
            assert!(matches!(
                misaligned,
                Err(KernelError::InvalidStack { reason: "not page aligned", .. })
            ));

            let unmapped = ctx.clone_thread(exit_now, VirtAddr::NULL, page.add(PGSIZE));
            assert!(matches!(unmapped, Err(KernelError::InvalidStack { .. })));

            let null = ctx.clone_thread(exit_now, VirtAddr::NULL, VirtAddr::NULL);
            assert!(matches!(null, Err(KernelError::InvalidStack { .. })));

            // Syscall form
            assert_eq!(sys_clone(ctx, exit_now, VirtAddr::NULL, page.add(4)), -1);
            assert_eq!(ctx.kernel().stats().clone_failures, 4);
            assert_eq!(ctx.kernel().live_processes(), 1);
        })
        .expect_clean();
}

#[test]
fn clone_rejects_stack_of_live_thread() {
    let kernel = kernel();
    kernel
        .exec("overlap", |ctx| {
            let flag = word(ctx);
            let page = stack(ctx);
            let owner = ctx.clone_thread(wait_flag, flag, page).unwrap();

            assert_eq!(
                ctx.clone_thread(exit_now, VirtAddr::NULL, page),
                Err(KernelError::StackOverlap { addr: page.value(), owner })
            );

            ctx.memory().store(flag, 1).unwrap();
            assert_eq!(ctx.join().unwrap(), owner);

            // Reaped: the page may be reused
            let next = ctx.clone_thread(exit_now, VirtAddr::NULL, page).unwrap();
            assert_eq!(ctx.join().unwrap(), next);
        })
        .expect_clean();
}

#[test]
fn full_table_fails_without_leaking_a_slot() {
    let kernel = kernel_with(KernelConfig::default().with_max_processes(3));
    kernel
        .exec("full", |ctx| {
            let flag = word(ctx);
            let a = ctx.clone_thread(wait_flag, flag, stack(ctx)).unwrap();
            let b = ctx.clone_thread(wait_flag, flag, stack(ctx)).unwrap();

            let spare = stack(ctx);
            assert_eq!(
                ctx.clone_thread(exit_now, VirtAddr::NULL, spare),
                Err(KernelError::ProcessTableFull { max: 3 })
            );
            assert_eq!(sys_clone(ctx, exit_now, VirtAddr::NULL, spare), -1);
            assert_eq!(ctx.kernel().live_processes(), 3);

            ctx.memory().store(flag, 1).unwrap();
            let mut reaped = [ctx.join().unwrap(), ctx.join().unwrap()];
            reaped.sort();
            assert_eq!(reaped, [a, b]);

            let c = ctx.clone_thread(exit_now, VirtAddr::NULL, spare).unwrap();
            assert!(c > b);
            assert_eq!(ctx.join().unwrap(), c);
        })
        .expect_clean();
}

#[test]
#[allow(unreachable_code)]
fn exit_never_returns_into_the_body() {
    fn child(ctx: &Context, arg: VirtAddr) {
        ctx.memory().store(arg, 1).unwrap();
        ctx.exit_with(5);
        ctx.memory().store(arg, 2).unwrap();
    }

    let kernel = kernel();
    kernel
        .exec("exit", |ctx| {
            let slot = word(ctx);
            let pid = ctx.clone_thread(child, slot, stack(ctx)).unwrap();
            assert_eq!(ctx.join_status().unwrap(), (pid, 5));
            assert_eq!(ctx.memory().load(slot).unwrap(), 1);
        })
        .expect_clean();
}

#[test]
fn returning_body_exits_with_zero_and_panic_with_killed_status() {
    fn returns(_ctx: &Context, _arg: VirtAddr) {}

    fn faults(ctx: &Context, _arg: VirtAddr) {
        // Null page is unmapped
        ctx.memory().load(VirtAddr::NULL).unwrap();
    }

    let kernel = kernel();
    kernel
        .exec("status", |ctx| {
            let ok = ctx.clone_thread(returns, VirtAddr::NULL, stack(ctx)).unwrap();
            assert_eq!(ctx.join_status().unwrap(), (ok, 0));

            let killed = ctx.clone_thread(faults, VirtAddr::NULL, stack(ctx)).unwrap();
            assert_eq!(ctx.join_status().unwrap(), (killed, KILLED_STATUS));
        })
        .expect_clean();
}

#[test]
fn argument_is_read_back_from_the_stack_frame() {
    fn check(ctx: &Context, arg: VirtAddr) {
        ctx.exit_with(arg.value() as i32)
    }

    let kernel = kernel();
    kernel
        .exec("frame", |ctx| {
            let page = stack(ctx);
            let pid = ctx.clone_thread(check, VirtAddr::new(0x1234), page).unwrap();
            assert_eq!(ctx.join_status().unwrap(), (pid, 0x1234));

            let mem = ctx.memory();
            let top = page.add(PGSIZE);
            assert_eq!(mem.load(top.sub(4)).unwrap(), 0x1234);
            assert_eq!(mem.load(top.sub(8)).unwrap(), 0xffff_ffff);
        })
        .expect_clean();
}

#[test]
fn concurrent_clones_get_distinct_increasing_pids() {
    const SPAWNERS: usize = 4;
    const LEAVES: usize = 2;

    /// Clones LEAVES threads and records their pids at `arg`
    fn spawner(ctx: &Context, arg: VirtAddr) {
        let mem = ctx.memory();
        for k in 0..LEAVES {
            let pid = ctx.clone_thread(exit_now, VirtAddr::NULL, stack(ctx)).unwrap();
            assert!(pid > ctx.getpid());
            mem.store(arg.add(4 * k), pid as u32).unwrap();
        }
        for _ in 0..LEAVES {
            ctx.join().unwrap();
        }
    }

    let kernel = kernel();
    kernel
        .exec("concurrent", |ctx| {
            let results = stack(ctx);
            let mut spawners = Vec::new();
            for i in 0..SPAWNERS {
                let slot = results.add(4 * LEAVES * i);
                spawners.push(ctx.clone_thread(spawner, slot, stack(ctx)).unwrap());
            }
            for _ in 0..SPAWNERS {
                assert_eq!(ctx.join_status().unwrap().1, 0);
            }

            let mem = ctx.memory();
            let mut leaves: Vec<u64> = (0..SPAWNERS * LEAVES)
                .map(|i| mem.load(results.add(4 * i)).unwrap() as u64)
                .collect();
            for (i, spawner) in spawners.iter().enumerate() {
                for leaf in &leaves[i * LEAVES..(i + 1) * LEAVES] {
                    assert!(leaf > spawner);
                }
            }
            leaves.sort();
            leaves.dedup();
            assert_eq!(leaves.len(), SPAWNERS * LEAVES);
            assert!(leaves[0] > spawners[0]);
        })
        .expect_clean();
}

#[test]
fn ps_lists_cloned_threads() {
    let kernel = kernel();
    kernel
        .exec("ps", |ctx| {
            let flag = word(ctx);
            let pid = ctx.clone_thread(wait_flag, flag, stack(ctx)).unwrap();

            let ps = ctx.kernel().ps();
            let child = ps.iter().find(|p| p.pid == pid).unwrap();
            assert!(child.is_thread());
            assert_eq!(child.parent, Some(sys_getpid(ctx) as u64));
            assert_eq!(child.name, format!("ps.t{}", pid));
            assert_eq!(ps.iter().find(|p| p.pid == ctx.getpid()).unwrap().children, 1);

            ctx.memory().store(flag, 1).unwrap();
            ctx.join().unwrap();
            assert_eq!(count_in(ctx, ThreadState::Zombie), 0);
        })
        .expect_clean();

    assert!(kernel.ps().is_empty());
    let stats = kernel.stats();
    assert_eq!(stats.clones, 1);
    assert_eq!(stats.joins, 1);
    assert_eq!(stats.exits, 2);
}

#[test]
fn sleeping_thread_is_reported_sleeping() {
    fn nap(ctx: &Context, _arg: VirtAddr) {
        ctx.sleep(200).unwrap();
    }

    let kernel = kernel();
    kernel
        .exec("sleep", |ctx| {
            let pid = ctx.clone_thread(nap, VirtAddr::NULL, stack(ctx)).unwrap();
            wait_until(ctx, || {
                ctx.kernel()
                    .ps()
                    .iter()
                    .any(|p| p.pid == pid && p.state == ThreadState::Sleeping)
            });
            assert_eq!(ctx.join().unwrap(), pid);
        })
        .expect_clean();
}
