//! Helpers shared by the integration tests

#![allow(dead_code)]

use exo_thread_core::{
    Context, ExitRecord, Kernel, KernelConfig, KernelResult, ThreadState, VirtAddr,
};
use std::sync::Arc;
use std::time::Duration;

/// Host kernel with a 1 ms tick
pub fn kernel() -> Arc<Kernel> {
    kernel_with(KernelConfig::default())
}

pub fn kernel_with(config: KernelConfig) -> Arc<Kernel> {
    exo_thread_core::logger::init_with_level(log::LevelFilter::Debug);
    Kernel::host(config.with_tick(Duration::from_millis(1))).unwrap()
}

/// Result of `Kernel::exec`
pub trait CleanExit {
    /// Unwrap, failing unless the init body exited with 0. A failed assert
    /// inside the body only shows up as a killed status.
    fn expect_clean(self) -> ExitRecord;
}

impl CleanExit for KernelResult<ExitRecord> {
    #[track_caller]
    fn expect_clean(self) -> ExitRecord {
        let record = self.unwrap();
        assert_eq!(record.status, 0, "init pid {} exited with {}", record.pid, record.status);
        record
    }
}

/// One fresh page-aligned stack page
pub fn stack(ctx: &Context) -> VirtAddr {
    let page = ctx.memory().sbrk_pages(1).unwrap();
    assert!(page.is_page_aligned());
    page
}

/// One fresh zeroed word
pub fn word(ctx: &Context) -> VirtAddr {
    ctx.sbrk(4).unwrap()
}

/// Sleep until `pred` holds (gives up after ~5 s)
pub fn wait_until(ctx: &Context, mut pred: impl FnMut() -> bool) {
    for _ in 0..5000 {
        if pred() {
            return;
        }
        ctx.sleep(1).unwrap();
    }
    panic!("condition not reached");
}

/// Number of TCBs in `state`
pub fn count_in(ctx: &Context, state: ThreadState) -> usize {
    ctx.kernel().ps().iter().filter(|p| p.state == state).count()
}

/// Thread body: exit as soon as started
pub fn exit_now(ctx: &Context, _arg: VirtAddr) {
    ctx.exit()
}

/// Thread body: sleep until the word at `arg` becomes non-zero
pub fn wait_flag(ctx: &Context, arg: VirtAddr) {
    while ctx.memory().load(arg).unwrap() == 0 {
        ctx.sleep(1).unwrap();
    }
}

/// Thread body: add 10 to the word at `arg`
pub fn add_ten(ctx: &Context, arg: VirtAddr) {
    ctx.memory().fetch_add(arg, 10).unwrap();
    ctx.exit()
}
