//! Stack - caller-provided thread stacks
//!
//! clone() never allocates stack memory: the caller grows its heap by one
//! page and hands the page over. The kernel only validates it and pushes the
//! initial frame.

use crate::error::{KernelError, KernelResult};
use crate::memory::{AddressSpace, VirtAddr, PGSIZE, WORD_SIZE};

/// Size of a clone stack
pub const THREAD_STACK_SIZE: usize = PGSIZE;

/// Fake return address pushed below the argument; a thread body that
/// "returns" through it would fault.
pub const FAKE_RETURN_ADDR: u32 = 0xffff_ffff;

/// Thread stack, `[base, base + size)`, grows down from `top`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    /// Stack base (lowest address)
    base: VirtAddr,

    /// Stack size (bytes)
    size: usize,
}

impl StackRegion {
    pub const fn new(base: VirtAddr, size: usize) -> Self {
        Self { base, size }
    }

    /// Get stack base address
    pub fn base(&self) -> VirtAddr {
        self.base
    }

    /// Get stack top address (initial stack pointer before the frame)
    pub fn top(&self) -> VirtAddr {
        self.base.add(self.size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlaps(&self, other: &StackRegion) -> bool {
        self.base < other.top() && other.base < self.top()
    }

    /// Check the region is usable as a thread stack in `space`.
    pub fn validate(&self, space: &AddressSpace) -> KernelResult<()> {
        let addr = self.base.value();
        if !self.base.is_page_aligned() {
            return Err(KernelError::InvalidStack { addr, reason: "not page aligned" });
        }
        if self.size < THREAD_STACK_SIZE {
            return Err(KernelError::InvalidStack { addr, reason: "smaller than one page" });
        }
        if !space.in_heap(self.base, self.size) {
            return Err(KernelError::InvalidStack { addr, reason: "not mapped in the heap" });
        }
        Ok(())
    }

    /// Push the initial frame: `[top - 4] = arg`, `[top - 8] = fake return`.
    ///
    /// Returns the initial stack pointer.
    pub fn push_initial_frame(
        &self,
        space: &AddressSpace,
        arg: VirtAddr,
    ) -> KernelResult<VirtAddr> {
        let arg = u32::try_from(arg.value())
            .map_err(|_| KernelError::BadAddress { addr: arg.value() })?;
        let sp = self.top().sub(2 * WORD_SIZE);
        space.store(sp.add(WORD_SIZE), arg)?;
        space.store(sp, FAKE_RETURN_ADDR)?;
        Ok(sp)
    }
}

/// Read the argument back from a frame built by [`StackRegion::push_initial_frame`].
pub fn frame_arg(space: &AddressSpace, sp: VirtAddr) -> KernelResult<VirtAddr> {
    Ok(VirtAddr::new(space.load(sp.add(WORD_SIZE))? as usize))
}
