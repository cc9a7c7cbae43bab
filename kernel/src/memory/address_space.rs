//! Address Space - user memory shared by a clone family
//!
//! xv6-style layout:
//!
//! ```text
//!   [0, PGSIZE)              unmapped (null page)
//!   [PGSIZE, 2 * PGSIZE)     data page, one word per `Global`
//!   [2 * PGSIZE, brk)        heap, grown by sbrk
//! ```
//!
//! Cloned threads hold the same `Arc<AddressSpace>` as their parent: one
//! arena, never a copy. Plain loads and stores are relaxed; ordering between
//! threads comes from join (table lock) or from a ticketlock.

use super::address::{page_round_up, VirtAddr, PGSIZE, WORD_SIZE};
use crate::error::{KernelError, KernelResult};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::RwLock;

/// Start of the data page
pub const DATA_BASE: usize = PGSIZE;

/// Start of the heap (first address returned by sbrk)
pub const HEAP_BASE: usize = 2 * PGSIZE;

/// Number of globals that fit in the data page
pub const DATA_WORDS: usize = PGSIZE / WORD_SIZE;

/// A statically linked global variable of a user program (one word in the
/// data page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Global(usize);

impl Global {
    pub const fn new(slot: usize) -> Self {
        assert!(slot < DATA_WORDS, "data page holds PGSIZE / 4 globals");
        Self(slot)
    }

    pub const fn addr(self) -> VirtAddr {
        VirtAddr::new(DATA_BASE + self.0 * WORD_SIZE)
    }
}

/// User memory of one process and all the threads it cloned
pub struct AddressSpace {
    /// Words covering `[0, brk)`
    words: RwLock<Vec<AtomicU32>>,
    max_heap_pages: usize,
}

impl AddressSpace {
    /// Create an address space with the null and data pages and an empty heap
    pub fn new(max_heap_pages: usize) -> Self {
        let mut words = Vec::with_capacity(HEAP_BASE / WORD_SIZE);
        words.resize_with(HEAP_BASE / WORD_SIZE, || AtomicU32::new(0));
        Self {
            words: RwLock::new(words),
            max_heap_pages,
        }
    }

    /// Current program break
    pub fn brk(&self) -> VirtAddr {
        VirtAddr::new(self.words.read().len() * WORD_SIZE)
    }

    /// Bytes of heap in use
    pub fn heap_size(&self) -> usize {
        self.brk().value() - HEAP_BASE
    }

    /// Grow the heap by `bytes` (rounded up to whole words) and return the old break.
    pub fn sbrk(&self, bytes: usize) -> KernelResult<VirtAddr> {
        let mut words = self.words.write();
        let old = words.len() * WORD_SIZE;
        let limit = HEAP_BASE + self.max_heap_pages * PGSIZE;
        let end = bytes
            .checked_add(WORD_SIZE - 1)
            .map(|b| b / WORD_SIZE * WORD_SIZE)
            .and_then(|grow| old.checked_add(grow))
            .filter(|&end| end <= limit)
            .ok_or(KernelError::OutOfMemory {
                requested: bytes,
                available: limit.saturating_sub(old),
            })?;
        words.resize_with(end / WORD_SIZE, || AtomicU32::new(0));
        log::trace!("sbrk: {:#x} -> {:#x}", old, end);
        Ok(VirtAddr::new(old))
    }

    /// Align the break up to a page, then grow it by `pages` pages.
    ///
    /// Returns the first page. Both steps happen under one lock, so
    /// concurrent callers never get overlapping pages.
    pub fn sbrk_pages(&self, pages: usize) -> KernelResult<VirtAddr> {
        let mut words = self.words.write();
        let old = words.len() * WORD_SIZE;
        let start = page_round_up(old);
        let limit = HEAP_BASE + self.max_heap_pages * PGSIZE;
        let end = pages
            .checked_mul(PGSIZE)
            .and_then(|bytes| start.checked_add(bytes))
            .filter(|&end| end <= limit)
            .ok_or(KernelError::OutOfMemory {
                requested: pages.saturating_mul(PGSIZE),
                available: limit.saturating_sub(start),
            })?;
        words.resize_with(end / WORD_SIZE, || AtomicU32::new(0));
        log::trace!("sbrk_pages: {:#x} -> {:#x}", old, end);
        Ok(VirtAddr::new(start))
    }

    /// Is `[start, start + len)` mapped user memory?
    pub fn is_mapped(&self, start: VirtAddr, len: usize) -> bool {
        let brk = self.brk().value();
        start.value() >= PGSIZE
            && start
                .value()
                .checked_add(len)
                .map_or(false, |end| end <= brk)
    }

    /// Is `[start, start + len)` inside the heap?
    pub fn in_heap(&self, start: VirtAddr, len: usize) -> bool {
        start.value() >= HEAP_BASE && self.is_mapped(start, len)
    }

    fn with_word<R>(&self, addr: VirtAddr, f: impl FnOnce(&AtomicU32) -> R) -> KernelResult<R> {
        if addr.value() < PGSIZE || !addr.is_word_aligned() {
            return Err(KernelError::BadAddress { addr: addr.value() });
        }
        let words = self.words.read();
        words
            .get(addr.value() / WORD_SIZE)
            .map(f)
            .ok_or(KernelError::BadAddress { addr: addr.value() })
    }

    pub fn load(&self, addr: VirtAddr) -> KernelResult<u32> {
        self.with_word(addr, |w| w.load(Ordering::Relaxed))
    }

    pub fn store(&self, addr: VirtAddr, value: u32) -> KernelResult<()> {
        self.with_word(addr, |w| w.store(value, Ordering::Relaxed))
    }

    /// Atomic fetch-and-add on a user word; returns the previous value.
    pub fn fetch_add(&self, addr: VirtAddr, value: u32) -> KernelResult<u32> {
        self.with_word(addr, |w| w.fetch_add(value, Ordering::AcqRel))
    }

    pub fn load_global(&self, global: Global) -> KernelResult<u32> {
        self.load(global.addr())
    }

    pub fn store_global(&self, global: Global, value: u32) -> KernelResult<()> {
        self.store(global.addr(), value)
    }
}

impl core::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("brk", &self.brk())
            .field("max_heap_pages", &self.max_heap_pages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sbrk_returns_old_break() {
        let space = AddressSpace::new(4);
        assert_eq!(space.brk(), VirtAddr::new(HEAP_BASE));

        let first = space.sbrk(PGSIZE).unwrap();
        assert_eq!(first, VirtAddr::new(HEAP_BASE));
        assert!(first.is_page_aligned());

        let second = space.sbrk(PGSIZE).unwrap();
        assert_eq!(second, VirtAddr::new(HEAP_BASE + PGSIZE));
        assert_eq!(space.heap_size(), 2 * PGSIZE);
        assert_eq!(space.sbrk(0).unwrap(), VirtAddr::new(HEAP_BASE + 2 * PGSIZE));
    }

    #[test]
    fn test_sbrk_limit() {
        let space = AddressSpace::new(1);
        space.sbrk(PGSIZE).unwrap();
        assert_eq!(
            space.sbrk(4),
            Err(KernelError::OutOfMemory { requested: 4, available: 0 })
        );
    }

    #[test]
    fn test_sbrk_huge_request_fails() {
        let space = AddressSpace::new(4);
        let brk = space.brk();
        assert_eq!(
            space.sbrk(usize::MAX),
            Err(KernelError::OutOfMemory {
                requested: usize::MAX,
                available: 4 * PGSIZE,
            })
        );
        assert!(space.sbrk(usize::MAX - 2).is_err());
        assert_eq!(space.brk(), brk);
        assert_eq!(space.sbrk(4), Ok(brk));
    }

    #[test]
    fn test_sbrk_pages_aligns_break() {
        let space = AddressSpace::new(3);
        space.sbrk(8).unwrap();
        let page = space.sbrk_pages(1).unwrap();
        assert_eq!(page, VirtAddr::new(HEAP_BASE + PGSIZE));
        assert_eq!(space.brk(), VirtAddr::new(HEAP_BASE + 2 * PGSIZE));
        assert!(space.sbrk_pages(2).is_err());
        assert_eq!(space.sbrk_pages(1).unwrap(), VirtAddr::new(HEAP_BASE + 2 * PGSIZE));
    }

    #[test]
    fn test_null_and_unmapped_access() {
        let space = AddressSpace::new(1);
        assert_eq!(space.load(VirtAddr::NULL), Err(KernelError::BadAddress { addr: 0 }));
        assert_eq!(
            space.store(VirtAddr::new(HEAP_BASE), 1),
            Err(KernelError::BadAddress { addr: HEAP_BASE })
        );
        assert_eq!(
            space.load(VirtAddr::new(DATA_BASE + 2)),
            Err(KernelError::BadAddress { addr: DATA_BASE + 2 })
        );
    }

    #[test]
    fn test_globals_live_in_data_page() {
        const SHARED_VAL: Global = Global::new(0);
        const OTHER: Global = Global::new(1);

        let space = AddressSpace::new(1);
        assert_eq!(SHARED_VAL.addr(), VirtAddr::new(DATA_BASE));
        space.store_global(SHARED_VAL, 20).unwrap();
        space.fetch_add(SHARED_VAL.addr(), 10).unwrap();
        assert_eq!(space.load_global(SHARED_VAL).unwrap(), 30);
        assert_eq!(space.load_global(OTHER).unwrap(), 0);
    }

    #[test]
    fn test_mapping_queries() {
        let space = AddressSpace::new(2);
        let page = space.sbrk(PGSIZE).unwrap();
        assert!(space.in_heap(page, PGSIZE));
        assert!(!space.in_heap(page, PGSIZE + 4));
        assert!(space.is_mapped(VirtAddr::new(DATA_BASE), 4));
        assert!(!space.in_heap(VirtAddr::new(DATA_BASE), 4));
        assert!(!space.is_mapped(VirtAddr::NULL, 4));
    }
}
