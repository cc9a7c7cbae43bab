//! User virtual addresses

use core::fmt;

/// Page size
pub const PGSIZE: usize = 4096;

/// Size of one user word (`int` in user programs)
pub const WORD_SIZE: usize = 4;

/// User virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtAddr(usize);

impl VirtAddr {
    pub const NULL: Self = Self(0);

    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub const fn value(self) -> usize {
        self.0
    }

    pub const fn add(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }

    pub const fn sub(self, offset: usize) -> Self {
        Self(self.0 - offset)
    }

    pub const fn is_page_aligned(self) -> bool {
        self.0 % PGSIZE == 0
    }

    pub const fn is_word_aligned(self) -> bool {
        self.0 % WORD_SIZE == 0
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Round a byte count up to whole pages
pub const fn page_round_up(bytes: usize) -> usize {
    (bytes + PGSIZE - 1) & !(PGSIZE - 1)
}
