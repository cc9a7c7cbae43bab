//! Kernel configuration
//!
//! Tunables of the thread core. Defaults follow xv6 (NPROC = 64, 100 Hz tick).

use crate::error::{KernelError, KernelResult};
use core::time::Duration;
use log::LevelFilter;

/// Default number of TCB slots
pub const NPROC: usize = 64;

/// Default heap limit, in pages
pub const DEFAULT_HEAP_PAGES: usize = 256;

/// Default timer tick (10 ms)
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Number of TCB slots in the process table
    pub max_processes: usize,
    /// Maximum number of heap pages a single address space can sbrk
    pub max_heap_pages: usize,
    /// Length of one sleep tick
    pub tick: Duration,
    /// Level used by `logger::init`
    pub log_level: LevelFilter,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_processes: NPROC,
            max_heap_pages: DEFAULT_HEAP_PAGES,
            tick: DEFAULT_TICK,
            log_level: LevelFilter::Info,
        }
    }
}

impl KernelConfig {
    pub fn with_max_processes(mut self, max: usize) -> Self {
        self.max_processes = max;
        self
    }

    pub fn with_max_heap_pages(mut self, pages: usize) -> Self {
        self.max_heap_pages = pages;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.max_processes == 0 {
            return Err(KernelError::InvalidConfig { reason: "max_processes must be at least 1" });
        }
        if self.max_heap_pages == 0 {
            return Err(KernelError::InvalidConfig { reason: "max_heap_pages must be at least 1" });
        }
        Ok(())
    }

    /// Read overrides from `EXO_NPROC`, `EXO_HEAP_PAGES`, `EXO_TICK_MS` and `EXO_LOG`.
    ///
    /// Unparsable values are ignored with a warning.
    #[cfg(feature = "std")]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = env_parse::<usize>("EXO_NPROC") {
            config.max_processes = n;
        }
        if let Some(n) = env_parse::<usize>("EXO_HEAP_PAGES") {
            config.max_heap_pages = n;
        }
        if let Some(ms) = env_parse::<u64>("EXO_TICK_MS") {
            config.tick = Duration::from_millis(ms);
        }
        if let Some(level) = env_parse::<LevelFilter>("EXO_LOG") {
            config.log_level = level;
        }
        config
    }
}

#[cfg(feature = "std")]
fn env_parse<T: core::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("config: ignoring {}={:?}", key, raw);
            None
        }
    }
}
