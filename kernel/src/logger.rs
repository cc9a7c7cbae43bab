//! Simple logger implementation
//!
//! Backend for the `log` facade. Lines are formatted as `[LEVEL] message`.
//! Under `std` they go to stderr (the host stand-in for the serial port);
//! without `std` they go to the sink registered with [`set_sink`].

use log::{Level, LevelFilter, Metadata, Record};

/// Sink for `no_std` builds
pub type Sink = fn(core::fmt::Arguments<'_>);

static SINK: spin::Once<Sink> = spin::Once::new();

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level_str = match record.level() {
            Level::Error => "ERROR",
            Level::Warn  => "WARN ",
            Level::Info  => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        if let Some(sink) = SINK.get() {
            sink(format_args!("[{}] {}", level_str, record.args()));
            return;
        }
        #[cfg(feature = "std")]
        {
            std::eprintln!("[{}] {}", level_str, record.args());
        }
    }

    fn flush(&self) {}
}

/// Global logger instance
static LOGGER: SimpleLogger = SimpleLogger;

/// Route log lines to `sink` instead of the default output.
pub fn set_sink(sink: Sink) {
    SINK.call_once(|| sink);
}

/// Initialize the logger at `Info`.
///
/// Returns false if another logger was already installed.
pub fn init() -> bool {
    init_with_level(LevelFilter::Info)
}

/// Initialize with specific log level
pub fn init_with_level(level: LevelFilter) -> bool {
    match log::set_logger(&LOGGER) {
        Ok(()) => {
            log::set_max_level(level);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let first = init_with_level(LevelFilter::Warn);
        let second = init();
        // Some other test may have won the race, but never both.
        assert!(!(first && second));
        log::warn!("logger test line");
    }
}
