//! Shared helpers of the thread test programs
//!
//! Each program boots the global kernel, runs its `main` as an init process
//! and turns the exit status into the host process exit code.

use exo_thread_core::{syscall, Context, KernelConfig, KernelResult};

/// Counts failed checks and prints them like the original programs.
#[derive(Debug, Default)]
pub struct Report {
    errors: usize,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            println!("Error: {}", message);
            self.errors += 1;
        }
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Print the trailer and return the exit status
    pub fn finish(self) -> i32 {
        println!("Test finished");
        if self.errors == 0 {
            0
        } else {
            1
        }
    }
}

/// Unwrap a syscall result or terminate the calling thread with status 1.
pub fn or_exit<T>(ctx: &Context, result: KernelResult<T>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            println!("Error: {} failed: {}", what, e);
            ctx.exit_with(1)
        }
    }
}

/// Boot the kernel from the environment and run `main` as pid 1.
///
/// Returns the exit status of `main`.
pub fn run<F>(name: &str, main: F) -> i32
where
    F: FnOnce(&Context),
{
    let kernel = match syscall::init(KernelConfig::from_env()) {
        Ok(kernel) => kernel,
        Err(e) => {
            eprintln!("{}: cannot boot kernel: {}", name, e);
            return 1;
        }
    };
    match kernel.exec(name, main) {
        Ok(record) => {
            log::info!(
                "{}: pid {} exited with {} ({})",
                name,
                record.pid,
                record.status,
                kernel.stats()
            );
            record.status
        }
        Err(e) => {
            eprintln!("{}: exec failed: {}", name, e);
            1
        }
    }
}
