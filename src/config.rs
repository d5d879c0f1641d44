//! Module: config
//!
//! Purpose: Sizes and tunables for the serial shell.
//!
//! Architecture:
//! - Anything that shapes static memory is a compile-time constant
//! - Behavioural knobs live in `CONFIG`, atomically accessible (lock-free)
//!
//! Safety: ISR-safe. All access via atomics, no locks.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Bytes one line buffer holds.
pub const MAX_LINE: usize = 80;

/// Maximum number of line buffers the pool may have live at once.
pub const POOL_SLOTS: usize = 8;

/// 8.3 file name plus terminator.
pub const MAX_FILENAME_SIZE: usize = 13;

/// Destination of Intel HEX uploads.
pub const IHEX_TEMP_FILE: &str = "temp.dat";

/// Autorun configuration file.
pub const BOOT_CFG_FILE: &str = "boot.cfg";

/// Build stamp written in front of the file name in `boot.cfg`.
pub const BUILD_TIMESTAMP: &str = concat!(env!("BUILD_TIMESTAMP"), "\n");

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Greeting sent once the host opens the port.
pub const BANNER: &str = concat!("Zephyr.js DEV MODE ", env!("VERSION_STRING"), "\r\n");

/// Default idle time before the runner captures a partial line.
pub const DEFAULT_IDLE_TIMEOUT_MS: u32 = 5_000;

/// Default bound on the transmit busy-wait (spin iterations per FIFO fill).
pub const DEFAULT_TX_SPIN_LIMIT: u32 = 1_000_000;

/// Runtime tunables.
///
/// Read with `Relaxed` ordering: a stale value for one interrupt is harmless.
pub struct ShellConfig {
    /// The ISR flushes eagerly while live buffers are at or below this count.
    flush_live_threshold: AtomicU32,
    idle_timeout_ms: AtomicU32,
    tx_spin_limit: AtomicU32,
    /// Echo setting a fresh shell starts with.
    echo: AtomicBool,
}

impl ShellConfig {
    pub const fn new() -> Self {
        Self {
            flush_live_threshold: AtomicU32::new(1),
            idle_timeout_ms: AtomicU32::new(DEFAULT_IDLE_TIMEOUT_MS),
            tx_spin_limit: AtomicU32::new(DEFAULT_TX_SPIN_LIMIT),
            echo: AtomicBool::new(true),
        }
    }

    #[inline]
    pub fn flush_live_threshold(&self) -> u32 {
        self.flush_live_threshold.load(Ordering::Relaxed)
    }

    pub fn set_flush_live_threshold(&self, live: u32) {
        self.flush_live_threshold.store(live, Ordering::Relaxed);
    }

    #[inline]
    pub fn idle_timeout_ms(&self) -> u32 {
        self.idle_timeout_ms.load(Ordering::Relaxed)
    }

    pub fn set_idle_timeout_ms(&self, ms: u32) {
        self.idle_timeout_ms.store(ms, Ordering::Relaxed);
    }

    #[inline]
    pub fn tx_spin_limit(&self) -> u32 {
        self.tx_spin_limit.load(Ordering::Relaxed)
    }

    pub fn set_tx_spin_limit(&self, spins: u32) {
        self.tx_spin_limit.store(spins.max(1), Ordering::Relaxed);
    }

    #[inline]
    pub fn echo(&self) -> bool {
        self.echo.load(Ordering::Relaxed)
    }

    pub fn set_echo(&self, on: bool) {
        self.echo.store(on, Ordering::Relaxed);
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Global configuration.
pub static CONFIG: ShellConfig = ShellConfig::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ShellConfig::new();
        assert_eq!(cfg.flush_live_threshold(), 1);
        assert_eq!(cfg.idle_timeout_ms(), DEFAULT_IDLE_TIMEOUT_MS);
        assert!(cfg.echo());
    }

    #[test]
    fn test_spin_limit_never_zero() {
        let cfg = ShellConfig::new();
        cfg.set_tx_spin_limit(0);
        assert_eq!(cfg.tx_spin_limit(), 1);
    }

    #[test]
    fn test_build_stamp_is_line_terminated() {
        assert!(BUILD_TIMESTAMP.ends_with('\n'));
        assert!(BANNER.starts_with("Zephyr.js DEV MODE "));
    }
}
