//! Non-blocking logging for the serial shell.
//!
//! # Architecture
//!
//! ```text
//! UART ISR / runner task     LogStream            log drain task
//! ──────────────────────     ─────────            ──────────────
//!
//! rt_warn!() ─────────────▶ [L0][L1][L2] ──────▶ log UART TX
//! never blocks               lock-free           blocking ok
//! ```
//!
//! # Rules
//!
//! - The interrupt path only ever uses the `rt_*!` macros
//! - Nothing here writes to the shell transport; the shell UART carries
//!   protocol bytes only
//! - Log messages may be dropped if the ring is full

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 64;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LogEntry {
    /// Timestamp in microseconds.
    pub timestamp_us: i64,
    /// Log level.
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        timestamp_us: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message as text; invalid UTF-8 yields a placeholder.
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One ring slot. `seq` is the claim number plus one once the entry is
/// written, so the drain never reads a slot a producer is still filling.
struct LogSlot {
    seq: AtomicU32,
    entry: UnsafeCell<LogEntry>,
}

impl LogSlot {
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY: Self = Self {
        seq: AtomicU32::new(0),
        entry: UnsafeCell::new(LogEntry::EMPTY),
    };
}

/// Lock-free log ring: many producers, one drain.
///
/// Producers are the UART interrupt and the runner task. A producer claims
/// a slot by advancing `write_idx` with compare-and-swap, fills it, then
/// publishes it through the slot's `seq`.
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [LogSlot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: a slot's entry is written only by the producer whose CAS claimed
// it and read only by the drain after `seq` publishes it.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "log ring size must be a power of two");

        Self {
            slots: [LogSlot::EMPTY; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue an entry. Never blocks; returns `false` if the ring is full
    /// and the entry was dropped.
    pub fn push(&self, timestamp_us: i64, level: LogLevel, msg: &[u8]) -> bool {
        let claimed = loop {
            let write = self.write_idx.load(Ordering::Acquire);
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            if self
                .write_idx
                .compare_exchange_weak(write, write.wrapping_add(1), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break write;
            }
        };

        let slot = &self.slots[claimed as usize & Self::MASK];
        let len = msg.len().min(MAX_MSG_LEN);
        // SAFETY: the CAS above made this producer the slot's only writer,
        // and the drain ignores it until `seq` is stored below
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.timestamp_us = timestamp_us;
            entry.level = level;
            entry.len = len as u8;
            entry.msg[..len].copy_from_slice(&msg[..len]);
        }
        slot.seq.store(claimed.wrapping_add(1), Ordering::Release);
        true
    }

    /// Format and push in one step.
    #[inline]
    pub fn push_fmt(&self, level: LogLevel, args: core::fmt::Arguments<'_>) -> bool {
        let mut buf = [0u8; MAX_MSG_LEN];
        let len = format_to_buffer(&mut buf, args);
        self.push(timestamp_us(), level, &buf[..len])
    }

    /// Oldest published entry (drain side only).
    ///
    /// `None` when the ring is empty or the oldest claim is still being
    /// written.
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let slot = &self.slots[read as usize & Self::MASK];
        if slot.seq.load(Ordering::Acquire) != read.wrapping_add(1) {
            return None;
        }

        // SAFETY: published by its producer, and producers cannot reclaim
        // the slot before read_idx moves past it
        let entry = unsafe { *slot.entry.get() };
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Entries dropped since the last reset.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Claimed entries not yet drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Microseconds since boot.
#[cfg(target_os = "espidf")]
#[inline]
pub fn timestamp_us() -> i64 {
    // SAFETY: esp_timer_get_time is ISR-safe and always callable
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}

/// Host builds have no timer; a counter keeps entries ordered.
#[cfg(not(target_os = "espidf"))]
#[inline]
pub fn timestamp_us() -> i64 {
    static TICKS: AtomicU32 = AtomicU32::new(0);
    TICKS.fetch_add(1, Ordering::Relaxed) as i64
}

/// Fixed buffer implementing `fmt::Write`, truncating on overflow.
pub struct BufWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BufWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }
}

impl<'a> core::fmt::Write for BufWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}

/// Format a message into a buffer.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = core::fmt::write(&mut writer, args);
    writer.len()
}

/// Non-blocking log macro.
///
/// # Example
///
/// ```ignore
/// rt_log!(LogLevel::Warn, ISR_LOG_STREAM, "pool exhausted, {} bytes dropped", n);
/// ```
#[macro_export]
macro_rules! rt_log {
    ($level:expr, $stream:expr, $($arg:tt)*) => {{
        $stream.push_fmt($level, format_args!($($arg)*));
    }};
}

/// Info log.
#[macro_export]
macro_rules! rt_info {
    ($stream:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Info, $stream, $($arg)*)
    };
}

/// Warning log.
#[macro_export]
macro_rules! rt_warn {
    ($stream:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Warn, $stream, $($arg)*)
    };
}

/// Error log.
#[macro_export]
macro_rules! rt_error {
    ($stream:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Error, $stream, $($arg)*)
    };
}

/// Debug log.
#[macro_export]
macro_rules! rt_debug {
    ($stream:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Debug, $stream, $($arg)*)
    };
}

/// Trace log (maximum verbosity).
#[macro_export]
macro_rules! rt_trace {
    ($stream:expr, $($arg:tt)*) => {
        $crate::rt_log!($crate::logging::LogLevel::Trace, $stream, $($arg)*)
    };
}
