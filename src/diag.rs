//! Transport diagnostics.
//!
//! Counters and a phase marker shared by the UART interrupt and the runner.
//! Nothing here drives control flow: the phase only tells a human (through
//! the `stat` command or a debugger) where the link last was.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::pool::PoolStats;

/// Where the link was last seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum UartPhase {
    /// Session (re)starting.
    Init = 0,
    /// TX-ready interrupt observed.
    TxReady = 1,
    /// Interrupt entered.
    IrqUpdate = 2,
    /// Transmitter waiting on the FIFO.
    FifoWait = 3,
    /// RX-ready interrupt observed.
    RxReady = 4,
    /// Copying the hardware FIFO into a line buffer.
    FifoRead = 5,
    /// FIFO copy done, flush decision pending.
    FifoReadEnd = 6,
    /// Buffer handed to the runner.
    FifoFlush = 7,
    /// Interrupt left.
    IsrEnd = 8,
    /// Runner took a partial buffer after the idle timeout.
    TaskCapture = 9,
    /// Runner waiting for data.
    Waiting = 10,
    /// Runner idle timeout expired.
    Timeout = 11,
    /// Active handler closing.
    Close = 12,
    /// Runner stopped.
    Terminated = 13,
}

impl UartPhase {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => UartPhase::TxReady,
            2 => UartPhase::IrqUpdate,
            3 => UartPhase::FifoWait,
            4 => UartPhase::RxReady,
            5 => UartPhase::FifoRead,
            6 => UartPhase::FifoReadEnd,
            7 => UartPhase::FifoFlush,
            8 => UartPhase::IsrEnd,
            9 => UartPhase::TaskCapture,
            10 => UartPhase::Waiting,
            11 => UartPhase::Timeout,
            12 => UartPhase::Close,
            13 => UartPhase::Terminated,
            _ => UartPhase::Init,
        }
    }
}

/// Link counters.
pub struct TransportStats {
    phase: AtomicU8,
    rx_bytes: AtomicU32,
    processed_bytes: AtomicU32,
    dropped_bytes: AtomicU32,
    flushes: AtomicU32,
    captures: AtomicU32,
    tx_stalls: AtomicU32,
    queue_depth: AtomicU32,
    max_queue_depth: AtomicU32,
}

impl TransportStats {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(UartPhase::Init as u8),
            rx_bytes: AtomicU32::new(0),
            processed_bytes: AtomicU32::new(0),
            dropped_bytes: AtomicU32::new(0),
            flushes: AtomicU32::new(0),
            captures: AtomicU32::new(0),
            tx_stalls: AtomicU32::new(0),
            queue_depth: AtomicU32::new(0),
            max_queue_depth: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn set_phase(&self, phase: UartPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn phase(&self) -> UartPhase {
        UartPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn add_rx(&self, n: usize) {
        self.rx_bytes.fetch_add(n as u32, Ordering::Relaxed);
    }

    #[inline]
    pub fn rx_bytes(&self) -> u32 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn add_processed(&self, n: usize) {
        self.processed_bytes.fetch_add(n as u32, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self, n: usize) {
        self.dropped_bytes.fetch_add(n as u32, Ordering::Relaxed);
    }

    #[inline]
    pub fn dropped_bytes(&self) -> u32 {
        self.dropped_bytes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn count_capture(&self) {
        self.captures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count_tx_stall(&self) {
        self.tx_stalls.fetch_add(1, Ordering::Relaxed);
    }

    /// A buffer entered the handoff queue.
    #[inline]
    pub fn enqueued(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        let depth = self.queue_depth.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_queue_depth.fetch_max(depth, Ordering::Relaxed);
    }

    /// A buffer left the handoff queue.
    #[inline]
    pub fn dequeued(&self) {
        let _ = self
            .queue_depth
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| Some(d.saturating_sub(1)));
    }

    /// Copy the counters, pairing them with the pool's.
    pub fn snapshot(&self, pool: PoolStats) -> LinkStatus {
        LinkStatus {
            phase: self.phase(),
            rx_bytes: self.rx_bytes(),
            processed_bytes: self.processed_bytes.load(Ordering::Relaxed),
            dropped_bytes: self.dropped_bytes.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            captures: self.captures.load(Ordering::Relaxed),
            tx_stalls: self.tx_stalls.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth.load(Ordering::Relaxed),
            pool,
        }
    }
}

impl Default for TransportStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the link at a point in time.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkStatus {
    pub phase: UartPhase,
    pub rx_bytes: u32,
    pub processed_bytes: u32,
    pub dropped_bytes: u32,
    pub flushes: u32,
    pub captures: u32,
    pub tx_stalls: u32,
    pub queue_depth: u32,
    pub max_queue_depth: u32,
    pub pool: PoolStats,
}

impl Default for UartPhase {
    fn default() -> Self {
        UartPhase::Init
    }
}

impl LinkStatus {
    /// Human-readable report, `\r\n` terminated lines.
    pub fn write_report(&self, out: &mut dyn Write) -> fmt::Result {
        write!(out, "******* SYSTEM STATE ********\r\n")?;
        write!(out, "[State] {:?}\r\n", self.phase)?;
        write!(
            out,
            "[Mem] Fifo {} Max Fifo {} Alloc {} Free {}\r\n",
            self.pool.live, self.pool.max_live, self.pool.allocs, self.pool.frees
        )?;
        write!(out, "[Queue size] {} (max {})\r\n", self.queue_depth, self.max_queue_depth)?;
        write!(
            out,
            "[Data] Received {} Processed {} Dropped {}\r\n",
            self.rx_bytes, self.processed_bytes, self.dropped_bytes
        )?;
        write!(
            out,
            "[Link] Flushes {} Captures {} TX stalls {}\r\n",
            self.flushes, self.captures, self.tx_stalls
        )
    }
}
