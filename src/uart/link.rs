//! Interrupt-driven line link.
//!
//! # Receive path
//!
//! ```text
//! RX IRQ ──▶ filling buffer ──flush──▶ Handoff ──▶ runner
//!                 │                                  │
//!                 └──────── take_partial ◀── idle ───┘
//! ```
//!
//! The interrupt appends FIFO bytes to the buffer it is filling and flushes
//! it to the runner when the runner is starving, the buffer is full, the
//! runner asked for more, or a control byte arrived. Otherwise it keeps
//! accumulating so a fast paste costs few buffers.
//!
//! The filling buffer is published in one atomic word. The ISR swaps in
//! [`ISR_BUSY`] while it works on the buffer; the runner may only steal the
//! buffer with a compare-and-swap from a non-busy value, so each byte is
//! delivered exactly once.
//!
//! # Transmit path
//!
//! Fill the TX FIFO, spin until the TX-ready interrupt sets `tx_done`,
//! repeat. The spin is bounded by `CONFIG.tx_spin_limit()`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{CONFIG, MAX_LINE, POOL_SLOTS};
use crate::diag::{LinkStatus, TransportStats, UartPhase};
use crate::handoff::Handoff;
use crate::log_globals::{ISR_LOG_STREAM, TASK_LOG_STREAM};
use crate::pool::{BufferPool, LineBuffer};
use crate::services::Terminal;
use crate::{rt_error, rt_warn};

use super::{SerialPort, TransportError};

/// No buffer being filled.
const NO_BUFFER: u32 = 0;
/// The interrupt owns the filling buffer right now.
const ISR_BUSY: u32 = u32::MAX;

/// Bound on status re-checks per interrupt.
const MAX_IRQ_PASSES: usize = 4;

/// Scratch size for draining the FIFO when no buffer is available.
const DISCARD_CHUNK: usize = 16;

#[inline]
fn pack(index: u8) -> u32 {
    index as u32 + 1
}

#[inline]
fn unpack(word: u32) -> u8 {
    (word - 1) as u8
}

/// One UART's receive pool, handoff queue and TX handshake.
///
/// Lives in a `static` on target so the ISR can reach it.
pub struct UartLink<const SLOTS: usize = POOL_SLOTS, const CAP: usize = MAX_LINE> {
    pool: BufferPool<SLOTS, CAP>,
    ready: Handoff<SLOTS>,
    filling: AtomicU32,
    /// Runner finished a buffer and wants the next bytes right away.
    consumer_hint: AtomicBool,
    tx_done: AtomicBool,
    stats: TransportStats,
}

impl<const SLOTS: usize, const CAP: usize> UartLink<SLOTS, CAP> {
    pub const fn new() -> Self {
        Self {
            pool: BufferPool::new(),
            ready: Handoff::new(),
            filling: AtomicU32::new(NO_BUFFER),
            consumer_hint: AtomicBool::new(false),
            tx_done: AtomicBool::new(false),
            stats: TransportStats::new(),
        }
    }

    // ------------------------------------------------------------------
    // Interrupt context
    // ------------------------------------------------------------------

    /// UART interrupt entry point.
    pub fn on_interrupt<P: SerialPort + ?Sized>(&self, port: &P) {
        self.stats.set_phase(UartPhase::IrqUpdate);

        for _ in 0..MAX_IRQ_PASSES {
            port.irq_update();
            if !port.irq_is_pending() {
                break;
            }
            if port.irq_rx_ready() {
                self.on_rx_ready(port);
            }
            if port.irq_tx_ready() {
                self.on_tx_ready();
            }
        }

        self.stats.set_phase(UartPhase::IsrEnd);
    }

    /// TX FIFO drained.
    #[inline]
    pub fn on_tx_ready(&self) {
        self.stats.set_phase(UartPhase::TxReady);
        self.tx_done.store(true, Ordering::Release);
    }

    /// RX FIFO has data.
    pub fn on_rx_ready<P: SerialPort + ?Sized>(&self, port: &P) {
        self.stats.set_phase(UartPhase::RxReady);

        let word = self.filling.swap(ISR_BUSY, Ordering::AcqRel);
        let mut buf = if word == NO_BUFFER || word == ISR_BUSY {
            match self.pool.acquire() {
                Some(buf) => buf,
                None => {
                    self.discard_fifo(port);
                    self.filling.store(NO_BUFFER, Ordering::Release);
                    return;
                }
            }
        } else {
            // SAFETY: the filling word owned this slot; ISR_BUSY keeps the
            // runner from stealing it until we store a new word
            unsafe { self.pool.from_raw(unpack(word)) }
        };

        self.stats.set_phase(UartPhase::FifoRead);
        let start = buf.len();
        let n = port.fifo_read(buf.spare_mut());
        buf.set_len(start + n);
        self.stats.add_rx(n);
        self.stats.set_phase(UartPhase::FifoReadEnd);

        if buf.is_empty() {
            // Spurious RX; nothing worth keeping
            self.pool.release(buf);
            self.filling.store(NO_BUFFER, Ordering::Release);
            return;
        }

        if self.should_flush(&buf, start) {
            self.stats.set_phase(UartPhase::FifoFlush);
            let len = buf.len();
            let index = buf.into_raw();
            if self.ready.push(index) {
                self.stats.enqueued();
            } else {
                // SAFETY: push failed, we still own the slot
                let buf = unsafe { self.pool.from_raw(index) };
                self.pool.release(buf);
                self.stats.add_dropped(len);
                rt_error!(ISR_LOG_STREAM, "handoff full, {} bytes dropped", len);
            }
            self.filling.store(NO_BUFFER, Ordering::Release);
        } else {
            self.filling.store(pack(buf.into_raw()), Ordering::Release);
        }
    }

    fn should_flush(&self, buf: &LineBuffer<'_, CAP>, start: usize) -> bool {
        let hint = self.consumer_hint.swap(false, Ordering::AcqRel);
        if hint || buf.is_full() || self.pool.live() <= CONFIG.flush_live_threshold() {
            return true;
        }
        buf.as_slice()[start..].iter().any(|&b| b < 0x20)
    }

    fn discard_fifo<P: SerialPort + ?Sized>(&self, port: &P) {
        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut total = 0usize;
        loop {
            let n = port.fifo_read(&mut scratch);
            if n == 0 {
                break;
            }
            total += n;
            if n < scratch.len() {
                break;
            }
        }
        if total > 0 {
            self.stats.add_rx(total);
            self.stats.add_dropped(total);
            rt_warn!(ISR_LOG_STREAM, "pool exhausted, {} bytes dropped", total);
        }
    }

    // ------------------------------------------------------------------
    // Task context
    // ------------------------------------------------------------------

    /// Next flushed buffer, oldest first.
    pub fn take_ready(&self) -> Option<LineBuffer<'_, CAP>> {
        let index = self.ready.pop()?;
        self.stats.dequeued();
        // SAFETY: the queue held the only reference to this slot
        Some(unsafe { self.pool.from_raw(index) })
    }

    /// Steal the buffer the interrupt is filling, if it holds any bytes.
    ///
    /// Fails (returns `None`) if the interrupt is mid-update; try again on
    /// the next poll.
    pub fn take_partial(&self) -> Option<LineBuffer<'_, CAP>> {
        let word = self.filling.load(Ordering::Acquire);
        if word == NO_BUFFER || word == ISR_BUSY {
            return None;
        }
        self.filling
            .compare_exchange(word, NO_BUFFER, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        self.stats.set_phase(UartPhase::TaskCapture);
        self.stats.count_capture();
        // SAFETY: the CAS moved ownership from the filling word to us
        Some(unsafe { self.pool.from_raw(unpack(word)) })
    }

    /// Interrupt is holding a not yet flushed buffer.
    #[inline]
    pub fn has_partial(&self) -> bool {
        self.filling.load(Ordering::Acquire) != NO_BUFFER
    }

    /// Ask the interrupt to flush on its next RX.
    #[inline]
    pub fn signal_consumer_ready(&self) {
        self.consumer_hint.store(true, Ordering::Release);
    }

    /// Hand a buffer back to the pool.
    #[inline]
    pub fn release(&self, buf: LineBuffer<'_, CAP>) {
        self.pool.release(buf);
    }

    /// Free warm buffers while idle. Returns how many were freed.
    #[inline]
    pub fn drain_idle(&self) -> u32 {
        self.pool.drain_idle()
    }

    /// Flushed buffers waiting for the runner.
    #[inline]
    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    #[inline]
    pub fn pool(&self) -> &BufferPool<SLOTS, CAP> {
        &self.pool
    }

    #[inline]
    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub fn status(&self) -> LinkStatus {
        self.stats.snapshot(self.pool.stats())
    }

    /// Send `data`, blocking until the last FIFO fill has drained.
    pub fn transmit<P: SerialPort + ?Sized>(
        &self,
        port: &P,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.transmit_bounded(port, data, CONFIG.tx_spin_limit())
    }

    /// [`transmit`](Self::transmit) with an explicit spin limit per fill.
    pub fn transmit_bounded<P: SerialPort + ?Sized>(
        &self,
        port: &P,
        data: &[u8],
        limit: u32,
    ) -> Result<(), TransportError> {
        if data.is_empty() {
            return Ok(());
        }

        let mut rest = data;
        let mut result = Ok(());

        port.irq_tx_enable();
        while !rest.is_empty() {
            self.tx_done.store(false, Ordering::Release);
            self.stats.set_phase(UartPhase::FifoWait);
            let sent = port.fifo_fill(rest).min(rest.len());

            let mut spins = 0u32;
            while !self.tx_done.load(Ordering::Acquire) {
                if spins >= limit {
                    break;
                }
                port.tx_wait();
                spins += 1;
            }
            if !self.tx_done.load(Ordering::Acquire) {
                self.stats.count_tx_stall();
                rt_error!(TASK_LOG_STREAM, "tx stall, {} bytes unsent", rest.len() - sent);
                result = Err(TransportError::TxStall);
                break;
            }

            rest = &rest[sent..];
        }
        port.irq_tx_disable();

        result
    }
}

impl<const SLOTS: usize, const CAP: usize> Default for UartLink<SLOTS, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Terminal`] writing through a link's transmit path.
///
/// The first transmit failure is kept until the runner collects it.
pub struct LinkTerminal<'a, P: SerialPort + ?Sized, const SLOTS: usize = POOL_SLOTS, const CAP: usize = MAX_LINE>
{
    link: &'a UartLink<SLOTS, CAP>,
    port: &'a P,
    error: Option<TransportError>,
}

impl<'a, P: SerialPort + ?Sized, const SLOTS: usize, const CAP: usize> LinkTerminal<'a, P, SLOTS, CAP> {
    pub fn new(link: &'a UartLink<SLOTS, CAP>, port: &'a P) -> Self {
        Self {
            link,
            port,
            error: None,
        }
    }
}

impl<P: SerialPort + ?Sized, const SLOTS: usize, const CAP: usize> Terminal for LinkTerminal<'_, P, SLOTS, CAP> {
    fn send(&mut self, bytes: &[u8]) {
        if let Err(e) = self.link.transmit(self.port, bytes) {
            self.error.get_or_insert(e);
        }
    }

    fn take_error(&mut self) -> Option<TransportError> {
        self.error.take()
    }
}
