//! UART transport.
//!
//! - [`SerialPort`]: the interrupt-driven UART operations the link needs
//! - [`UartLink`]: receive side (ISR fills pooled buffers and hands them to
//!   the runner) and transmit side (FIFO fill + TX-ready handshake)
//! - [`LinkTerminal`]: a [`Terminal`](crate::services::Terminal) over a link

mod link;

pub use link::{LinkTerminal, UartLink};

use core::fmt;

/// Interrupt-driven UART, as seen from the link.
///
/// All methods take `&self`: the same port is touched from interrupt and
/// task context. Implementations back these with device registers (or, on
/// the host, interior mutability).
pub trait SerialPort {
    /// Latch interrupt status. Call once per interrupt before the queries.
    fn irq_update(&self) {}

    /// Any enabled interrupt source pending.
    fn irq_is_pending(&self) -> bool;

    /// RX FIFO holds data.
    fn irq_rx_ready(&self) -> bool;

    /// TX FIFO can take data.
    fn irq_tx_ready(&self) -> bool;

    /// Drain up to `buf.len()` bytes from the RX FIFO. Returns bytes read.
    fn fifo_read(&self, buf: &mut [u8]) -> usize;

    /// Push up to `data.len()` bytes into the TX FIFO. Returns bytes taken.
    fn fifo_fill(&self, data: &[u8]) -> usize;

    fn irq_tx_enable(&self);

    fn irq_tx_disable(&self);

    fn irq_rx_enable(&self) {}

    fn irq_rx_disable(&self) {}

    /// Called on every spin of the transmit busy-wait.
    fn tx_wait(&self) {
        core::hint::spin_loop();
    }
}

/// Transport failures reported to the active session handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// TX-ready never came back within the spin limit.
    TxStall,
    /// The interrupt discarded received bytes (pool exhausted).
    RxDropped(u32),
}

impl TransportError {
    /// Negative errno-style code.
    pub fn code(&self) -> i32 {
        match self {
            TransportError::TxStall => -110,   // ETIMEDOUT
            TransportError::RxDropped(_) => -12, // ENOMEM
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::TxStall => write!(f, "transmit stalled"),
            TransportError::RxDropped(n) => write!(f, "{} received bytes dropped", n),
        }
    }
}
