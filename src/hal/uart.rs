//! Shell UART and board control on ESP-IDF.
//!
//! The IDF driver owns the real interrupt and its ring buffer; a polling
//! task drains that ring through [`UartLink::on_interrupt`], so the link
//! sees the same RX-ready / FIFO-read sequence as on bare hardware.

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::EspError;

use crate::services::Board;
use crate::uart::{SerialPort, UartLink};

/// Ticks to wait for the TX FIFO per spin.
const TX_WAIT_TICKS: u32 = 1;

/// Shell UART configuration.
pub struct ShellUartConfig {
    pub baud_rate: u32,
}

impl Default for ShellUartConfig {
    fn default() -> Self {
        Self { baud_rate: 115_200 }
    }
}

/// Open the shell UART.
pub fn init_shell_uart<'d>(
    uart: impl Peripheral<P = impl uart::Uart> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    rx_pin: impl Peripheral<P = impl gpio::InputPin> + 'd,
    config: &ShellUartConfig,
) -> Result<UartDriver<'d>, EspError> {
    let uart_config = uart::config::Config::default().baudrate(Hertz(config.baud_rate));

    UartDriver::new(
        uart,
        tx_pin,
        rx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// [`SerialPort`] over the IDF UART driver.
///
/// The link is ISR-safe, but here `UartLink::on_interrupt` is polled from
/// the main task: the IDF driver owns the real UART interrupt and its RX
/// ring, and this port reads from that ring.
pub struct EspSerialPort<'d> {
    driver: UartDriver<'d>,
    link: &'static UartLink,
}

impl<'d> EspSerialPort<'d> {
    pub fn new(driver: UartDriver<'d>, link: &'static UartLink) -> Self {
        Self { driver, link }
    }

    fn rx_waiting(&self) -> bool {
        self.driver.remaining_read().map(|n| n > 0).unwrap_or(false)
    }
}

impl SerialPort for EspSerialPort<'_> {
    fn irq_is_pending(&self) -> bool {
        self.rx_waiting()
    }

    fn irq_rx_ready(&self) -> bool {
        self.rx_waiting()
    }

    // TX completion is reported from `tx_wait`
    fn irq_tx_ready(&self) -> bool {
        false
    }

    fn fifo_read(&self, buf: &mut [u8]) -> usize {
        self.driver.read(buf, NON_BLOCK).unwrap_or(0)
    }

    fn fifo_fill(&self, data: &[u8]) -> usize {
        self.driver.write(data).unwrap_or(0)
    }

    fn irq_tx_enable(&self) {}

    fn irq_tx_disable(&self) {}

    fn tx_wait(&self) {
        if self.driver.wait_tx_done(TX_WAIT_TICKS).is_ok() {
            self.link.on_tx_ready();
        }
    }
}

/// Board control through the IDF system API.
pub struct EspBoard;

impl Board for EspBoard {
    fn reboot(&mut self) {
        // SAFETY: esp_restart has no preconditions and does not return
        unsafe { esp_idf_svc::sys::esp_restart() }
    }
}

/// Milliseconds since boot, wrapping.
pub fn now_ms() -> u32 {
    (crate::logging::timestamp_us() / 1000) as u32
}
