//! Log output on a dedicated TX-only UART.
//!
//! The shell UART carries protocol bytes (`[ACK]`, prompts, echo), so logs
//! go out on a second port wired to a USB-UART adapter.
//!
//! ```text
//! ESP32-S3 GPIO6 (TX) ──────▶ USB-UART RX
//!                              └─▶ PC Serial Monitor
//! ```

use core::fmt::Write;

use crate::log_globals::{ISR_LOG_STREAM, TASK_LOG_STREAM};
use crate::logging::{BufWriter, LogEntry, LogStream};

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Interval between dropped-message reports.
#[cfg(target_os = "espidf")]
const DROPPED_REPORT_US: i64 = 10_000_000;

/// UART configuration for logging.
pub struct LogUartConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for LogUartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: 6,
        }
    }
}

/// Format log entry to string.
///
/// Format: `[timestamp_us] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    let mut writer = BufWriter::new(buf);
    let _ = write!(
        writer,
        "[{:10}] {}: {}\n",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.text()
    );
    writer.len()
}

fn drain_stream<const N: usize>(stream: &LogStream<N>, out: &mut dyn Write) -> usize {
    let mut format_buf = [0u8; 160];
    let mut count = 0;
    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, &mut format_buf);
        if let Ok(text) = core::str::from_utf8(&format_buf[..len]) {
            let _ = out.write_str(text);
        }
        count += 1;
    }
    count
}

/// Drain both global streams, ISR side first. Returns entries written.
pub fn drain_into(out: &mut dyn Write) -> usize {
    drain_stream(&ISR_LOG_STREAM, out) + drain_stream(&TASK_LOG_STREAM, out)
}

/// Write the dropped counters if any, then reset them.
pub fn report_dropped(out: &mut dyn Write) -> bool {
    let isr_dropped = ISR_LOG_STREAM.dropped();
    let task_dropped = TASK_LOG_STREAM.dropped();
    if isr_dropped == 0 && task_dropped == 0 {
        return false;
    }
    let _ = write!(out, "[WARN] Dropped: ISR={}, TASK={}\n", isr_dropped, task_dropped);
    ISR_LOG_STREAM.reset_dropped();
    TASK_LOG_STREAM.reset_dropped();
    true
}

/// Initialize a TX-only UART for logging output.
#[cfg(target_os = "espidf")]
pub fn init_log_uart<'d>(
    uart: impl Peripheral<P = esp_idf_svc::hal::uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &LogUartConfig,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None,  // CTS
        Option::<gpio::AnyIOPin>::None,  // RTS
        &uart_config,
    )
}

/// Adapter so the drain can format straight into the TX driver.
#[cfg(target_os = "espidf")]
struct UartSink<'a, 'd>(&'a mut UartTxDriver<'d>);

#[cfg(target_os = "espidf")]
impl Write for UartSink<'_, '_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.write(s.as_bytes()).map(|_| ()).map_err(|_| core::fmt::Error)
    }
}

/// Log drain task.
#[cfg(target_os = "espidf")]
pub fn log_drain_task(uart: &mut UartTxDriver<'_>) -> ! {
    let mut last_dropped_report = 0i64;

    loop {
        let mut sink = UartSink(&mut *uart);
        let work_done = drain_into(&mut sink) > 0;

        let now = crate::logging::timestamp_us();
        if now - last_dropped_report > DROPPED_REPORT_US {
            report_dropped(&mut sink);
            last_dropped_report = now;
        }

        if !work_done {
            // SAFETY: plain FreeRTOS delay from task context
            unsafe {
                esp_idf_svc::sys::vTaskDelay(10);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MAX_MSG_LEN};

    fn entry(ts: i64, level: LogLevel, text: &[u8]) -> LogEntry {
        let mut msg = [0u8; MAX_MSG_LEN];
        msg[..text.len()].copy_from_slice(text);
        LogEntry { timestamp_us: ts, level, len: text.len() as u8, msg }
    }

    #[test]
    fn test_format_log_entry() {
        let e = entry(1234567, LogLevel::Info, b"session: upload");
        let mut buf = [0u8; 160];
        let len = format_log_entry(&e, &mut buf);

        let formatted = core::str::from_utf8(&buf[..len]).unwrap();
        assert!(formatted.contains("1234567"));
        assert!(formatted.contains("INFO"));
        assert!(formatted.ends_with("session: upload\n"));
    }

    #[test]
    fn test_drain_local_stream() {
        let stream = LogStream::<8>::new();
        stream.push(1, LogLevel::Warn, b"pool exhausted");
        stream.push(2, LogLevel::Error, b"tx stall");

        let mut out = String::new();
        assert_eq!(drain_stream(&stream, &mut out), 2);
        assert!(out.contains("WARN: pool exhausted"));
        assert!(out.contains("ERROR: tx stall"));
        assert_eq!(drain_stream(&stream, &mut out), 0);
    }
}
