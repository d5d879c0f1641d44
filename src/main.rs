//! ZJS A Shell - Main entry point
//!
//! On ESP-IDF: shell on UART0, logs on a TX-only UART1, RAM filesystem, and
//! the session runner looping on the main task.
//!
//! On the host: the same runner fed from stdin and printing to stdout, with
//! log lines on stderr. Handy for poking at the shell without a board.

use zjs_ashell::services::{JsEngine, Terminal};
use zjs_ashell::term_print;

/// Stand-in engine: reports what it was asked to do.
struct ConsoleEngine;

impl JsEngine for ConsoleEngine {
    fn run(&mut self, file: &str, term: &mut dyn Terminal) {
        term_print!(term, "[js] run {}\r\n", file);
    }

    fn eval(&mut self, source: &[u8], term: &mut dyn Terminal) {
        term.print("[js] ");
        term.send(source);
        term.print("\r\n");
    }

    fn parse(&mut self, file: &str, term: &mut dyn Terminal) {
        term_print!(term, "[js] parse {}\r\n", file);
    }

    fn stop(&mut self) {}
}

#[cfg(target_os = "espidf")]
fn main() {
    firmware::run();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    host::run();
}

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::hal::peripherals::Peripherals;

    use zjs_ashell::hal::{init_shell_uart, now_ms, EspBoard, EspSerialPort, RamFs, ShellUartConfig};
    use zjs_ashell::log_drain::{init_log_uart, log_drain_task, LogUartConfig};
    use zjs_ashell::log_globals::TASK_LOG_STREAM;
    use zjs_ashell::{rt_error, LinkTerminal, Services, SessionRunner, UartLink};

    use super::ConsoleEngine;

    static LINK: UartLink = UartLink::new();

    pub fn run() {
        esp_idf_svc::sys::link_patches();

        let Ok(peripherals) = Peripherals::take() else {
            return;
        };

        match init_log_uart(peripherals.uart1, peripherals.pins.gpio6, &LogUartConfig::default()) {
            Ok(mut log_uart) => {
                let spawned = std::thread::Builder::new()
                    .name("log_drain".into())
                    .stack_size(4096)
                    .spawn(move || log_drain_task(&mut log_uart));
                if spawned.is_err() {
                    rt_error!(TASK_LOG_STREAM, "log drain task not started");
                }
            }
            Err(_) => rt_error!(TASK_LOG_STREAM, "log UART init failed"),
        }

        let driver = match init_shell_uart(
            peripherals.uart0,
            peripherals.pins.gpio43,
            peripherals.pins.gpio44,
            &ShellUartConfig::default(),
        ) {
            Ok(driver) => driver,
            Err(e) => {
                rt_error!(TASK_LOG_STREAM, "shell UART init failed: {}", e);
                return;
            }
        };
        let port = EspSerialPort::new(driver, &LINK);

        let mut term = LinkTerminal::new(&LINK, &port);
        let mut fs = Box::new(RamFs::<8, 4096>::new());
        let mut js = ConsoleEngine;
        let mut board = EspBoard;
        let mut svc = Services::new(&mut term, &mut *fs, &mut js, &mut board);

        let mut runner = SessionRunner::new(&LINK);
        runner.start(now_ms(), &mut svc);

        loop {
            LINK.on_interrupt(&port);
            if !runner.poll(now_ms(), &mut svc) {
                // SAFETY: plain FreeRTOS delay from task context
                unsafe {
                    esp_idf_svc::sys::vTaskDelay(1);
                }
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::sync::mpsc::{self, TryRecvError};
    use std::thread;
    use std::time::{Duration, Instant};

    use zjs_ashell::hal::RamFs;
    use zjs_ashell::log_drain::{drain_into, report_dropped};
    use zjs_ashell::services::Board;
    use zjs_ashell::{LinkTerminal, SerialPort, Services, SessionRunner, UartLink};

    use super::ConsoleEngine;

    static LINK: UartLink = UartLink::new();

    /// Port whose RX FIFO is fed from stdin and whose TX goes to stdout.
    struct StdioPort {
        rx: RefCell<VecDeque<u8>>,
    }

    impl SerialPort for StdioPort {
        fn irq_is_pending(&self) -> bool {
            !self.rx.borrow().is_empty()
        }

        fn irq_rx_ready(&self) -> bool {
            !self.rx.borrow().is_empty()
        }

        fn irq_tx_ready(&self) -> bool {
            false
        }

        fn fifo_read(&self, buf: &mut [u8]) -> usize {
            let mut rx = self.rx.borrow_mut();
            let n = buf.len().min(rx.len());
            for (dst, src) in buf.iter_mut().zip(rx.drain(..n)) {
                *dst = src;
            }
            n
        }

        fn fifo_fill(&self, data: &[u8]) -> usize {
            let mut out = std::io::stdout().lock();
            match out.write_all(data).and_then(|_| out.flush()) {
                Ok(()) => data.len(),
                Err(_) => 0,
            }
        }

        fn irq_tx_enable(&self) {}

        fn irq_tx_disable(&self) {}

        // stdout is synchronous: the fill is done once it returns
        fn tx_wait(&self) {
            LINK.on_tx_ready();
        }
    }

    struct HostBoard;

    impl Board for HostBoard {
        fn reboot(&mut self) {
            eprintln!("[board] reboot requested");
        }
    }

    /// Forward formatted log lines to stderr.
    struct Stderr;

    impl core::fmt::Write for Stderr {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            std::io::stderr().write_all(s.as_bytes()).map_err(|_| core::fmt::Error)
        }
    }

    fn spawn_stdin() -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut chunk = [0u8; 64];
            loop {
                match stdin.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        rx
    }

    pub fn run() {
        let port = StdioPort {
            rx: RefCell::new(VecDeque::new()),
        };
        let input = spawn_stdin();
        let started = Instant::now();
        let now_ms = || started.elapsed().as_millis() as u32;

        let mut term = LinkTerminal::new(&LINK, &port);
        let mut fs = Box::new(RamFs::<8, 4096>::new());
        let mut js = ConsoleEngine;
        let mut board = HostBoard;
        let mut svc = Services::new(&mut term, &mut *fs, &mut js, &mut board);

        let mut runner = SessionRunner::new(&LINK);
        runner.start(now_ms(), &mut svc);

        let mut closed = false;
        loop {
            match input.try_recv() {
                Ok(bytes) => port.rx.borrow_mut().extend(bytes),
                Err(TryRecvError::Disconnected) => closed = true,
                Err(TryRecvError::Empty) => {}
            }

            LINK.on_interrupt(&port);
            let busy = runner.poll(now_ms(), &mut svc);

            drain_into(&mut Stderr);
            report_dropped(&mut Stderr);

            if !busy {
                if closed && LINK.pending() == 0 && !LINK.has_partial() && runner.pending_len() == 0 {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }

        runner.stop(&mut svc);
        drain_into(&mut Stderr);
    }
}
