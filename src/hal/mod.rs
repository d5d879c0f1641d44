//! Hardware Abstraction Layer.
//!
//! Thin wrappers around ESP-IDF peripherals, plus the RAM filesystem used
//! wherever no flash filesystem is mounted. Business logic stays in core
//! modules, HAL is just I/O.

pub mod ram_fs;
#[cfg(target_os = "espidf")]
pub mod uart;

pub use ram_fs::RamFs;
#[cfg(target_os = "espidf")]
pub use uart::{init_shell_uart, now_ms, EspBoard, EspSerialPort, ShellUartConfig};
