//! # ZJS A Shell
//!
//! Serial developer shell for an embedded JavaScript runtime: line-edited
//! command shell, raw file capture, live evaluation and an Intel HEX
//! uploader, all multiplexed over one UART.
//!
//! ## Architecture
//!
//! ```text
//! UART ISR                         runner task
//! ────────                         ───────────
//! BufferPool ─▶ UartLink ─▶ Handoff ─▶ SessionRunner ─▶ Shell | IhexUpload
//!                  ▲                                          │
//!                  └──────────── LinkTerminal ◀───────────────┘
//! ```
//!
//! - The interrupt only fills pooled buffers and queues them
//! - The runner is the only consumer and the only place handlers switch
//! - Collaborators (filesystem, JS engine, board) are traits in [`services`]

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod logging;
pub mod log_globals;
pub mod log_drain;
pub mod diag;
pub mod pool;
pub mod handoff;
pub mod uart;
pub mod fs;
pub mod services;
pub mod hal;
pub mod shell;
pub mod ihex;
pub mod session;

pub use config::CONFIG;
pub use diag::{LinkStatus, TransportStats, UartPhase};
pub use ihex::IhexUpload;
pub use pool::{BufferPool, LineBuffer, PoolStats};
pub use services::{Board, JsEngine, Services, Terminal};
pub use session::{HandlerKind, SessionError, SessionHandler, SessionRunner};
pub use shell::Shell;
pub use uart::{LinkTerminal, SerialPort, TransportError, UartLink};
