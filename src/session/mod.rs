//! Session handlers and the runner that drives them.
//!
//! Exactly one handler owns the link at a time. The runner feeds it line
//! buffers; when the handler reports done, the runner closes it and starts
//! whichever handler `close` names.

mod runner;

pub use runner::SessionRunner;

use crate::fs::FsError;
use crate::services::Services;
use crate::uart::TransportError;

/// Which handler the runner should start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    /// Interactive command shell.
    Shell,
    /// Intel HEX upload into the temporary file.
    Upload,
}

/// Handler start-up failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Destination file could not be opened.
    FileOpen(FsError),
}

impl SessionError {
    pub fn code(&self) -> i32 {
        match self {
            Self::FileOpen(e) => e.code(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::FileOpen(_) => "Failed to open file",
        }
    }
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::FileOpen(e) => write!(f, "{}: {}", self.message(), e),
        }
    }
}

/// Pluggable consumer of received bytes.
pub trait SessionHandler {
    /// Prepare for the first buffer. A failure closes the handler at once.
    fn init(&mut self, svc: &mut Services<'_>) -> Result<(), SessionError>;

    /// Consume a prefix of `data`, returning how many bytes were used.
    ///
    /// Bytes left over when the handler turns done are delivered to the
    /// next handler.
    fn process(&mut self, data: &[u8], svc: &mut Services<'_>) -> usize;

    /// Whether the handler wants to be closed.
    fn is_done(&self) -> bool;

    /// Release resources and name the successor.
    fn close(&mut self, svc: &mut Services<'_>) -> HandlerKind;

    /// The transport reported a failure while this handler was active.
    fn error(&mut self, err: TransportError, svc: &mut Services<'_>) {
        crate::rt_warn!(
            crate::log_globals::TASK_LOG_STREAM,
            "transport error {}",
            err.code()
        );
        let _ = svc;
    }

    /// Send raw bytes to the host.
    fn send(&mut self, svc: &mut Services<'_>, bytes: &[u8]) {
        svc.term.send(bytes);
    }
}
