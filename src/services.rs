//! Collaborators the session handlers talk to.
//!
//! The serial subsystem owns none of these: the terminal writes back through
//! the link, the filesystem and JavaScript engine belong to the runtime, the
//! board knows how to reboot. Handlers receive them bundled in [`Services`].

use core::fmt;

use crate::diag::LinkStatus;
use crate::uart::TransportError;

pub use crate::fs::{DirEntry, EntryKind, FileHandle, FileSystem, FsError, OpenMode, SeekFrom};

/// Byte sink towards the host.
pub trait Terminal {
    /// Send bytes, blocking until accepted.
    fn send(&mut self, bytes: &[u8]);

    fn print(&mut self, s: &str) {
        self.send(s.as_bytes());
    }

    fn print_fmt(&mut self, args: fmt::Arguments<'_>) {
        let _ = fmt::write(&mut TermWriter(self), args);
    }

    /// First transport failure since the last call, if any.
    fn take_error(&mut self) -> Option<TransportError> {
        None
    }
}

/// `fmt::Write` adapter over a terminal.
pub struct TermWriter<'a, T: Terminal + ?Sized>(pub &'a mut T);

impl<T: Terminal + ?Sized> fmt::Write for TermWriter<'_, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.send(s.as_bytes());
        Ok(())
    }
}

/// `printf`-style output on a terminal.
#[macro_export]
macro_rules! term_print {
    ($term:expr, $($arg:tt)*) => {
        $term.print_fmt(format_args!($($arg)*))
    };
}

/// JavaScript runtime entry points.
pub trait JsEngine {
    /// Execute a stored program.
    fn run(&mut self, file: &str, term: &mut dyn Terminal);

    /// Evaluate one line in the REPL context.
    fn eval(&mut self, source: &[u8], term: &mut dyn Terminal);

    /// Syntax-check a stored program.
    fn parse(&mut self, file: &str, term: &mut dyn Terminal);

    /// Stop whatever is running.
    fn stop(&mut self);
}

/// Board control.
pub trait Board {
    fn reboot(&mut self);
}

/// Everything a handler may touch while processing.
pub struct Services<'a> {
    pub term: &'a mut dyn Terminal,
    pub fs: &'a mut dyn FileSystem,
    pub js: &'a mut dyn JsEngine,
    pub board: &'a mut dyn Board,
    /// Link snapshot taken by the runner before each `process` call.
    pub status: Option<LinkStatus>,
}

impl<'a> Services<'a> {
    pub fn new(
        term: &'a mut dyn Terminal,
        fs: &'a mut dyn FileSystem,
        js: &'a mut dyn JsEngine,
        board: &'a mut dyn Board,
    ) -> Self {
        Self {
            term,
            fs,
            js,
            board,
            status: None,
        }
    }
}
