//! Interactive shell session.
//!
//! The shell owns the line editor and the per-session mode flags. Complete
//! lines go to one of three places depending on the mode: the JavaScript
//! evaluator, the raw capture file, or the command dispatcher.

pub mod args;
pub mod commands;
pub mod editor;
pub mod error;
pub mod files;
pub mod flags;
mod modes;

pub use commands::{dispatch, print_help, CommandDescriptor, CommandHandler, COMMANDS};
pub use editor::{EditLine, EscapeState, Feed, LineEditor};
pub use error::{CommandResult, ShellError};
pub use files::{boot_cfg_target, file_arg, valid_filename, write_boot_cfg, FileName};
pub use flags::ShellMode;

use crate::config::{CONFIG, MAX_LINE};
use crate::fs::FileHandle;
use crate::log_globals::TASK_LOG_STREAM;
use crate::services::Services;
use crate::session::{HandlerKind, SessionError, SessionHandler};
use crate::{rt_debug, rt_info};

use flags::DEFAULT_PROMPT;

/// Buffer that switches echo off before it is processed.
const ECHO_OFF_LINE: &[u8] = b"echo off\n";

/// File being written by `load` in raw mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Capture {
    pub(crate) fh: FileHandle,
    pub(crate) name: FileName,
}

/// Mode flags and settings that commands change.
#[derive(Debug)]
pub struct ShellState {
    mode: ShellMode,
    /// `None` selects the default prompt.
    prompt: Option<&'static str>,
    echo: bool,
    capture: Option<Capture>,
    done: bool,
}

impl ShellState {
    pub fn new() -> Self {
        Self {
            mode: ShellMode::default(),
            prompt: None,
            echo: CONFIG.echo(),
            capture: None,
            done: false,
        }
    }

    pub fn mode(&self) -> ShellMode {
        self.mode
    }

    pub fn prompt(&self) -> &'static str {
        self.prompt.unwrap_or(DEFAULT_PROMPT)
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn set_echo(&mut self, on: bool) {
        self.echo = on;
    }

    /// Name of the file raw capture is writing, if any.
    pub fn capture_name(&self) -> Option<&str> {
        self.capture.as_ref().map(|c| c.name.as_str())
    }

    /// Whether the shell asked to hand the link over.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether commands are bracketed with `[BCMD]`/`[ECMD]`.
    pub(crate) fn ihex(&self) -> bool {
        self.mode.contains(ShellMode::TRANSFER_IHEX)
    }

    pub(crate) fn set_prompt(&mut self, prompt: Option<&'static str>) {
        self.prompt = prompt;
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

/// The command shell as a session handler.
pub struct Shell<const N: usize = MAX_LINE> {
    editor: LineEditor<N>,
    state: ShellState,
    booted: bool,
}

impl<const N: usize> Shell<N> {
    pub fn new() -> Self {
        Self {
            editor: LineEditor::new(),
            state: ShellState::new(),
            booted: false,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn editor(&self) -> &LineEditor<N> {
        &self.editor
    }

    /// Route one complete line.
    fn handle_line(state: &mut ShellState, line: &mut [u8], svc: &mut Services<'_>) -> CommandResult {
        let result = if state.mode.contains(ShellMode::EVAL_JAVASCRIPT) {
            modes::eval_line(state, line, svc)
        } else if state.mode.contains(ShellMode::CAPTURE_RAW) {
            modes::capture_line(state, line, svc)
        } else {
            return dispatch(state, line, svc);
        };

        result.unwrap_or_else(|e| {
            svc.term.print(e.message());
            CommandResult::Error
        })
    }
}

impl<const N: usize> Default for Shell<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SessionHandler for Shell<N> {
    fn init(&mut self, svc: &mut Services<'_>) -> Result<(), SessionError> {
        self.state.done = false;
        svc.term.print(self.state.prompt());

        if !self.booted {
            self.booted = true;
            if let Some(target) = boot_cfg_target(&mut *svc.fs) {
                rt_info!(TASK_LOG_STREAM, "boot.cfg: running {}", target.as_str());
                svc.js.run(&target, &mut *svc.term);
            }
        }
        Ok(())
    }

    fn process(&mut self, data: &[u8], svc: &mut Services<'_>) -> usize {
        if data == ECHO_OFF_LINE {
            self.state.echo = false;
        }

        let mut processed = 0;
        for &byte in data {
            processed += 1;

            let echo = self.state.echo;
            if self.editor.feed(byte, echo, &mut *svc.term) == Feed::Consumed {
                continue;
            }

            let line = self.editor.take_line(echo, &mut *svc.term);
            let result = Self::handle_line(&mut self.state, line, svc);
            rt_debug!(TASK_LOG_STREAM, "line result {}", result.code());

            if result != CommandResult::OkNoPrompt {
                svc.term.print("\r\n");
                svc.term.print(self.state.prompt());
            }
            self.editor.reset();

            if self.state.done {
                break;
            }
        }

        self.editor.flush_echo(self.state.echo, &mut *svc.term);
        processed
    }

    fn is_done(&self) -> bool {
        self.state.done
    }

    fn close(&mut self, _svc: &mut Services<'_>) -> HandlerKind {
        self.state.done = false;
        self.editor.reset();
        HandlerKind::Upload
    }
}
