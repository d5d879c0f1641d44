//! Shell mode flags, prompts and fixed messages.

use bitflags::bitflags;

bitflags! {
    /// What the shell does with the next line.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ShellMode: u32 {
        /// `load` captures raw text.
        const TRANSFER_RAW = 1 << 0;
        /// `load` hands the link to the Intel HEX uploader; commands are
        /// bracketed with protocol markers.
        const TRANSFER_IHEX = 1 << 1;
        /// Lines are written to the capture file.
        const CAPTURE_RAW = 1 << 3;
        /// Lines are evaluated as JavaScript.
        const EVAL_JAVASCRIPT = 1 << 4;
    }
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::TRANSFER_RAW
    }
}

// ANSI helpers
pub const ANSI_FG_RED: &str = "\x1b[31m";
pub const ANSI_FG_GREEN: &str = "\x1b[32m";
pub const ANSI_FG_YELLOW: &str = "\x1b[33m";
pub const ANSI_FG_LIGHT_BLUE: &str = "\x1b[34;1m";
pub const ANSI_FG_RESTORE: &str = "\x1b[39;0m";
pub const ANSI_CLEAR: &str = "\x1b[2J\x1b[H";

pub const DEFAULT_PROMPT: &str = "\x1b[33macm> \x1b[39;0m";
pub const HEX_PROMPT: &str = "[HEX]\r\n";
pub const RAW_PROMPT: &str = "\x1b[33mRAW> \x1b[39;0m";
pub const EVAL_PROMPT: &str = "\x1b[32mjs> \x1b[39;0m";

pub const MSG_FILE_SAVED: &str =
    "\x1b[32mSaving file. \x1b[39;0mrun the 'run' command to see the result\r\n";
pub const MSG_FILE_ABORTED: &str = "\x1b[31mAborted!\r\n";
pub const MSG_EXIT: &str = "\x1b[32mBack to shell!\r\n";

pub const READY_FOR_RAW_DATA: &str = "Ready for JavaScript. \r\n\
                                      \tCtrl+Z to finish transfer.\r\n\
                                      \tCtrl+X to cancel.\r\n";

pub const MSG_IMMEDIATE_MODE: &str = "Ready to evaluate JavaScript.\r\n\
                                      \tCtrl+D to return to shell.\r\n";

// Control bytes
pub const ASCII_END_OF_TEXT: u8 = 0x03; // Ctrl+C
pub const ASCII_END_OF_TRANS: u8 = 0x04; // Ctrl+D
pub const ASCII_BKSP: u8 = 0x08;
pub const ASCII_TAB: u8 = b'\t';
pub const ASCII_IF: u8 = b'\n';
pub const ASCII_CR: u8 = b'\r';
pub const ASCII_CANCEL: u8 = 0x18; // Ctrl+X
pub const ASCII_SUBSTITUTE: u8 = 0x1A; // Ctrl+Z
pub const ASCII_ESC: u8 = 0x1B;
pub const ASCII_DEL: u8 = 0x7F;
