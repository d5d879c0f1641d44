//! Line editor and terminal codec
//!
//! Byte-at-a-time: input may arrive split anywhere, including in the
//! middle of an escape sequence.
//!
//! [`EditLine`] is the pure data structure (cursor `cur`, `end` bytes to the
//! right of it). [`LineEditor`] adds the escape state machine and the echo,
//! which is emitted after each edit from the bytes the edit reports.

use crate::config::MAX_LINE;
use crate::log_globals::TASK_LOG_STREAM;
use crate::rt_debug;
use crate::services::Terminal;

use super::flags::{ASCII_BKSP, ASCII_CR, ASCII_DEL, ASCII_ESC, ASCII_IF, ASCII_TAB};

const CURSOR_SAVE: &[u8] = b"\x1b[s";
const CURSOR_RESTORE: &[u8] = b"\x1b[u";
const CURSOR_FORWARD: &[u8] = b"\x1b[1C";
const CURSOR_BACKWARD: &[u8] = b"\x1b[1D";

/// Fixed-capacity edit line.
///
/// Printable input is refused once `len == N - 1`; the last byte is kept
/// for the control byte that ends the line.
pub struct EditLine<const N: usize = MAX_LINE> {
    buf: [u8; N],
    cur: usize,
    end: usize,
}

impl<const N: usize> EditLine<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            cur: 0,
            end: 0,
        }
    }

    /// Cursor position.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cur
    }

    /// Bytes right of the cursor.
    #[inline]
    pub fn tail_len(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cur + self.end
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No room for more printable input.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() + 1 >= N
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    #[inline]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.buf[..len]
    }

    /// Bytes `from..cursor`.
    #[inline]
    pub fn before_cursor(&self, from: usize) -> &[u8] {
        &self.buf[from.min(self.cur)..self.cur]
    }

    /// Bytes right of the cursor.
    #[inline]
    pub fn tail(&self) -> &[u8] {
        &self.buf[self.cur..self.len()]
    }

    /// Insert `c` at the cursor. Returns the bytes shifted right, `None` if
    /// the line is full.
    pub fn insert(&mut self, c: u8) -> Option<&[u8]> {
        if self.is_full() {
            return None;
        }
        self.shift_in(c);
        Some(self.tail())
    }

    /// Insert a line-ending control byte, which may use the reserved slot.
    pub fn push_control(&mut self, c: u8) -> bool {
        if self.len() >= N {
            return false;
        }
        self.shift_in(c);
        true
    }

    fn shift_in(&mut self, c: u8) {
        let len = self.len();
        self.buf.copy_within(self.cur..len, self.cur + 1);
        self.buf[self.cur] = c;
        self.cur += 1;
    }

    /// Delete left of the cursor. Returns the bytes shifted left, `None` at
    /// the start of the line.
    pub fn delete_left(&mut self) -> Option<&[u8]> {
        if self.cur == 0 {
            return None;
        }
        let len = self.len();
        self.buf.copy_within(self.cur..len, self.cur - 1);
        self.cur -= 1;
        Some(self.tail())
    }

    /// Move the cursor left. Refused if it would leave the line.
    pub fn move_left(&mut self, n: usize) -> bool {
        if n > self.cur {
            return false;
        }
        self.cur -= n;
        self.end += n;
        true
    }

    /// Move the cursor right. Refused if it would leave the line.
    pub fn move_right(&mut self, n: usize) -> bool {
        if n > self.end {
            return false;
        }
        self.cur += n;
        self.end -= n;
        true
    }

    pub fn clear(&mut self) {
        self.cur = 0;
        self.end = 0;
    }
}

impl<const N: usize> Default for EditLine<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape sequence parser state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeState {
    Idle,
    /// Got ESC.
    SawEsc,
    /// Got `ESC [`, next byte is a digit or the command.
    AnsiFirst,
    /// Accumulating the first parameter.
    AnsiValue { val: u32 },
    /// Accumulating the parameter after `;`.
    AnsiSecond { val: u32, val2: u32 },
}

/// What the caller should do after a byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    /// Byte absorbed.
    Consumed,
    /// Line complete; hand `line()` to the line logic.
    Flush,
}

/// Interactive line editor.
pub struct LineEditor<const N: usize = MAX_LINE> {
    line: EditLine<N>,
    escape: EscapeState,
    /// Bytes before this index have been echoed.
    printed: usize,
}

impl<const N: usize> LineEditor<N> {
    pub const fn new() -> Self {
        Self {
            line: EditLine::new(),
            escape: EscapeState::Idle,
            printed: 0,
        }
    }

    #[inline]
    pub fn line(&self) -> &EditLine<N> {
        &self.line
    }

    #[inline]
    pub fn escape_state(&self) -> EscapeState {
        self.escape
    }

    /// Process one input byte.
    pub fn feed(&mut self, byte: u8, echo: bool, term: &mut dyn Terminal) -> Feed {
        match self.escape {
            EscapeState::Idle => {}
            EscapeState::SawEsc => {
                self.escape = if byte == b'[' {
                    EscapeState::AnsiFirst
                } else {
                    EscapeState::Idle
                };
                return Feed::Consumed;
            }
            _ => {
                self.handle_ansi(byte, echo, term);
                return Feed::Consumed;
            }
        }

        match byte {
            ASCII_DEL | ASCII_BKSP => {
                self.flush_echo(echo, term);
                if let Some(tail) = self.line.delete_left() {
                    if echo {
                        term.send(b"\x08");
                        if tail.is_empty() {
                            term.send(b" \x08");
                        } else {
                            term.send(CURSOR_SAVE);
                            term.send(tail);
                            term.send(b" ");
                            term.send(CURSOR_RESTORE);
                        }
                    }
                }
                self.printed = self.line.cursor();
                Feed::Consumed
            }
            ASCII_ESC => {
                self.escape = EscapeState::SawEsc;
                Feed::Consumed
            }
            ASCII_CR | ASCII_IF => Feed::Flush,
            ASCII_TAB => {
                self.flush_echo(echo, term);
                if echo {
                    term.send(b"\t");
                }
                Feed::Flush
            }
            0x00..=0x1F => {
                rt_debug!(TASK_LOG_STREAM, "<CTRL> {}", byte);
                if !self.line.push_control(byte) {
                    rt_debug!(TASK_LOG_STREAM, "line full, control byte {} dropped", byte);
                }
                Feed::Flush
            }
            _ => {
                let mid_line = self.line.tail_len() > 0;
                if mid_line {
                    self.flush_echo(echo, term);
                }
                match self.line.insert(byte) {
                    Some(tail) if mid_line => {
                        if echo {
                            term.send(&[byte]);
                            term.send(CURSOR_SAVE);
                            term.send(tail);
                            term.send(CURSOR_RESTORE);
                        }
                        self.printed = self.line.cursor();
                    }
                    Some(_) => {}
                    None => rt_debug!(TASK_LOG_STREAM, "line full"),
                }
                Feed::Consumed
            }
        }
    }

    fn handle_ansi(&mut self, byte: u8, echo: bool, term: &mut dyn Terminal) {
        let digit = byte.is_ascii_digit().then(|| (byte - b'0') as u32);

        let val = match (self.escape, digit) {
            (EscapeState::AnsiFirst, Some(d)) => {
                self.escape = EscapeState::AnsiValue { val: d };
                return;
            }
            (EscapeState::AnsiFirst, None) => 1,
            (EscapeState::AnsiValue { val }, Some(d)) => {
                self.escape = EscapeState::AnsiValue {
                    val: val.saturating_mul(10).saturating_add(d),
                };
                return;
            }
            (EscapeState::AnsiValue { val }, None) if byte == b';' => {
                self.escape = EscapeState::AnsiSecond { val, val2: 0 };
                return;
            }
            (EscapeState::AnsiValue { val }, None) => val,
            (EscapeState::AnsiSecond { val, val2 }, Some(d)) => {
                self.escape = EscapeState::AnsiSecond {
                    val,
                    val2: val2.saturating_mul(10).saturating_add(d),
                };
                return;
            }
            (EscapeState::AnsiSecond { val, .. }, None) => val,
            (EscapeState::Idle | EscapeState::SawEsc, _) => return,
        };
        self.escape = EscapeState::Idle;

        let n = val as usize;
        let (moved, seq) = match byte {
            b'D' => {
                self.flush_echo(echo, term);
                (self.line.move_left(n), CURSOR_BACKWARD)
            }
            b'C' => {
                self.flush_echo(echo, term);
                (self.line.move_right(n), CURSOR_FORWARD)
            }
            _ => return,
        };
        if moved {
            if echo {
                for _ in 0..n {
                    term.send(seq);
                }
            }
            self.printed = self.line.cursor();
        }
    }

    /// Echo input not yet echoed.
    pub fn flush_echo(&mut self, echo: bool, term: &mut dyn Terminal) {
        let pending = self.line.before_cursor(self.printed);
        if echo && !pending.is_empty() {
            term.send(pending);
        }
        self.printed = self.line.cursor();
    }

    /// Finish the echo of a completed line and return it for dispatch.
    pub fn take_line(&mut self, echo: bool, term: &mut dyn Terminal) -> &mut [u8] {
        self.flush_echo(echo, term);
        if echo {
            term.send(b"\r\n");
        }
        self.line.as_mut_bytes()
    }

    /// Start a new line.
    pub fn reset(&mut self) {
        self.line.clear();
        self.printed = 0;
    }
}

impl<const N: usize> Default for LineEditor<N> {
    fn default() -> Self {
        Self::new()
    }
}
