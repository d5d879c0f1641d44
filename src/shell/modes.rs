//! Line modes entered by `load` (raw capture) and `eval`.

use crate::fs::FsError;
use crate::log_globals::TASK_LOG_STREAM;
use crate::services::Services;
use crate::{rt_info, rt_warn};

use super::args::cstr;
use super::error::{CommandResult, ShellError};
use super::flags::*;
use super::ShellState;

/// Bytes stored verbatim by raw capture.
#[inline]
fn is_data(byte: u8) -> bool {
    byte >= 0x20 && byte != ASCII_DEL
}

/// Leave raw capture. An aborted capture removes the partial file.
fn end_capture(state: &mut ShellState, svc: &mut Services<'_>, keep: bool) {
    state.mode.remove(ShellMode::CAPTURE_RAW);
    state.set_prompt(None);

    let Some(capture) = state.capture.take() else {
        return;
    };
    let _ = svc.fs.close(capture.fh);
    if keep {
        rt_info!(TASK_LOG_STREAM, "saved {}", capture.name.as_str());
    } else if svc.fs.remove(&capture.name).is_err() {
        rt_warn!(TASK_LOG_STREAM, "could not discard {}", capture.name.as_str());
    }
}

/// One line of `load` input.
///
/// Printable bytes go to the file, each line ends with `\n`. Ctrl+Z or
/// Ctrl+D saves, Ctrl+X or Ctrl+C aborts.
pub(super) fn capture_line(
    state: &mut ShellState,
    line: &[u8],
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let Some(fh) = state.capture.as_ref().map(|c| c.fh) else {
        state.mode.remove(ShellMode::CAPTURE_RAW);
        return Err(ShellError::Fs(FsError::BadHandle));
    };

    let line = cstr(line);
    let mut start = 0;
    for (i, &byte) in line.iter().enumerate() {
        if is_data(byte) {
            continue;
        }

        write_all(svc, fh, &line[start..i])?;
        start = i + 1;

        match byte {
            ASCII_END_OF_TRANS | ASCII_SUBSTITUTE => {
                svc.term.print(MSG_FILE_SAVED);
                end_capture(state, svc, true);
                return Ok(CommandResult::Ok);
            }
            ASCII_END_OF_TEXT | ASCII_CANCEL => {
                svc.term.print(MSG_FILE_ABORTED);
                end_capture(state, svc, false);
                return Ok(CommandResult::Ok);
            }
            ASCII_CR | ASCII_IF => svc.term.print("\r\n"),
            other => svc.term.send(&[other]),
        }
    }
    write_all(svc, fh, &line[start..])?;
    write_all(svc, fh, b"\n")?;

    Ok(CommandResult::OkNoPrompt)
}

fn write_all(svc: &mut Services<'_>, fh: crate::fs::FileHandle, data: &[u8]) -> Result<(), ShellError> {
    if data.is_empty() {
        return Ok(());
    }
    if svc.fs.write(fh, data)? < data.len() {
        return Err(ShellError::Fs(FsError::NoSpace));
    }
    Ok(())
}

/// One line of `eval` input.
pub(super) fn eval_line(
    state: &mut ShellState,
    line: &[u8],
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let line = cstr(line);
    let leave = line.iter().any(|&b| {
        matches!(
            b,
            ASCII_END_OF_TRANS | ASCII_SUBSTITUTE | ASCII_END_OF_TEXT | ASCII_CANCEL
        )
    });

    if leave {
        svc.term.print(MSG_EXIT);
        state.mode.remove(ShellMode::EVAL_JAVASCRIPT);
        state.set_prompt(None);
        return Ok(CommandResult::Ok);
    }

    svc.js.eval(line, &mut *svc.term);
    Ok(CommandResult::Ok)
}
