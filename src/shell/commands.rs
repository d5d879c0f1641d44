//! Command table and handlers

use crate::fs::{DirEntry, EntryKind, FileHandle, FileSystem, OpenMode, MAX_PATH};
use crate::log_globals::TASK_LOG_STREAM;
use crate::services::{Services, TermWriter, Terminal};
use crate::{rt_info, term_print};

use super::args::{argc, check_parameter, cstr, skip_spaces, token_arg, tokens};
use super::error::{CommandResult, ShellError};
use super::files::{file_arg, valid_filename, write_boot_cfg};
use super::flags::*;
use super::{Capture, ShellState};

/// Signature every command implements. `args` is the rest of the line
/// after the command name, `None` when nothing follows it.
pub type CommandHandler =
    fn(&mut ShellState, Option<&[u8]>, &mut Services<'_>) -> Result<CommandResult, ShellError>;

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    /// Argument synopsis shown by `help`.
    pub args: &'static str,
    /// Help text; empty hides the command from `help`.
    pub brief: &'static str,
    pub handler: CommandHandler,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", args: "", brief: "Display this help information", handler: cmd_help },
    CommandDescriptor { name: "eval", args: "", brief: "Evaluate JavaScript in real time", handler: cmd_eval },
    CommandDescriptor { name: "load", args: "FILE", brief: "Save the input text into a file", handler: cmd_load },
    CommandDescriptor { name: "run", args: "FILE", brief: "Run the JavaScript program in the file", handler: cmd_run },
    CommandDescriptor { name: "parse", args: "FILE", brief: "Check if the JS syntax is correct", handler: cmd_parse },
    CommandDescriptor { name: "stop", args: "", brief: "Stop current JavaScript execution", handler: cmd_stop },
    CommandDescriptor { name: "ls", args: "", brief: "List all files", handler: cmd_ls },
    CommandDescriptor { name: "cat", args: "FILE", brief: "Print the contents of a file", handler: cmd_cat },
    CommandDescriptor { name: "du", args: "FILE", brief: "Estimate file space usage", handler: cmd_du },
    CommandDescriptor { name: "rm", args: "FILE", brief: "Remove file or directory", handler: cmd_rm },
    CommandDescriptor { name: "mv", args: "F1 F2", brief: "Move file F1 to destination F2", handler: cmd_mv },
    CommandDescriptor { name: "clear", args: "", brief: "Clear the terminal screen", handler: cmd_clear },
    CommandDescriptor { name: "boot", args: "FILE", brief: "Set the file that should run at boot", handler: cmd_boot },
    CommandDescriptor { name: "reboot", args: "", brief: "Reboot the device", handler: cmd_reboot },
    // Used by the IDE, not listed
    CommandDescriptor { name: "echo", args: "on/off", brief: "", handler: cmd_echo },
    CommandDescriptor { name: "set", args: "", brief: "", handler: cmd_set },
    CommandDescriptor { name: "get", args: "", brief: "", handler: cmd_get },
    CommandDescriptor { name: "ping", args: "", brief: "", handler: cmd_ping },
    CommandDescriptor { name: "at", args: "", brief: "", handler: cmd_at },
    CommandDescriptor { name: "stat", args: "", brief: "", handler: cmd_stat },
];

/// Bytes `cat` reads per call.
const READ_CHUNK: usize = 80;

/// Run one command line.
///
/// The line is tokenized in place. Handler errors are printed here and
/// reported as [`CommandResult::Error`].
pub fn dispatch(state: &mut ShellState, line: &mut [u8], svc: &mut Services<'_>) -> CommandResult {
    if argc(line, line.len()) == 0 {
        return CommandResult::Ok;
    }
    let Some(start) = skip_spaces(line) else {
        return CommandResult::Ok;
    };

    let line = &mut line[start..];
    let next = token_arg(line);
    let line: &[u8] = line;
    let name = cstr(line);
    let args = next.map(|i| &line[i..]);

    if state.ihex() {
        svc.term.print("[BCMD]\n");
    }

    let Some(cmd) = COMMANDS.iter().find(|c| c.name.as_bytes() == name) else {
        if state.ihex() {
            svc.term.print("[ERRCMD]\n");
        } else {
            svc.term.send(name);
            svc.term.print(": command not found. \r\n");
            svc.term.print("Type 'help' for available commands.\r\n");
        }
        return CommandResult::Unknown;
    };

    let result = (cmd.handler)(state, args, svc).unwrap_or_else(|e| {
        svc.term.print(e.message());
        CommandResult::Error
    });

    // Checked after the handler: `set transfer ihex` closes its own bracket.
    if state.ihex() {
        svc.term.print("[ECMD]\n");
    }
    result
}

/// The `help` text.
pub fn print_help(term: &mut dyn Terminal) {
    term.print("Welcome to the ZJS 'A Shell' interface!\r\n\r\n");
    term.print("Command list:\r\n");
    for cmd in COMMANDS.iter().filter(|c| !c.brief.is_empty()) {
        term_print!(term, " {}\t{}\t{}\r\n", cmd.name, cmd.args, cmd.brief);
    }
}

/// The `n`th token of `args`.
fn arg(args: Option<&[u8]>, n: usize) -> Option<&[u8]> {
    let args = args?;
    tokens(args, args.len()).nth(n)
}

// --- Command Implementations ---

fn cmd_help(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    print_help(&mut *svc.term);
    Ok(CommandResult::Ok)
}

fn cmd_eval(
    state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    state.mode.insert(ShellMode::EVAL_JAVASCRIPT);
    svc.term.print(ANSI_CLEAR);
    svc.term.print(MSG_IMMEDIATE_MODE);
    state.set_prompt(Some(EVAL_PROMPT));
    Ok(CommandResult::Ok)
}

fn cmd_load(
    state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    // The HEX uploader takes over the link
    if state.ihex() {
        state.done = true;
        return Ok(CommandResult::Ok);
    }

    let name = file_arg(args, 0)?;
    if !valid_filename(&name) {
        return Err(ShellError::InvalidFileName);
    }
    if !state.mode.contains(ShellMode::TRANSFER_RAW) {
        return Ok(CommandResult::Ok);
    }

    let fh = svc.fs.open(&name, OpenMode::Write)?;
    if state.echo {
        svc.term.print(ANSI_CLEAR);
        term_print!(svc.term, "Saving to '{}'\r\n", name.as_str());
        svc.term.print(READY_FOR_RAW_DATA);
        state.set_prompt(Some(RAW_PROMPT));
    }

    state.mode.insert(ShellMode::CAPTURE_RAW);
    state.capture = Some(Capture { fh, name });
    Ok(CommandResult::Ok)
}

fn cmd_run(
    state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let name = file_arg(args, 0)?;
    if state.ihex() {
        svc.term.print("[RUN]\n");
    }
    svc.js.run(&name, &mut *svc.term);
    Ok(CommandResult::Ok)
}

fn cmd_parse(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let name = file_arg(args, 0)?;
    svc.js.parse(&name, &mut *svc.term);
    Ok(CommandResult::Ok)
}

fn cmd_stop(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    svc.js.stop();
    Ok(CommandResult::Ok)
}

fn cmd_ls(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let target = match file_arg(args, 0) {
        Ok(name) => Some(name),
        Err(ShellError::NotEnoughArguments) => None,
        Err(e) => return Err(e),
    };

    if let Some(name) = &target {
        match svc.fs.stat(name) {
            Ok(entry) if !entry.is_dir() => {
                term_print!(svc.term, "{:5} {}\n", entry.size, name.as_str());
                return Ok(CommandResult::Ok);
            }
            Ok(_) => {}
            Err(_) => {
                term_print!(
                    svc.term,
                    "ls: cannot access {}: no such file or directory\n",
                    name.as_str()
                );
                return Ok(CommandResult::Error);
            }
        }
    }

    let path = target.as_ref().map(|n| n.as_str()).unwrap_or("");
    let term = &mut *svc.term;
    let listed = svc.fs.read_dir(path, &mut |entry: &DirEntry| match entry.kind {
        EntryKind::Dir => {
            term.print(ANSI_FG_LIGHT_BLUE);
            term.print(&entry.name);
            term.print("\n");
            term.print(ANSI_FG_RESTORE);
        }
        EntryKind::File => {
            let mut lower = [0u8; MAX_PATH];
            let name = entry.name.as_bytes();
            let lower = &mut lower[..name.len()];
            lower.copy_from_slice(name);
            lower.make_ascii_lowercase();

            term_print!(term, "{}\t", entry.size);
            term.send(lower);
            term.print("\r\n");
        }
    });

    if let Err(e) = listed {
        term_print!(svc.term, "Error opening dir [{}]\n", e.code());
        return Ok(CommandResult::Error);
    }
    Ok(CommandResult::Ok)
}

fn cmd_cat(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let show_hidden = args.is_some_and(|a| check_parameter(a, b'v'));
    let numbered = args.is_some_and(|a| check_parameter(a, b'n'));
    let name = file_arg(args, 0)?;

    let fh = svc.fs.open(&name, OpenMode::Read).map_err(|_| ShellError::FileNotFound)?;
    let result = print_file(&mut *svc.fs, fh, &mut *svc.term, show_hidden, numbered);
    let _ = svc.fs.close(fh);
    result
}

fn print_file(
    fs: &mut dyn FileSystem,
    fh: FileHandle,
    term: &mut dyn Terminal,
    show_hidden: bool,
    numbered: bool,
) -> Result<CommandResult, ShellError> {
    if fs.size(fh)? == 0 {
        term.print("Empty file\r\n");
        return Ok(CommandResult::Ok);
    }

    let mut line = 1u32;
    if numbered {
        term_print!(term, "{:5}  ", line);
    }

    let mut data = [0u8; READ_CHUNK];
    loop {
        let count = fs.read(fh, &mut data)?;
        if count == 0 {
            break;
        }

        let chunk = &data[..count];
        let mut start = 0;
        for (i, &byte) in chunk.iter().enumerate() {
            let newline = byte == ASCII_IF || byte == ASCII_CR;
            let hidden = show_hidden && !newline && !(0x20..0x7F).contains(&byte);
            if !newline && !hidden {
                continue;
            }

            term.send(&chunk[start..i]);
            start = i + 1;
            if newline {
                term.print("\r\n");
                if numbered {
                    line += 1;
                    term_print!(term, "{:5}  ", line);
                }
            } else {
                term_print!(term, "({:x})", byte);
            }
        }
        term.send(&chunk[start..]);
    }

    term.print("\r\n");
    Ok(CommandResult::Ok)
}

fn cmd_du(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let name = file_arg(args, 0)?;
    let fh = svc.fs.open(&name, OpenMode::Read).map_err(|_| ShellError::FileNotFound)?;
    let size = svc.fs.size(fh);
    let _ = svc.fs.close(fh);

    term_print!(svc.term, "{:5} {}\n", size?, name.as_str());
    Ok(CommandResult::Ok)
}

fn cmd_rm(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let name = file_arg(args, 0)?;
    match svc.fs.remove(&name) {
        Ok(()) => Ok(CommandResult::Ok),
        Err(e) => {
            term_print!(svc.term, "rm: cannot remove '{}': {}\n", name.as_str(), e.code());
            Ok(CommandResult::Error)
        }
    }
}

fn cmd_mv(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let from = file_arg(args, 0)?;
    if svc.fs.stat(&from).is_err() {
        term_print!(
            svc.term,
            "mv: cannot access '{}' no such file or directory\n",
            from.as_str()
        );
        return Ok(CommandResult::Error);
    }

    let to = file_arg(args, 1)?;
    if svc.fs.stat(&to).is_ok() {
        term_print!(svc.term, "mv: cannot access '{}' file already exists\n", to.as_str());
        return Ok(CommandResult::Error);
    }
    if !valid_filename(&to) {
        return Err(ShellError::InvalidFileName);
    }

    svc.fs.rename(&from, &to)?;
    Ok(CommandResult::Ok)
}

fn cmd_clear(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    svc.term.print(ANSI_CLEAR);
    Ok(CommandResult::Ok)
}

fn cmd_boot(
    _state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let name = file_arg(args, 0)?;
    write_boot_cfg(&mut *svc.fs, &name)?;
    rt_info!(TASK_LOG_STREAM, "boot.cfg now runs {}", name.as_str());
    Ok(CommandResult::Ok)
}

fn cmd_reboot(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    svc.board.reboot();
    Ok(CommandResult::Ok)
}

fn cmd_echo(
    state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    match arg(args, 0) {
        Some(b"on") => {
            svc.term.print("echo_on");
            state.echo = true;
        }
        Some(b"off") => {
            svc.term.print("echo_off");
            state.echo = false;
        }
        _ => {}
    }
    Ok(CommandResult::Ok)
}

fn cmd_set(
    state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let key = arg(args, 0).ok_or(ShellError::NotEnoughArguments)?;
    if key != b"transfer" {
        return Ok(CommandResult::Unknown);
    }

    let value = arg(args, 1).ok_or(ShellError::NotEnoughArguments)?;
    svc.term.send(value);
    svc.term.print("\r\n");

    match value {
        b"raw" => {
            state.set_prompt(None);
            state.mode.insert(ShellMode::TRANSFER_RAW);
            state.mode.remove(ShellMode::TRANSFER_IHEX);
            Ok(CommandResult::Ok)
        }
        b"ihex" => {
            state.set_prompt(Some(HEX_PROMPT));
            state.mode.insert(ShellMode::TRANSFER_IHEX);
            state.mode.remove(ShellMode::TRANSFER_RAW);
            Ok(CommandResult::Ok)
        }
        _ => Ok(CommandResult::Unknown),
    }
}

fn cmd_get(
    state: &mut ShellState,
    args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let key = arg(args, 0).ok_or(ShellError::NotEnoughArguments)?;
    if key != b"transfer" {
        return Ok(CommandResult::Unknown);
    }

    if state.mode.contains(ShellMode::TRANSFER_RAW) {
        svc.term.print("Raw\r\n");
    }
    if state.mode.contains(ShellMode::TRANSFER_IHEX) {
        svc.term.print("Ihex\r\n");
    }
    Ok(CommandResult::Ok)
}

fn cmd_ping(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    svc.term.print("[PONG]\r\n");
    Ok(CommandResult::Ok)
}

fn cmd_at(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    svc.term.print("OK\r\n\r\n");
    Ok(CommandResult::Ok)
}

fn cmd_stat(
    _state: &mut ShellState,
    _args: Option<&[u8]>,
    svc: &mut Services<'_>,
) -> Result<CommandResult, ShellError> {
    let Some(status) = svc.status else {
        return Ok(CommandResult::Error);
    };
    let _ = status.write_report(&mut TermWriter(&mut *svc.term));
    Ok(CommandResult::Ok)
}
