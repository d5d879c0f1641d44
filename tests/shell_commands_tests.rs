//! Command dispatcher tests

mod common;

use common::{BoardSpy, JsSpy, Recorder};
use zjs_ashell::config::BUILD_TIMESTAMP;
use zjs_ashell::hal::RamFs;
use zjs_ashell::shell::{dispatch, CommandResult, ShellError, ShellMode, ShellState, COMMANDS};
use zjs_ashell::Services;

struct Rig {
    term: Recorder,
    fs: RamFs<8, 512>,
    js: JsSpy,
    board: BoardSpy,
    state: ShellState,
}

impl Rig {
    fn new() -> Self {
        Self {
            term: Recorder::new(),
            fs: RamFs::new(),
            js: JsSpy::default(),
            board: BoardSpy::default(),
            state: ShellState::new(),
        }
    }

    fn exec(&mut self, line: &str) -> CommandResult {
        let mut buf = line.as_bytes().to_vec();
        let mut svc = Services::new(&mut self.term, &mut self.fs, &mut self.js, &mut self.board);
        dispatch(&mut self.state, &mut buf, &mut svc)
    }

    fn output(&mut self) -> String {
        let text = self.term.text();
        self.term.clear();
        text
    }
}

#[test]
fn test_registry_has_all_commands() {
    let expected = [
        "help", "eval", "load", "run", "parse", "stop", "ls", "cat", "du", "rm", "mv", "clear",
        "boot", "reboot", "echo", "set", "get", "ping", "at", "stat",
    ];
    for name in expected {
        assert!(
            COMMANDS.iter().any(|c| c.name == name),
            "Command '{}' should be in registry",
            name
        );
    }
}

#[test]
fn test_blank_line_is_ok_and_silent() {
    let mut rig = Rig::new();
    assert_eq!(rig.exec("   "), CommandResult::Ok);
    assert_eq!(rig.exec(""), CommandResult::Ok);
    assert!(rig.output().is_empty());
}

#[test]
fn test_ls_lists_without_markers() {
    let mut rig = Rig::new();
    rig.fs.insert("MAIN.JS", b"abc").unwrap();
    rig.fs.mkdir("lib").unwrap();

    assert_eq!(rig.exec("ls"), CommandResult::Ok);
    let out = rig.output();
    assert!(out.contains("3\tmain.js\r\n"), "{:?}", out);
    assert!(out.contains("\x1b[34;1mlib\n\x1b[39;0m"), "{:?}", out);
    assert!(!out.contains("[BCMD]"));
    assert!(!out.contains("[ECMD]"));
}

#[test]
fn test_ls_file_and_missing_target() {
    let mut rig = Rig::new();
    rig.fs.insert("a.js", b"12345").unwrap();

    assert_eq!(rig.exec("ls a.js"), CommandResult::Ok);
    assert_eq!(rig.output(), "    5 a.js\n");

    assert_eq!(rig.exec("ls nope"), CommandResult::Error);
    assert_eq!(rig.output(), "ls: cannot access nope: no such file or directory\n");
}

#[test]
fn test_unknown_command_in_ihex_mode_is_markers_only() {
    let mut rig = Rig::new();
    rig.exec("set transfer ihex");
    rig.output();

    assert_eq!(rig.exec("unknown_cmd"), CommandResult::Unknown);
    assert_eq!(rig.output(), "[BCMD]\n[ERRCMD]\n");
}

#[test]
fn test_unknown_command_text() {
    let mut rig = Rig::new();
    assert_eq!(rig.exec("foobar x"), CommandResult::Unknown);
    assert_eq!(
        rig.output(),
        "foobar: command not found. \r\nType 'help' for available commands.\r\n"
    );
}

#[test]
fn test_ihex_mode_brackets_commands() {
    let mut rig = Rig::new();
    assert_eq!(rig.exec("set transfer ihex"), CommandResult::Ok);
    assert_eq!(rig.output(), "ihex\r\n[ECMD]\n");
    assert!(rig.state.mode().contains(ShellMode::TRANSFER_IHEX));
    assert_eq!(rig.state.prompt(), "[HEX]\r\n");

    assert_eq!(rig.exec("ping"), CommandResult::Ok);
    assert_eq!(rig.output(), "[BCMD]\n[PONG]\r\n[ECMD]\n");

    assert_eq!(rig.exec("set transfer raw"), CommandResult::Ok);
    assert_eq!(rig.output(), "[BCMD]\nraw\r\n");
    assert_eq!(rig.state.mode(), ShellMode::TRANSFER_RAW);
}

#[test]
fn test_get_transfer() {
    let mut rig = Rig::new();
    rig.exec("get transfer");
    assert_eq!(rig.output(), "Raw\r\n");
    assert_eq!(rig.exec("get colour"), CommandResult::Unknown);
    assert_eq!(rig.exec("get"), CommandResult::Error);
    assert_eq!(rig.output(), ShellError::NotEnoughArguments.message());
}

#[test]
fn test_help_lists_documented_commands_only() {
    let mut rig = Rig::new();
    rig.exec("help");
    let out = rig.output();
    assert!(out.starts_with("Welcome to the ZJS 'A Shell' interface!\r\n\r\nCommand list:\r\n"));
    assert!(out.contains(" ls\t\tList all files\r\n"));
    assert!(out.contains(" mv\tF1 F2\tMove file F1 to destination F2\r\n"));
    assert!(!out.contains("ping"));
}

#[test]
fn test_cat_numbered() {
    let mut rig = Rig::new();
    rig.fs.insert("a.js", b"a\nb").unwrap();
    assert_eq!(rig.exec("cat -n a.js"), CommandResult::Ok);
    assert_eq!(rig.output(), "    1  a\r\n    2  b\r\n");
    assert_eq!(rig.fs.open_count(), 0);
}

#[test]
fn test_cat_shows_hidden_bytes() {
    let mut rig = Rig::new();
    rig.fs.insert("a.js", b"x\x01y").unwrap();
    rig.exec("cat a.js -v");
    assert_eq!(rig.output(), "x(1)y\r\n");
}

#[test]
fn test_cat_empty_and_missing() {
    let mut rig = Rig::new();
    rig.fs.insert("e.js", b"").unwrap();
    rig.exec("cat e.js");
    assert_eq!(rig.output(), "Empty file\r\n");

    assert_eq!(rig.exec("cat none.js"), CommandResult::Error);
    assert_eq!(rig.output(), "File not found\r\n");

    assert_eq!(rig.exec("cat"), CommandResult::Error);
    assert_eq!(rig.output(), "Not enough arguments\r\n");
}

#[test]
fn test_du_rm_mv_messages() {
    let mut rig = Rig::new();
    rig.fs.insert("a.js", b"abc").unwrap();
    rig.fs.insert("b.js", b"").unwrap();

    rig.exec("du a.js");
    assert_eq!(rig.output(), "    3 a.js\n");

    assert_eq!(rig.exec("rm x.js"), CommandResult::Error);
    assert_eq!(rig.output(), "rm: cannot remove 'x.js': -2\n");

    assert_eq!(rig.exec("mv x.js c.js"), CommandResult::Error);
    assert_eq!(rig.output(), "mv: cannot access 'x.js' no such file or directory\n");

    assert_eq!(rig.exec("mv a.js b.js"), CommandResult::Error);
    assert_eq!(rig.output(), "mv: cannot access 'b.js' file already exists\n");

    assert_eq!(rig.exec("mv a.js toolongname.js"), CommandResult::Error);
    assert_eq!(rig.output(), "Expected file name in 8.3 format.\r\n");

    assert_eq!(rig.exec("mv a.js c.js"), CommandResult::Ok);
    assert_eq!(rig.fs.contents("c.js"), Some(&b"abc"[..]));
    assert_eq!(rig.exec("rm c.js"), CommandResult::Ok);
    assert_eq!(rig.fs.contents("c.js"), None);
}

#[test]
fn test_echo_on_off() {
    let mut rig = Rig::new();
    rig.exec("echo off");
    assert_eq!(rig.output(), "echo_off");
    assert!(!rig.state.echo());
    rig.exec("echo on");
    assert_eq!(rig.output(), "echo_on");
    assert!(rig.state.echo());
}

#[test]
fn test_ping_and_at() {
    let mut rig = Rig::new();
    rig.exec("ping");
    assert_eq!(rig.output(), "[PONG]\r\n");
    rig.exec("at");
    assert_eq!(rig.output(), "OK\r\n\r\n");
}

#[test]
fn test_js_commands_reach_engine() {
    let mut rig = Rig::new();
    rig.exec("run main.js");
    rig.exec("parse lib.js");
    rig.exec("stop");
    assert_eq!(rig.js.runs, ["main.js"]);
    assert_eq!(rig.js.parses, ["lib.js"]);
    assert_eq!(rig.js.stops, 1);

    rig.exec("reboot");
    assert_eq!(rig.board.reboots, 1);
}

#[test]
fn test_boot_writes_stamped_config() {
    let mut rig = Rig::new();
    assert_eq!(rig.exec("boot main.js"), CommandResult::Error);
    assert_eq!(rig.output(), "File passed to cfg doesn't exist\n\r\n");

    rig.fs.insert("main.js", b"1").unwrap();
    assert_eq!(rig.exec("boot main.js"), CommandResult::Ok);
    let cfg = rig.fs.contents("boot.cfg").unwrap().to_vec();
    assert_eq!(cfg, [BUILD_TIMESTAMP.as_bytes(), b"main.js"].concat());
}

#[test]
fn test_load_raw_opens_capture() {
    let mut rig = Rig::new();
    assert_eq!(rig.exec("load bad.name.js"), CommandResult::Error);
    assert_eq!(rig.output(), "Expected file name in 8.3 format.\r\n");

    assert_eq!(rig.exec("load new.js"), CommandResult::Ok);
    assert!(rig.state.mode().contains(ShellMode::CAPTURE_RAW));
    assert_eq!(rig.state.capture_name(), Some("new.js"));
    assert!(rig.output().contains("Saving to 'new.js'\r\n"));
    assert_eq!(rig.state.prompt(), "\x1b[33mRAW> \x1b[39;0m");
    assert_eq!(rig.fs.open_count(), 1);
}

#[test]
fn test_load_in_ihex_mode_hands_over() {
    let mut rig = Rig::new();
    rig.exec("set transfer ihex");
    assert!(!rig.state.is_done());
    rig.exec("load");
    assert!(rig.state.is_done());
    assert_eq!(rig.fs.open_count(), 0);
}

#[test]
fn test_stat_without_snapshot_is_error() {
    let mut rig = Rig::new();
    assert_eq!(rig.exec("stat"), CommandResult::Error);
}
