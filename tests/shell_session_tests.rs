//! Shell session handler tests: line modes, echo control and autorun

mod common;

use common::{BoardSpy, JsSpy, Recorder};
use zjs_ashell::config::BUILD_TIMESTAMP;
use zjs_ashell::hal::RamFs;
use zjs_ashell::shell::flags::{DEFAULT_PROMPT, EVAL_PROMPT, MSG_EXIT, MSG_FILE_ABORTED, MSG_FILE_SAVED};
use zjs_ashell::shell::ShellMode;
use zjs_ashell::{HandlerKind, Services, SessionHandler, Shell};

struct Rig {
    term: Recorder,
    fs: RamFs<8, 512>,
    js: JsSpy,
    board: BoardSpy,
    shell: Shell,
}

impl Rig {
    fn new() -> Self {
        Self {
            term: Recorder::new(),
            fs: RamFs::new(),
            js: JsSpy::default(),
            board: BoardSpy::default(),
            shell: Shell::new(),
        }
    }

    fn init(&mut self) {
        let mut svc = Services::new(&mut self.term, &mut self.fs, &mut self.js, &mut self.board);
        self.shell.init(&mut svc).unwrap();
    }

    fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut svc = Services::new(&mut self.term, &mut self.fs, &mut self.js, &mut self.board);
        self.shell.process(bytes, &mut svc)
    }

    fn output(&mut self) -> String {
        let text = self.term.text();
        self.term.clear();
        text
    }
}

#[test]
fn test_init_prints_prompt() {
    let mut rig = Rig::new();
    rig.init();
    assert_eq!(rig.output(), DEFAULT_PROMPT);
    assert!(!rig.shell.is_done());
}

#[test]
fn test_command_line_echo_and_prompt() {
    let mut rig = Rig::new();
    assert_eq!(rig.feed(b"ping\r"), 5);
    assert_eq!(rig.output(), format!("ping\r\n[PONG]\r\n\r\n{}", DEFAULT_PROMPT));
}

#[test]
fn test_echo_off_line_is_not_echoed() {
    let mut rig = Rig::new();
    rig.feed(b"echo off\n");
    assert_eq!(rig.output(), format!("echo_off\r\n{}", DEFAULT_PROMPT));
    assert!(!rig.shell.state().echo());

    rig.feed(b"at\r");
    assert_eq!(rig.output(), format!("OK\r\n\r\n\r\n{}", DEFAULT_PROMPT));
}

#[test]
fn test_partial_line_is_echoed_at_end_of_buffer() {
    let mut rig = Rig::new();
    assert_eq!(rig.feed(b"pi"), 2);
    assert_eq!(rig.output(), "pi");
    rig.feed(b"ng\r");
    assert!(rig.output().starts_with("ng\r\n[PONG]"));
}

#[test]
fn test_raw_capture_saves_lines() {
    let mut rig = Rig::new();
    rig.feed(b"load app.js\r");
    assert!(rig.shell.state().mode().contains(ShellMode::CAPTURE_RAW));
    rig.output();

    rig.feed(b"var a = 1;\r");
    // Data lines get no prompt
    assert_eq!(rig.output(), "var a = 1;\r\n");
    rig.feed(b"print(a);\r");
    rig.feed(b"\x1a");
    assert!(rig.output().contains(MSG_FILE_SAVED));

    assert!(!rig.shell.state().mode().contains(ShellMode::CAPTURE_RAW));
    assert_eq!(rig.shell.state().capture_name(), None);
    assert_eq!(rig.shell.state().prompt(), DEFAULT_PROMPT);
    assert_eq!(rig.fs.contents("app.js"), Some(&b"var a = 1;\nprint(a);\n"[..]));
    assert_eq!(rig.fs.open_count(), 0);
}

#[test]
fn test_raw_capture_save_on_same_line() {
    let mut rig = Rig::new();
    rig.feed(b"load app.js\r");
    rig.feed(b"x=1\x04");
    assert_eq!(rig.fs.contents("app.js"), Some(&b"x=1"[..]));
    assert_eq!(rig.fs.open_count(), 0);
}

#[test]
fn test_raw_capture_abort_discards_file() {
    let mut rig = Rig::new();
    rig.feed(b"load app.js\r");
    rig.feed(b"partial\r");
    rig.output();
    rig.feed(b"\x18");
    assert!(rig.output().contains(MSG_FILE_ABORTED));
    assert_eq!(rig.fs.contents("app.js"), None);
    assert_eq!(rig.fs.open_count(), 0);
}

#[test]
fn test_eval_mode_round_trip() {
    let mut rig = Rig::new();
    rig.feed(b"eval\r");
    assert!(rig.shell.state().mode().contains(ShellMode::EVAL_JAVASCRIPT));
    assert_eq!(rig.shell.state().prompt(), EVAL_PROMPT);

    rig.feed(b"1 + 1\r");
    assert_eq!(rig.js.evals, [b"1 + 1".to_vec()]);

    rig.output();
    rig.feed(b"\x04");
    assert!(rig.output().contains(MSG_EXIT));
    assert!(!rig.shell.state().mode().contains(ShellMode::EVAL_JAVASCRIPT));
    assert_eq!(rig.shell.state().prompt(), DEFAULT_PROMPT);
}

#[test]
fn test_stops_consuming_when_done() {
    let mut rig = Rig::new();
    rig.feed(b"set transfer ihex\r");
    let input = b"load\r:00000001FF\r\n";
    assert_eq!(rig.feed(input), 5);
    assert!(rig.shell.is_done());

    let mut svc = Services::new(&mut rig.term, &mut rig.fs, &mut rig.js, &mut rig.board);
    assert_eq!(rig.shell.close(&mut svc), HandlerKind::Upload);
    assert!(!rig.shell.is_done());
}

#[test]
fn test_boot_cfg_autorun_once() {
    let mut rig = Rig::new();
    rig.fs.insert("main.js", b"1").unwrap();
    rig.fs
        .insert("boot.cfg", &[BUILD_TIMESTAMP.as_bytes(), b"main.js"].concat())
        .unwrap();

    rig.init();
    rig.init();
    assert_eq!(rig.js.runs, ["main.js"]);
}

#[test]
fn test_stale_boot_cfg_is_removed() {
    let mut rig = Rig::new();
    rig.fs.insert("boot.cfg", b"some other build\nmain.js").unwrap();
    rig.init();
    assert!(rig.js.runs.is_empty());
    assert_eq!(rig.fs.contents("boot.cfg"), None);
}
