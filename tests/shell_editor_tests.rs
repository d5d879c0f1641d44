//! Line editor tests

mod common;

use common::Recorder;
use zjs_ashell::shell::{EditLine, EscapeState, Feed, LineEditor};

fn type_line<const N: usize>(ed: &mut LineEditor<N>, input: &[u8], term: &mut Recorder) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    for &b in input {
        if ed.feed(b, true, term) == Feed::Flush {
            lines.push(ed.take_line(true, term).to_vec());
            ed.reset();
        }
    }
    ed.flush_echo(true, term);
    lines
}

#[test]
fn test_cr_ends_line_without_storing_it() {
    let mut ed = LineEditor::<32>::new();
    let mut term = Recorder::new();
    let lines = type_line(&mut ed, b"ls\r", &mut term);
    assert_eq!(lines, [b"ls".to_vec()]);
    assert_eq!(term.out, b"ls\r\n");
}

#[test]
fn test_crlf_gives_one_empty_line() {
    let mut ed = LineEditor::<32>::new();
    let mut term = Recorder::new();
    let lines = type_line(&mut ed, b"a\r\n", &mut term);
    assert_eq!(lines, [b"a".to_vec(), Vec::new()]);
}

#[test]
fn test_echo_off_is_silent() {
    let mut ed = LineEditor::<32>::new();
    let mut term = Recorder::new();
    for &b in b"ab\x7fc" {
        ed.feed(b, false, &mut term);
    }
    assert_eq!(ed.take_line(false, &mut term), b"ac");
    assert!(term.out.is_empty());
}

#[test]
fn test_edit_in_the_middle() {
    let mut ed = LineEditor::<32>::new();
    let mut term = Recorder::new();
    // "helo", two left, insert 'l', two right, enter
    let lines = type_line(&mut ed, b"helo\x1b[2Dl\x1b[2C\r", &mut term);
    assert_eq!(lines, [b"hello".to_vec()]);
}

#[test]
fn test_delete_in_the_middle_redraws_tail() {
    let mut ed = LineEditor::<32>::new();
    let mut term = Recorder::new();
    type_line(&mut ed, b"abc\x1b[D\x7f", &mut term);
    assert_eq!(ed.line().as_bytes(), b"ac");
    assert!(term.out.ends_with(b"\x08\x1b[sc \x1b[u"));
}

#[test]
fn test_escape_split_across_feeds() {
    let mut ed = LineEditor::<32>::new();
    let mut term = Recorder::new();
    type_line(&mut ed, b"xy\x1b", &mut term);
    assert_eq!(ed.escape_state(), EscapeState::SawEsc);
    type_line(&mut ed, b"[", &mut term);
    assert_eq!(ed.escape_state(), EscapeState::AnsiFirst);
    type_line(&mut ed, b"D", &mut term);
    assert_eq!(ed.escape_state(), EscapeState::Idle);
    assert_eq!(ed.line().cursor(), 1);
}

#[test]
fn test_overlong_line_keeps_room_for_terminator() {
    let mut ed = LineEditor::<8>::new();
    let mut term = Recorder::new();
    for &b in b"abcdefghij" {
        assert_eq!(ed.feed(b, true, &mut term), Feed::Consumed);
    }
    assert_eq!(ed.line().len(), 7);
    assert_eq!(ed.feed(0x1A, true, &mut term), Feed::Flush);
    assert_eq!(ed.line().as_bytes(), b"abcdefg\x1a");
}

#[test]
fn test_edit_line_cursor_bookkeeping() {
    let mut line = EditLine::<16>::new();
    for &c in b"abc" {
        line.insert(c);
    }
    assert!(line.move_left(3));
    assert_eq!((line.cursor(), line.tail_len()), (0, 3));
    assert_eq!(line.delete_left(), None);
    assert_eq!(line.insert(b'>'), Some(&b"abc"[..]));
    assert_eq!(line.as_bytes(), b">abc");
    line.clear();
    assert!(line.is_empty());
}
