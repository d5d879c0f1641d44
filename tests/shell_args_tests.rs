//! Tokenizer tests

use zjs_ashell::shell::args::{argc, as_str, check_parameter, next_arg, skip_spaces, token_arg, tokens};

#[test]
fn test_two_words_count_and_extract() {
    let line = b"hello world";
    assert_eq!(argc(line, line.len() + 1), 2);

    let mut first = [0u8; 16];
    let (len, rest) = next_arg(line, line.len(), &mut first);
    assert_eq!(len, 5);
    assert_eq!(as_str(&first), "hello");

    let mut second = [0u8; 16];
    let (len, rest) = next_arg(rest, rest.len(), &mut second);
    assert_eq!(len, 5);
    assert_eq!(as_str(&second), "world");
    assert!(rest.is_empty());
}

#[test]
fn test_bound_truncates_scan() {
    // One less than the full string: the trailing space is never seen
    assert_eq!(argc(b" test8 ", 8), 1);
    assert_eq!(argc(b" test8 ", 3), 1);
    assert_eq!(argc(b"ab cd", 2), 1);
    assert_eq!(argc(b"ab cd", 0), 0);
}

#[test]
fn test_tokens_skip_repeated_spaces() {
    let collected: Vec<&[u8]> = tokens(b"  mv   a.js  b.js ", 64).collect();
    assert_eq!(collected, [&b"mv"[..], b"a.js", b"b.js"]);
}

#[test]
fn test_token_arg_then_remaining_args() {
    let mut buf = *b"cat -n main.js";
    let next = token_arg(&mut buf).unwrap();
    assert_eq!(as_str(&buf), "cat");
    let args = &buf[next..];
    assert!(check_parameter(args, b'n'));
    assert!(!check_parameter(args, b'v'));
    assert_eq!(argc(args, args.len()), 2);
}

#[test]
fn test_dash_inside_word_is_not_a_flag() {
    assert!(!check_parameter(b"my-very.js", b'v'));
    assert!(check_parameter(b"-nv file", b'v'));
}

/// Every string over `{' ', 'a', 'b', NUL}` up to six bytes long.
fn small_lines() -> Vec<Vec<u8>> {
    const ALPHABET: [u8; 4] = [b' ', b'a', b'b', 0];
    let mut all = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    for _ in 0..6 {
        let mut grown = Vec::new();
        for line in &frontier {
            for &b in &ALPHABET {
                let mut next = line.clone();
                next.push(b);
                grown.push(next);
            }
        }
        all.extend(grown.iter().cloned());
        frontier = grown;
    }
    all
}

/// Space-separated words of `line` before its first NUL.
fn words(line: &[u8]) -> Vec<Vec<u8>> {
    let end = line.iter().position(|&b| b == 0).unwrap_or(line.len());
    line[..end]
        .split(|&b| b == b' ')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_vec())
        .collect()
}

#[test]
fn test_argc_matches_extracted_tokens() {
    let lines = small_lines();
    assert_eq!(lines.len(), 5461);

    for line in &lines {
        for bound in 0..=line.len() + 1 {
            let mut rest: &[u8] = line;
            let mut rest_bound = bound;
            let mut extracted = 0;
            loop {
                let mut dest = [0u8; 16];
                let (len, next) = next_arg(rest, rest_bound, &mut dest);
                if len == 0 {
                    break;
                }
                extracted += 1;
                rest = next;
                rest_bound = next.len();
            }
            assert_eq!(argc(line, bound), extracted, "line {:?} bound {}", line, bound);
        }
    }
}

#[test]
fn test_in_place_split_rejoins_collapsed() {
    for line in small_lines() {
        for bound in 0..=line.len() {
            let mut buf = line[..bound].to_vec();
            buf.push(0);

            let mut parts: Vec<Vec<u8>> = Vec::new();
            let mut pos = 0;
            while let Some(start) = skip_spaces(&buf[pos..]) {
                let next = token_arg(&mut buf[pos..]);
                let token = &buf[pos + start..];
                let len = token.iter().position(|&b| b == 0).unwrap_or(token.len());
                parts.push(token[..len].to_vec());
                match next {
                    Some(i) => pos += i,
                    None => break,
                }
            }

            assert_eq!(parts.join(&b' '), words(&line[..bound]).join(&b' '), "line {:?}", line);
        }
    }
}
