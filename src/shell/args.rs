//! Command line tokenizing
//!
//! Tokens are separated by spaces only. Every scan is bounded twice: by the
//! caller's size bound and by the first NUL byte, whichever comes first.

/// The part of `line` a scan may look at.
#[inline]
fn bounded(line: &[u8], bound: usize) -> &[u8] {
    let line = &line[..bound.min(line.len())];
    cstr(line)
}

/// Bytes up to (not including) the first NUL.
#[inline]
pub fn cstr(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

/// `cstr` as text. Non-UTF-8 input reads as empty.
#[inline]
pub fn as_str(buf: &[u8]) -> &str {
    core::str::from_utf8(cstr(buf)).unwrap_or("")
}

/// Iterator over the tokens in a bounded line.
pub struct Tokens<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let start = self.rest.iter().position(|&b| b != b' ')?;
        let rest = &self.rest[start..];
        let len = rest.iter().position(|&b| b == b' ').unwrap_or(rest.len());
        self.rest = &rest[len..];
        Some(&rest[..len])
    }
}

/// Tokens within the first `bound` bytes of `line`.
pub fn tokens(line: &[u8], bound: usize) -> Tokens<'_> {
    Tokens {
        rest: bounded(line, bound),
    }
}

/// Count tokens without copying.
pub fn argc(line: &[u8], bound: usize) -> usize {
    tokens(line, bound).count()
}

/// Copy the next token of `line[..bound]` into `dest`.
///
/// The copy is truncated to `dest.len() - 1` bytes and NUL-terminated.
/// Returns the copied length and the unscanned remainder, which is empty
/// once the line is exhausted.
pub fn next_arg<'a>(line: &'a [u8], bound: usize, dest: &mut [u8]) -> (usize, &'a [u8]) {
    let line = bounded(line, bound);
    let Some(start) = line.iter().position(|&b| b != b' ') else {
        if let Some(first) = dest.first_mut() {
            *first = 0;
        }
        return (0, &line[line.len()..]);
    };

    let rest = &line[start..];
    let token_len = rest.iter().position(|&b| b == b' ').unwrap_or(rest.len());
    let copy = token_len.min(dest.len().saturating_sub(1));
    dest[..copy].copy_from_slice(&rest[..copy]);
    if let Some(term) = dest.get_mut(copy) {
        *term = 0;
    }
    (copy, &rest[token_len..])
}

/// Index of the first non-space byte, `None` if the line is blank.
pub fn skip_spaces(buf: &[u8]) -> Option<usize> {
    cstr(buf).iter().position(|&b| b != b' ')
}

/// Split off the first token in place.
///
/// The space ending the first token is overwritten with NUL. Returns the
/// index of the next token, or `None` when nothing follows.
pub fn token_arg(buf: &mut [u8]) -> Option<usize> {
    let start = skip_spaces(buf)?;
    let end = cstr(buf).len();
    let sep = start + buf[start..end].iter().position(|&b| b == b' ')?;
    buf[sep] = 0;
    let next = sep + 1;
    skip_spaces(&buf[next..]).map(|i| next + i)
}

/// Whether `-<flag>` appears in `buf`.
///
/// A flag group starts with `-` right after a space (or at the start) and
/// runs to the next space, so `-nv` holds both `n` and `v` while `a-v`
/// holds nothing.
pub fn check_parameter(buf: &[u8], flag: u8) -> bool {
    let mut after_space = true;
    let mut in_flags = false;

    for &byte in cstr(buf) {
        if after_space && byte == b'-' {
            in_flags = true;
        }
        if byte == b' ' {
            after_space = true;
            in_flags = false;
        } else {
            after_space = false;
        }
        if in_flags && byte == flag {
            return true;
        }
    }
    false
}
