//! File name arguments and the boot configuration file.

use crate::config::{BOOT_CFG_FILE, BUILD_TIMESTAMP, MAX_FILENAME_SIZE};
use crate::fs::{FileSystem, OpenMode};

use super::args::{cstr, next_arg, tokens};
use super::error::ShellError;

/// An 8.3 name (at most 12 bytes).
pub type FileName = heapless::String<MAX_FILENAME_SIZE>;

/// The `index`th non-flag token of `args`, truncated to 12 bytes.
///
/// Tokens starting with `-` are options and are skipped.
pub fn file_arg(args: Option<&[u8]>, index: usize) -> Result<FileName, ShellError> {
    let args = cstr(args.unwrap_or(&[]));
    let token = tokens(args, args.len())
        .filter(|t| t.first() != Some(&b'-'))
        .nth(index)
        .ok_or(ShellError::NotEnoughArguments)?;

    let mut dest = [0u8; MAX_FILENAME_SIZE];
    let (len, _) = next_arg(token, token.len(), &mut dest);
    let text = core::str::from_utf8(&dest[..len]).map_err(|_| ShellError::InvalidFileName)?;

    let mut name = FileName::new();
    name.push_str(text).map_err(|_| ShellError::InvalidFileName)?;
    Ok(name)
}

/// `NAME.EXT` with a 1-8 byte name and an optional 1-3 byte extension.
pub fn valid_filename(name: &str) -> bool {
    fn part_ok(part: &str, max: usize) -> bool {
        !part.is_empty()
            && part.len() <= max
            && part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'~'))
    }

    match name.split_once('.') {
        Some((base, ext)) => part_ok(base, 8) && part_ok(ext, 3),
        None => part_ok(name, 8),
    }
}

/// Write `boot.cfg` so `target` runs at the next start of this build.
pub fn write_boot_cfg(fs: &mut dyn FileSystem, target: &str) -> Result<(), ShellError> {
    if !fs.exists(target) {
        return Err(ShellError::BootTargetMissing);
    }

    let fh = fs
        .open(BOOT_CFG_FILE, OpenMode::Write)
        .map_err(|_| ShellError::BootCfgCreate)?;

    let mut written = 0;
    for part in [BUILD_TIMESTAMP.as_bytes(), target.as_bytes()] {
        written += fs.write(fh, part).unwrap_or(0);
    }
    let _ = fs.close(fh);

    if written < BUILD_TIMESTAMP.len() + target.len() {
        return Err(ShellError::BootCfgWrite);
    }
    Ok(())
}

/// File to autorun, if `boot.cfg` was written by this build.
///
/// A `boot.cfg` from another build is stale and gets removed.
pub fn boot_cfg_target(fs: &mut dyn FileSystem) -> Option<FileName> {
    let fh = fs.open(BOOT_CFG_FILE, OpenMode::Read).ok()?;

    let stamp = BUILD_TIMESTAMP.as_bytes();
    let mut buf = [0u8; 64];
    let want = (stamp.len() + MAX_FILENAME_SIZE).min(buf.len());
    let size = fs.size(fh).unwrap_or(0) as usize;

    let mut len = 0;
    while len < want {
        match fs.read(fh, &mut buf[len..want]) {
            Ok(0) | Err(_) => break,
            Ok(n) => len += n,
        }
    }
    let _ = fs.close(fh);

    let current = size > stamp.len() && len > stamp.len() && &buf[..stamp.len()] == stamp;
    if !current {
        let _ = fs.remove(BOOT_CFG_FILE);
        return None;
    }

    let rest = cstr(&buf[stamp.len()..len]);
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    let text = core::str::from_utf8(&rest[..end]).ok()?;

    let mut name = FileName::new();
    name.push_str(text).ok()?;
    Some(name)
}
