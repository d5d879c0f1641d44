//! RAM-backed filesystem.
//!
//! Flat store of fixed-capacity files with one level of directories
//! (`dir/name`). Used by the host simulator and as the board's scratch
//! filesystem when no flash partition is mounted.

use heapless::Vec;

use crate::fs::{
    path_name, DirEntry, EntryKind, FileHandle, FileSystem, FsError, OpenMode, PathName, SeekFrom,
};

/// Files open at the same time.
const MAX_OPEN: usize = 4;

struct RamFile<const SIZE: usize> {
    name: PathName,
    data: Vec<u8, SIZE>,
}

struct OpenFile {
    handle: u32,
    name: PathName,
    pos: u32,
    mode: OpenMode,
}

/// In-memory filesystem of at most `FILES` files of `SIZE` bytes each.
pub struct RamFs<const FILES: usize = 8, const SIZE: usize = 4096> {
    files: Vec<RamFile<SIZE>, FILES>,
    dirs: Vec<PathName, FILES>,
    open: Vec<OpenFile, MAX_OPEN>,
    next_handle: u32,
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

impl<const FILES: usize, const SIZE: usize> RamFs<FILES, SIZE> {
    pub const fn new() -> Self {
        Self {
            files: Vec::new(),
            dirs: Vec::new(),
            open: Vec::new(),
            next_handle: 1,
        }
    }

    /// Create a directory.
    pub fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        let path = normalize(path);
        if path.is_empty() || path.contains('/') {
            return Err(FsError::InvalidName);
        }
        if self.find(path).is_some() || self.is_dir(path) {
            return Err(FsError::AlreadyExists);
        }
        self.dirs.push(path_name(path)?).map_err(|_| FsError::NoSpace)
    }

    /// Create or replace a file in one step.
    pub fn insert(&mut self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let fh = self.open(path, OpenMode::Write)?;
        let written = self.write(fh, contents);
        self.close(fh)?;
        if written? < contents.len() {
            return Err(FsError::NoSpace);
        }
        Ok(())
    }

    /// File contents, for inspection.
    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        self.find(normalize(path)).map(|i| self.files[i].data.as_slice())
    }

    /// Open handles.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn find(&self, path: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name.as_str() == path)
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.iter().any(|d| d.as_str() == path)
    }

    fn parent_ok(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((dir, _)) => self.is_dir(dir),
            None => true,
        }
    }

    fn slot(&self, fh: FileHandle) -> Result<usize, FsError> {
        self.open
            .iter()
            .position(|o| o.handle == fh.0)
            .ok_or(FsError::BadHandle)
    }

    fn file_of(&self, open: usize) -> Result<usize, FsError> {
        self.find(self.open[open].name.as_str()).ok_or(FsError::Io)
    }
}

impl<const FILES: usize, const SIZE: usize> Default for RamFs<FILES, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const FILES: usize, const SIZE: usize> FileSystem for RamFs<FILES, SIZE> {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError> {
        let path = normalize(path);
        if path.is_empty() || self.is_dir(path) {
            return Err(FsError::InvalidName);
        }
        if self.open.is_full() {
            return Err(FsError::TooManyOpen);
        }

        match (self.find(path), mode) {
            (None, OpenMode::Read) => return Err(FsError::NotFound),
            (None, OpenMode::Write) => {
                if !self.parent_ok(path) {
                    return Err(FsError::NotFound);
                }
                let file = RamFile {
                    name: path_name(path)?,
                    data: Vec::new(),
                };
                self.files.push(file).map_err(|_| FsError::NoSpace)?;
            }
            (Some(i), OpenMode::Write) => self.files[i].data.clear(),
            (Some(_), OpenMode::Read) => {}
        }

        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        let entry = OpenFile {
            handle,
            name: path_name(path)?,
            pos: 0,
            mode,
        };
        self.open.push(entry).map_err(|_| FsError::TooManyOpen)?;
        Ok(FileHandle(handle))
    }

    fn close(&mut self, fh: FileHandle) -> Result<(), FsError> {
        let i = self.slot(fh)?;
        self.open.swap_remove(i);
        Ok(())
    }

    fn read(&mut self, fh: FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        let o = self.slot(fh)?;
        let f = self.file_of(o)?;
        let data = &self.files[f].data;
        let pos = (self.open[o].pos as usize).min(data.len());
        let n = buf.len().min(data.len() - pos);
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        self.open[o].pos = (pos + n) as u32;
        Ok(n)
    }

    fn write(&mut self, fh: FileHandle, data: &[u8]) -> Result<usize, FsError> {
        let o = self.slot(fh)?;
        if self.open[o].mode != OpenMode::Write {
            return Err(FsError::BadHandle);
        }
        let f = self.file_of(o)?;
        let pos = self.open[o].pos as usize;
        let n = data.len().min(SIZE.saturating_sub(pos));
        if n == 0 && !data.is_empty() {
            return Err(FsError::NoSpace);
        }

        let file = &mut self.files[f].data;
        if file.len() < pos {
            file.resize(pos, 0).map_err(|_| FsError::NoSpace)?;
        }
        for (i, &b) in data[..n].iter().enumerate() {
            let at = pos + i;
            if at < file.len() {
                file[at] = b;
            } else {
                file.push(b).map_err(|_| FsError::NoSpace)?;
            }
        }
        self.open[o].pos = (pos + n) as u32;
        Ok(n)
    }

    fn seek(&mut self, fh: FileHandle, pos: SeekFrom) -> Result<u32, FsError> {
        let o = self.slot(fh)?;
        let f = self.file_of(o)?;
        let len = self.files[f].data.len() as i64;
        let target = match pos {
            SeekFrom::Start(off) => off as i64,
            SeekFrom::Current(off) => self.open[o].pos as i64 + off as i64,
            SeekFrom::End(off) => len + off as i64,
        };
        if target < 0 || target > u32::MAX as i64 {
            return Err(FsError::InvalidName);
        }
        self.open[o].pos = target as u32;
        Ok(target as u32)
    }

    fn size(&mut self, fh: FileHandle) -> Result<u32, FsError> {
        let o = self.slot(fh)?;
        let f = self.file_of(o)?;
        Ok(self.files[f].data.len() as u32)
    }

    fn stat(&mut self, path: &str) -> Result<DirEntry, FsError> {
        let path = normalize(path);
        if self.is_dir(path) {
            return Ok(DirEntry {
                name: path_name(path)?,
                kind: EntryKind::Dir,
                size: 0,
            });
        }
        let f = self.find(path).ok_or(FsError::NotFound)?;
        Ok(DirEntry {
            name: self.files[f].name.clone(),
            kind: EntryKind::File,
            size: self.files[f].data.len() as u32,
        })
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        let path = normalize(path);
        if let Some(f) = self.find(path) {
            self.files.swap_remove(f);
            return Ok(());
        }
        if let Some(d) = self.dirs.iter().position(|d| d.as_str() == path) {
            let prefix_busy = self
                .files
                .iter()
                .any(|f| f.name.as_str().rsplit_once('/').map(|(dir, _)| dir) == Some(path));
            if prefix_busy {
                return Err(FsError::AlreadyExists);
            }
            self.dirs.swap_remove(d);
            return Ok(());
        }
        Err(FsError::NotFound)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        let (from, to) = (normalize(from), normalize(to));
        let f = self.find(from).ok_or(FsError::NotFound)?;
        if self.find(to).is_some() || self.is_dir(to) {
            return Err(FsError::AlreadyExists);
        }
        if !self.parent_ok(to) {
            return Err(FsError::NotFound);
        }
        self.files[f].name = path_name(to)?;
        for o in self.open.iter_mut().filter(|o| o.name.as_str() == from) {
            o.name = path_name(to)?;
        }
        Ok(())
    }

    fn read_dir(&mut self, path: &str, visit: &mut dyn FnMut(&DirEntry)) -> Result<(), FsError> {
        let path = normalize(path);
        if !self.is_dir(path) {
            return Err(if self.find(path).is_some() {
                FsError::NotADirectory
            } else {
                FsError::NotFound
            });
        }

        if path.is_empty() {
            for d in self.dirs.iter() {
                visit(&DirEntry {
                    name: d.clone(),
                    kind: EntryKind::Dir,
                    size: 0,
                });
            }
        }
        for f in self.files.iter() {
            let (dir, base) = f.name.as_str().rsplit_once('/').unwrap_or(("", f.name.as_str()));
            if dir == path {
                visit(&DirEntry {
                    name: path_name(base)?,
                    kind: EntryKind::File,
                    size: f.data.len() as u32,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_back() {
        let mut fs = RamFs::<4, 64>::new();
        let fh = fs.open("a.js", OpenMode::Write).unwrap();
        assert_eq!(fs.write(fh, b"print(1)").unwrap(), 8);
        fs.close(fh).unwrap();

        let fh = fs.open("a.js", OpenMode::Read).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(fs.read(fh, &mut buf).unwrap(), 8);
        assert_eq!(&buf[..8], b"print(1)");
        assert_eq!(fs.read(fh, &mut buf).unwrap(), 0);
        fs.close(fh).unwrap();
        assert_eq!(fs.open_count(), 0);
    }

    #[test]
    fn test_write_mode_truncates() {
        let mut fs = RamFs::<4, 64>::new();
        fs.insert("a.js", b"longer text").unwrap();
        fs.insert("a.js", b"x").unwrap();
        assert_eq!(fs.contents("a.js"), Some(&b"x"[..]));
    }

    #[test]
    fn test_seek_past_end_zero_fills() {
        let mut fs = RamFs::<4, 64>::new();
        let fh = fs.open("t.dat", OpenMode::Write).unwrap();
        fs.seek(fh, SeekFrom::Start(4)).unwrap();
        fs.write(fh, &[9, 9]).unwrap();
        fs.close(fh).unwrap();
        assert_eq!(fs.contents("t.dat"), Some(&[0, 0, 0, 0, 9, 9][..]));
    }

    #[test]
    fn test_full_file_short_write() {
        let mut fs = RamFs::<4, 4>::new();
        let fh = fs.open("f", OpenMode::Write).unwrap();
        assert_eq!(fs.write(fh, b"abcdef").unwrap(), 4);
        assert_eq!(fs.write(fh, b"g"), Err(FsError::NoSpace));
        fs.close(fh).unwrap();
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let mut fs = RamFs::<4, 64>::new();
        assert_eq!(fs.open("nope", OpenMode::Read), Err(FsError::NotFound));
        assert_eq!(fs.remove("nope"), Err(FsError::NotFound));
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let mut fs = RamFs::<4, 64>::new();
        fs.insert("a", b"1").unwrap();
        fs.insert("b", b"2").unwrap();
        assert_eq!(fs.rename("a", "b"), Err(FsError::AlreadyExists));
        fs.rename("a", "c").unwrap();
        assert!(!fs.exists("a"));
        assert_eq!(fs.contents("c"), Some(&b"1"[..]));
    }

    #[test]
    fn test_directories() {
        let mut fs = RamFs::<4, 64>::new();
        fs.mkdir("lib").unwrap();
        fs.insert("lib/x.js", b"abc").unwrap();
        fs.insert("top.js", b"").unwrap();

        let mut root = std::vec::Vec::new();
        fs.read_dir("/", &mut |e| root.push((e.name.clone(), e.kind))).unwrap();
        assert_eq!(root.len(), 2);
        assert!(root.iter().any(|(n, k)| n.as_str() == "lib" && *k == EntryKind::Dir));

        let mut lib = std::vec::Vec::new();
        fs.read_dir("lib", &mut |e| lib.push(e.size)).unwrap();
        assert_eq!(lib, [3]);

        assert_eq!(fs.remove("lib"), Err(FsError::AlreadyExists));
        assert_eq!(fs.read_dir("top.js", &mut |_| {}), Err(FsError::NotADirectory));
    }
}
