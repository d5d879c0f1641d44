//! Filesystem interface used by the shell and the HEX upload.

use core::fmt;

/// Longest path the shell hands to a filesystem.
pub const MAX_PATH: usize = 32;

/// Owned, fixed-capacity path.
pub type PathName = heapless::String<MAX_PATH>;

/// Build a [`PathName`], rejecting paths that do not fit.
pub fn path_name(path: &str) -> Result<PathName, FsError> {
    let mut out = PathName::new();
    out.push_str(path).map_err(|_| FsError::InvalidName)?;
    Ok(out)
}

/// Open file token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read only.
    Read,
    /// Create, or truncate an existing file.
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u32),
    Current(i32),
    End(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One `stat`/`read_dir` result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: PathName,
    pub kind: EntryKind,
    pub size: u32,
}

impl DirEntry {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Filesystem error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    NoSpace,
    TooManyOpen,
    BadHandle,
    InvalidName,
    NotADirectory,
    Io,
}

impl FsError {
    /// Negative errno value, as printed by `rm`.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => -2,
            Self::Io => -5,
            Self::BadHandle => -9,
            Self::AlreadyExists => -17,
            Self::NotADirectory => -20,
            Self::InvalidName => -22,
            Self::TooManyOpen => -24,
            Self::NoSpace => -28,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "no such file or directory",
            Self::AlreadyExists => "file exists",
            Self::NoSpace => "no space left on device",
            Self::TooManyOpen => "too many open files",
            Self::BadHandle => "bad file handle",
            Self::InvalidName => "invalid name",
            Self::NotADirectory => "not a directory",
            Self::Io => "I/O error",
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Object-safe filesystem.
pub trait FileSystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError>;

    fn close(&mut self, fh: FileHandle) -> Result<(), FsError>;

    /// Read at the current position. `Ok(0)` at end of file.
    fn read(&mut self, fh: FileHandle, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Write at the current position. May write fewer bytes than asked.
    fn write(&mut self, fh: FileHandle, data: &[u8]) -> Result<usize, FsError>;

    /// Move the position. Seeking past the end is allowed; a following
    /// write zero-fills the gap.
    fn seek(&mut self, fh: FileHandle, pos: SeekFrom) -> Result<u32, FsError>;

    fn size(&mut self, fh: FileHandle) -> Result<u32, FsError>;

    fn stat(&mut self, path: &str) -> Result<DirEntry, FsError>;

    fn remove(&mut self, path: &str) -> Result<(), FsError>;

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError>;

    /// Call `visit` for each entry directly under `path`.
    fn read_dir(&mut self, path: &str, visit: &mut dyn FnMut(&DirEntry)) -> Result<(), FsError>;

    fn exists(&mut self, path: &str) -> bool {
        self.stat(path).is_ok()
    }
}
