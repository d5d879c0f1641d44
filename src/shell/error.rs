//! Shell error types

use crate::fs::FsError;

/// What a command handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Done, print the prompt.
    Ok,
    /// Done, the handler takes care of what comes next.
    OkNoPrompt,
    Error,
    /// Unrecognized command or argument.
    Unknown,
}

impl CommandResult {
    /// Numeric status, as reported to an IDE.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::OkNoPrompt => 1,
            Self::Error => -1,
            Self::Unknown => -2,
        }
    }
}

/// Command failure with a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellError {
    /// E01: Missing argument
    NotEnoughArguments,
    /// E02: File does not exist
    FileNotFound,
    /// E03: Name is not 8.3
    InvalidFileName,
    /// E04: `boot` target does not exist
    BootTargetMissing,
    /// E05: Could not create boot.cfg
    BootCfgCreate,
    /// E06: Could not write boot.cfg
    BootCfgWrite,
    /// E07: Filesystem failure
    Fs(FsError),
}

impl ShellError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotEnoughArguments => "E01",
            Self::FileNotFound => "E02",
            Self::InvalidFileName => "E03",
            Self::BootTargetMissing => "E04",
            Self::BootCfgCreate => "E05",
            Self::BootCfgWrite => "E06",
            Self::Fs(_) => "E07",
        }
    }

    /// Text sent to the terminal.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotEnoughArguments => "Not enough arguments\r\n",
            Self::FileNotFound => "File not found\r\n",
            Self::InvalidFileName => "Expected file name in 8.3 format.\r\n",
            Self::BootTargetMissing => "File passed to cfg doesn't exist\n\r\n",
            Self::BootCfgCreate => "Failed to create boot.cfg file\r\n",
            Self::BootCfgWrite => "Failed to write boot.cfg file\r\n",
            Self::Fs(_) => "File system error\r\n",
        }
    }
}

impl From<FsError> for ShellError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound => Self::FileNotFound,
            FsError::InvalidName => Self::InvalidFileName,
            other => Self::Fs(other),
        }
    }
}

impl core::fmt::Display for ShellError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fs(e) => write!(f, "{}: {}", self.code(), e),
            _ => write!(f, "{}: {}", self.code(), self.message().trim_end()),
        }
    }
}
