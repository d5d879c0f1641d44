//! Intel HEX upload session.
//!
//! Records are written into the temporary file at their decoded address.
//! Every stored data record is acknowledged so the sender can pace itself.

use crate::config::IHEX_TEMP_FILE;
use crate::fs::{FileHandle, FileSystem, OpenMode, SeekFrom};
use crate::log_globals::TASK_LOG_STREAM;
use crate::services::Services;
use crate::session::{HandlerKind, SessionError, SessionHandler};
use crate::uart::TransportError;
use crate::{rt_error, rt_info, rt_warn};

use super::decoder::{Event, IhexDecoder, RecordType};

/// Upload progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    Start,
    InProgress,
    Finished,
    Error,
}

/// Session handler receiving an Intel HEX stream.
pub struct IhexUpload {
    decoder: IhexDecoder,
    /// A `:` was seen and no line end since.
    marker: bool,
    state: UploadState,
    file: Option<FileHandle>,
    bytes_written: u32,
}

impl IhexUpload {
    pub const fn new() -> Self {
        Self {
            decoder: IhexDecoder::new(),
            marker: false,
            state: UploadState::Start,
            file: None,
            bytes_written: 0,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Payload bytes stored so far in this upload.
    pub fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    fn read_byte(&mut self, byte: u8, svc: &mut Services<'_>) {
        let Some(event) = self.decoder.feed(byte) else {
            return;
        };

        let record = match event {
            Event::ChecksumError => {
                self.state = UploadState::Error;
                svc.term.print("[ERR] Checksum_error\r\n");
                rt_warn!(TASK_LOG_STREAM, "ihex: checksum error");
                return;
            }
            Event::Record(record) => record,
        };

        match record.kind {
            RecordType::Data => {
                self.state = UploadState::InProgress;

                let written = match self.file {
                    Some(fh) => write_at(&mut *svc.fs, fh, record.address, record.data),
                    None => Err(()),
                };
                match written {
                    Ok(()) => {
                        self.bytes_written += record.data.len() as u32;
                        svc.term.print("[ACK]\n");
                    }
                    Err(()) => {
                        rt_error!(
                            TASK_LOG_STREAM,
                            "ihex: write of {} bytes at {:#x} failed",
                            record.data.len(),
                            record.address
                        );
                        self.state = UploadState::Error;
                        svc.term.print("[ERR] Write_error\r\n");
                    }
                }
            }
            RecordType::EndOfFile => self.state = UploadState::Finished,
            _ => {}
        }
    }
}

impl Default for IhexUpload {
    fn default() -> Self {
        Self::new()
    }
}

fn write_at(fs: &mut dyn FileSystem, fh: FileHandle, address: u32, data: &[u8]) -> Result<(), ()> {
    if data.is_empty() {
        return Ok(());
    }
    fs.seek(fh, SeekFrom::Start(address)).map_err(|_| ())?;
    match fs.write(fh, data) {
        Ok(n) if n == data.len() => Ok(()),
        _ => Err(()),
    }
}

impl SessionHandler for IhexUpload {
    fn init(&mut self, svc: &mut Services<'_>) -> Result<(), SessionError> {
        self.state = UploadState::Start;
        self.marker = false;
        self.bytes_written = 0;
        self.decoder.reset();

        svc.term.print("\n");
        svc.term.print("[RDY]\n");

        match svc.fs.open(IHEX_TEMP_FILE, OpenMode::Write) {
            Ok(fh) => {
                self.file = Some(fh);
                Ok(())
            }
            Err(e) => {
                rt_error!(TASK_LOG_STREAM, "ihex: cannot open {}: {}", IHEX_TEMP_FILE, e);
                self.state = UploadState::Error;
                Err(SessionError::FileOpen(e))
            }
        }
    }

    fn process(&mut self, data: &[u8], svc: &mut Services<'_>) -> usize {
        let mut processed = 0;
        for &byte in data {
            processed += 1;

            if self.marker {
                self.read_byte(byte, svc);
            }
            match byte {
                b':' => {
                    self.read_byte(byte, svc);
                    self.marker = true;
                }
                b'\r' | b'\n' => self.marker = false,
                _ => {}
            }

            // What follows belongs to the shell
            if self.is_done() {
                break;
            }
        }
        processed
    }

    fn is_done(&self) -> bool {
        matches!(self.state, UploadState::Finished | UploadState::Error)
    }

    fn close(&mut self, svc: &mut Services<'_>) -> HandlerKind {
        if let Some(fh) = self.file.take() {
            let _ = svc.fs.close(fh);
        }

        match self.state {
            UploadState::Finished => {
                svc.term.print("[EOF]\n");
                rt_info!(
                    TASK_LOG_STREAM,
                    "ihex: saved {} bytes to {}",
                    self.bytes_written,
                    IHEX_TEMP_FILE
                );
            }
            _ => rt_warn!(TASK_LOG_STREAM, "ihex: upload abandoned"),
        }
        self.decoder.reset();
        HandlerKind::Shell
    }

    fn error(&mut self, err: TransportError, svc: &mut Services<'_>) {
        rt_warn!(TASK_LOG_STREAM, "ihex: {}", err);
        svc.term.print("[Download Error]\n");
    }
}
