//! Intel HEX record decoder.
//!
//! Byte-at-a-time: `:` starts a record, hex digits accumulate, anything
//! else is skipped. A record completes as soon as its byte count says so,
//! so trailing line ends are never needed.

use heapless::Vec;

/// Largest payload a record can declare.
pub const MAX_RECORD_DATA: usize = 255;

/// Byte count, two address bytes, type, checksum.
const RECORD_OVERHEAD: usize = 5;

/// Record type field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    Data = 0,
    EndOfFile = 1,
    ExtendedSegmentAddress = 2,
    StartSegmentAddress = 3,
    ExtendedLinearAddress = 4,
    StartLinearAddress = 5,
}

impl RecordType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RecordType::Data),
            1 => Some(RecordType::EndOfFile),
            2 => Some(RecordType::ExtendedSegmentAddress),
            3 => Some(RecordType::StartSegmentAddress),
            4 => Some(RecordType::ExtendedLinearAddress),
            5 => Some(RecordType::StartLinearAddress),
            _ => None,
        }
    }
}

/// A decoded record.
#[derive(Debug, PartialEq, Eq)]
pub struct Record<'a> {
    pub kind: RecordType,
    /// Absolute address: record offset plus the current segment and
    /// linear bases.
    pub address: u32,
    pub data: &'a [u8],
}

/// Outcome of a completed record.
#[derive(Debug, PartialEq, Eq)]
pub enum Event<'a> {
    Record(Record<'a>),
    ChecksumError,
}

/// Decoder state carried across records.
pub struct IhexDecoder {
    raw: Vec<u8, { MAX_RECORD_DATA + RECORD_OVERHEAD }>,
    high_nibble: Option<u8>,
    in_record: bool,
    /// From type 02, in 16-byte paragraphs.
    segment: u16,
    /// From type 04, already shifted into the upper half.
    linear_base: u32,
}

impl IhexDecoder {
    pub const fn new() -> Self {
        Self {
            raw: Vec::new(),
            high_nibble: None,
            in_record: false,
            segment: 0,
            linear_base: 0,
        }
    }

    /// Forget the current record and the address bases.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.high_nibble = None;
        self.in_record = false;
        self.segment = 0;
        self.linear_base = 0;
    }

    /// Whether a record has started and not yet completed.
    pub fn in_record(&self) -> bool {
        self.in_record
    }

    /// Feed one byte; returns an event when a record completes.
    pub fn feed(&mut self, byte: u8) -> Option<Event<'_>> {
        if byte == b':' {
            self.raw.clear();
            self.high_nibble = None;
            self.in_record = true;
            return None;
        }
        if !self.in_record {
            return None;
        }

        let nibble = hex_value(byte)?;
        let Some(high) = self.high_nibble.take() else {
            self.high_nibble = Some(nibble);
            return None;
        };
        if self.raw.push((high << 4) | nibble).is_err() {
            self.in_record = false;
            return None;
        }

        let expected = self.raw[0] as usize + RECORD_OVERHEAD;
        if self.raw.len() < expected {
            return None;
        }
        self.in_record = false;
        self.complete()
    }

    fn complete(&mut self) -> Option<Event<'_>> {
        let sum = self.raw.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != 0 {
            return Some(Event::ChecksumError);
        }

        let len = self.raw[0] as usize;
        let offset = u16::from_be_bytes([self.raw[1], self.raw[2]]);
        let kind = RecordType::from_u8(self.raw[3])?;
        let data = &self.raw[4..4 + len];

        match kind {
            RecordType::ExtendedSegmentAddress if len >= 2 => {
                self.segment = u16::from_be_bytes([data[0], data[1]]);
            }
            RecordType::ExtendedLinearAddress if len >= 2 => {
                self.linear_base = (u16::from_be_bytes([data[0], data[1]]) as u32) << 16;
            }
            _ => {}
        }

        let address = self
            .linear_base
            .wrapping_add(offset as u32)
            .wrapping_add((self.segment as u32) << 4);

        Some(Event::Record(Record {
            kind,
            address,
            data: &self.raw[4..4 + len],
        }))
    }
}

impl Default for IhexDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
