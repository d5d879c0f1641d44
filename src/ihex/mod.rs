//! Intel HEX upload.
//!
//! - [`IhexDecoder`]: record framing, checksum, address bases
//! - [`IhexUpload`]: the session handler writing records to `temp.dat`

mod decoder;
mod session;

pub use decoder::{Event, IhexDecoder, Record, RecordType, MAX_RECORD_DATA};
pub use session::{IhexUpload, UploadState};
