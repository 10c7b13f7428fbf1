//! Tolerant forward scan over a container's entries.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use mashbank_core::errors::{ContainerError, MashResult};

use crate::header::{EntryHeader, HEADER_LEN};

/// Iterate entries, calling `visitor(offset, header)` for each complete
/// one. A truncated tail or an unparseable header ends iteration cleanly:
/// trailing orphan bytes are a crashed partial write that was rejected at
/// DB-commit time, not an error. Returns the count of entries visited.
pub fn scan<F>(path: &Path, mut visitor: F) -> MashResult<u64>
where
    F: FnMut(u64, &EntryHeader),
{
    let file = File::open(path).map_err(ContainerError::Io)?;
    let file_len = file.metadata().map_err(ContainerError::Io)?.len();
    let mut reader = BufReader::new(file);

    let mut offset = 0u64;
    let mut count = 0u64;
    let mut header_buf = [0u8; HEADER_LEN];

    while offset + HEADER_LEN as u64 <= file_len {
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(ContainerError::Io)?;
        if reader.read_exact(&mut header_buf).is_err() {
            break;
        }
        let header = match EntryHeader::parse_at(&header_buf, offset) {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(offset, error = %e, "scan stopped at unparseable header");
                break;
            }
        };
        let end = offset + header.entry_len();
        if end > file_len {
            // Torn tail: header written but data incomplete.
            tracing::debug!(offset, "scan stopped at truncated tail");
            break;
        }
        visitor(offset, &header);
        count += 1;
        offset = end;
    }

    Ok(count)
}
