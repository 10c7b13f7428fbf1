//! Single-entry integrity validation.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use mashbank_core::errors::{ContainerError, MashResult};
use mashbank_core::hashing;

use crate::header::{EntryHeader, HEADER_LEN};
use crate::read::read_data;

/// Re-read and rehash the entry at `offset`; error on a stored/computed
/// hash mismatch.
pub fn validate_entry(path: &Path, offset: u64) -> MashResult<EntryHeader> {
    let mut file = File::open(path).map_err(ContainerError::Io)?;
    file.seek(SeekFrom::Start(offset)).map_err(ContainerError::Io)?;
    let mut buf = [0u8; HEADER_LEN];
    file.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ContainerError::Truncated { offset },
        _ => ContainerError::Io(e),
    })?;
    let header = EntryHeader::parse_at(&buf, offset)?;

    let data = read_data(path, offset, header.data_len)?;
    let computed = hashing::hash_bytes(&data);
    if computed != header.hash.to_ascii_lowercase() {
        return Err(ContainerError::HashMismatch {
            offset,
            stored: header.hash.clone(),
            computed,
        }
        .into());
    }
    Ok(header)
}
