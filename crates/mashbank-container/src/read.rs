//! Ranged reads of entry data.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use mashbank_core::constants::ENTRY_HEADER_LEN;
use mashbank_core::errors::{ContainerError, MashResult};

/// Read exactly `data_len` bytes of entry data at `offset` (the entry
/// header's position; the data starts 110 bytes past it).
pub fn read_data(path: &Path, offset: u64, data_len: u64) -> MashResult<Vec<u8>> {
    let mut file = File::open(path).map_err(ContainerError::Io)?;
    file.seek(SeekFrom::Start(offset + ENTRY_HEADER_LEN))
        .map_err(ContainerError::Io)?;
    let mut data = vec![0u8; data_len as usize];
    file.read_exact(&mut data)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ContainerError::Truncated { offset },
            _ => ContainerError::Io(e),
        })?;
    Ok(data)
}
