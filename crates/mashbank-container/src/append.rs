//! Appending one entry to a container file.

use std::fs::OpenOptions;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use mashbank_core::errors::{ContainerError, MashResult};

use crate::header::EntryHeader;

/// Append a header-framed entry, streaming `expected_size` bytes from
/// `reader`. Returns the byte offset of the entry (the pre-append file
/// size). Fails if the reader delivers fewer or more bytes.
///
/// Not concurrency-safe alone: the offset comes from the pre-append file
/// size, so callers must hold the per-topic write lock or two appends
/// would observe the same offset.
pub fn append_from_reader<R: Read>(
    path: &Path,
    hash: &str,
    expected_size: u64,
    reader: &mut R,
) -> MashResult<u64> {
    let header = EntryHeader::new(hash, expected_size)?;

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(ContainerError::Io)?;
    let offset = file.metadata().map_err(ContainerError::Io)?.len();

    let mut out = BufWriter::new(&file);
    out.write_all(&header.serialize()?).map_err(ContainerError::Io)?;

    let mut remaining = expected_size;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let n = reader.read(&mut buf[..want]).map_err(ContainerError::Io)?;
        if n == 0 {
            return Err(ContainerError::SizeMismatch {
                declared: expected_size,
                actual: expected_size - remaining,
            }
            .into());
        }
        out.write_all(&buf[..n]).map_err(ContainerError::Io)?;
        remaining -= n as u64;
    }

    // The reader must be exhausted: extra bytes mean the declared size lied.
    let extra = reader.read(&mut buf[..1]).map_err(ContainerError::Io)?;
    if extra > 0 {
        return Err(ContainerError::SizeMismatch {
            declared: expected_size,
            actual: expected_size + extra as u64,
        }
        .into());
    }

    out.flush().map_err(ContainerError::Io)?;
    drop(out);
    file.sync_all().map_err(ContainerError::Io)?;

    Ok(offset)
}
