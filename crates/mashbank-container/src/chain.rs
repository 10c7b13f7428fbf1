//! Replay of the per-container running hash chain.
//!
//! `H_0 = zeroes; H_i = blake3(H_{i-1} || header_i || data_i)`. A single
//! chain per container, not a Merkle tree: append locality is the
//! workload, and locating a corrupt entry takes a forward replay anyway.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use mashbank_core::errors::{ContainerError, MashResult};
use mashbank_core::hashing::{self, HASH_LEN};

use crate::header::{EntryHeader, HEADER_LEN};

/// Result of a chain replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Replay reached the (tolerated) end of the container.
    Complete { chain_hex: String, count: u64 },
    /// The progress callback asked to stop.
    Cancelled { entries_done: u64 },
}

/// Replay the full chain, invoking `progress(entries_done)` every
/// `report_every` entries (0 disables reporting). The callback returns
/// `false` to cancel cooperatively.
pub fn replay_chain<F>(path: &Path, report_every: u64, mut progress: F) -> MashResult<ReplayOutcome>
where
    F: FnMut(u64) -> bool,
{
    let file = File::open(path).map_err(ContainerError::Io)?;
    let file_len = file.metadata().map_err(ContainerError::Io)?.len();
    let mut reader = BufReader::new(file);

    let mut state: [u8; HASH_LEN] = hashing::chain_zero();
    let mut offset = 0u64;
    let mut count = 0u64;
    let mut header_buf = [0u8; HEADER_LEN];
    let mut data_buf = vec![0u8; 256 * 1024];

    while offset + HEADER_LEN as u64 <= file_len {
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(ContainerError::Io)?;
        if reader.read_exact(&mut header_buf).is_err() {
            break;
        }
        let header = match EntryHeader::parse_at(&header_buf, offset) {
            Ok(h) => h,
            Err(_) => break,
        };
        let end = offset + header.entry_len();
        if end > file_len {
            break;
        }

        // Feed H_{i-1} || header || data incrementally; large entries
        // stream through the fixed buffer.
        let mut hasher = blake3::Hasher::new();
        hasher.update(&state);
        hasher.update(&header_buf);
        let mut remaining = header.data_len;
        while remaining > 0 {
            let want = data_buf.len().min(remaining as usize);
            reader
                .read_exact(&mut data_buf[..want])
                .map_err(ContainerError::Io)?;
            hasher.update(&data_buf[..want]);
            remaining -= want as u64;
        }
        state = *hasher.finalize().as_bytes();
        count += 1;
        offset = end;

        if report_every > 0 && count % report_every == 0 && !progress(count) {
            return Ok(ReplayOutcome::Cancelled { entries_done: count });
        }
    }

    Ok(ReplayOutcome::Complete {
        chain_hex: hashing::chain_hex(&state),
        count,
    })
}

fn decode_chain_hex(chain_hex: &str) -> MashResult<[u8; HASH_LEN]> {
    let mut state = hashing::chain_zero();
    if chain_hex.is_empty() {
        return Ok(state);
    }
    if chain_hex.len() != HASH_LEN * 2 {
        return Err(ContainerError::InvalidHash {
            hash: chain_hex.to_string(),
        }
        .into());
    }
    for (i, byte) in state.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&chain_hex[i * 2..i * 2 + 2], 16).map_err(|_| {
            ContainerError::InvalidHash {
                hash: chain_hex.to_string(),
            }
        })?;
    }
    Ok(state)
}

/// One incremental chain step over an in-memory entry, used by ingest to
/// advance the stored chain without re-reading the container.
pub fn advance_chain(prev_chain_hex: &str, header_bytes: &[u8], data: &[u8]) -> MashResult<String> {
    let prev = decode_chain_hex(prev_chain_hex)?;
    let next = hashing::chain_step(&prev, header_bytes, data);
    Ok(hashing::chain_hex(&next))
}

/// Streaming variant of [`advance_chain`] for entries too large to hold
/// in memory: data is fed from `reader` until EOF.
pub fn advance_chain_from_reader<R: Read>(
    prev_chain_hex: &str,
    header_bytes: &[u8],
    reader: &mut R,
) -> MashResult<String> {
    let prev = decode_chain_hex(prev_chain_hex)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(&prev);
    hasher.update(header_bytes);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(ContainerError::Io)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hashing::chain_hex(hasher.finalize().as_bytes()))
}
