//! The fixed 110-byte entry header.
//!
//! Layout (numeric fields little-endian):
//! bytes 0..4 magic `MSHB`, 4..6 format version, 6..14 data length,
//! 14..78 content hash as ASCII hex, 78..110 reserved zero.

use mashbank_core::constants::{ENTRY_FORMAT_VERSION, ENTRY_HEADER_LEN, ENTRY_MAGIC};
use mashbank_core::errors::{ContainerError, MashResult};
use mashbank_core::hashing;

/// Header size as usize, for buffer arithmetic.
pub const HEADER_LEN: usize = ENTRY_HEADER_LEN as usize;

const MAGIC_END: usize = 4;
const VERSION_END: usize = 6;
const LEN_END: usize = 14;
const HASH_END: usize = 78;

/// Parsed form of one entry header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// 64 hex characters, stored verbatim.
    pub hash: String,
    pub data_len: u64,
}

impl EntryHeader {
    pub fn new(hash: &str, data_len: u64) -> MashResult<Self> {
        if !hashing::is_hex64(hash) {
            return Err(ContainerError::InvalidHash {
                hash: hash.to_string(),
            }
            .into());
        }
        Ok(Self {
            hash: hash.to_string(),
            data_len,
        })
    }

    /// Serialize to the exact on-disk form.
    pub fn serialize(&self) -> MashResult<[u8; HEADER_LEN]> {
        if !hashing::is_hex64(&self.hash) {
            return Err(ContainerError::InvalidHash {
                hash: self.hash.clone(),
            }
            .into());
        }
        let mut buf = [0u8; HEADER_LEN];
        buf[..MAGIC_END].copy_from_slice(&ENTRY_MAGIC);
        buf[MAGIC_END..VERSION_END].copy_from_slice(&ENTRY_FORMAT_VERSION.to_le_bytes());
        buf[VERSION_END..LEN_END].copy_from_slice(&self.data_len.to_le_bytes());
        buf[LEN_END..HASH_END].copy_from_slice(self.hash.as_bytes());
        // 78..110 stays zero (reserved).
        Ok(buf)
    }

    /// Parse an on-disk header. Unknown versions are rejected; future
    /// versions keep the 110-byte size and the reserved range.
    pub fn parse(buf: &[u8; HEADER_LEN]) -> Result<Self, ContainerError> {
        Self::parse_at(buf, 0)
    }

    /// Parse, reporting `offset` in errors (for scan diagnostics).
    pub fn parse_at(buf: &[u8; HEADER_LEN], offset: u64) -> Result<Self, ContainerError> {
        if buf[..MAGIC_END] != ENTRY_MAGIC {
            return Err(ContainerError::BadMagic { offset });
        }
        let version = u16::from_le_bytes([buf[MAGIC_END], buf[MAGIC_END + 1]]);
        if version != ENTRY_FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion { version });
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[VERSION_END..LEN_END]);
        let data_len = u64::from_le_bytes(len_bytes);
        let hash = std::str::from_utf8(&buf[LEN_END..HASH_END])
            .ok()
            .filter(|s| hashing::is_hex64(s))
            .ok_or_else(|| ContainerError::InvalidHash {
                hash: String::from_utf8_lossy(&buf[LEN_END..HASH_END]).into_owned(),
            })?
            .to_string();
        Ok(Self { hash, data_len })
    }

    /// Total on-disk size of the entry this header frames.
    pub fn entry_len(&self) -> u64 {
        ENTRY_HEADER_LEN + self.data_len
    }
}
