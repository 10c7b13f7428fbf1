use crate::errors::ErrorCode;

/// Container codec errors (on-disk entry framing and hash chains).
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("bad entry magic at offset {offset}")]
    BadMagic { offset: u64 },

    #[error("unsupported entry format version {version}")]
    UnsupportedVersion { version: u16 },

    #[error("invalid content hash: {hash:?}")]
    InvalidHash { hash: String },

    #[error("entry data size mismatch: declared {declared}, streamed {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("entry hash mismatch at offset {offset}: stored {stored}, computed {computed}")]
    HashMismatch {
        offset: u64,
        stored: String,
        computed: String,
    },

    #[error("truncated entry at offset {offset}")]
    Truncated { offset: u64 },

    #[error("container io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ContainerError::InvalidHash { .. } => ErrorCode::InvalidHash,
            ContainerError::SizeMismatch { .. } => ErrorCode::InvalidRequest,
            _ => ErrorCode::InternalError,
        }
    }
}
