use crate::errors::ErrorCode;

/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("asset {hash} already indexed in topic {topic}")]
    DuplicateHash { hash: String, topic: String },

    #[error("database corruption detected: {details}")]
    CorruptionDetected { details: String },
}

impl StorageError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StorageError::DuplicateHash { .. } => ErrorCode::AssetDuplicate,
            _ => ErrorCode::InternalError,
        }
    }
}
