//! Error types for every mashbank subsystem.
//!
//! Each subsystem has its own thiserror enum; all of them convert into
//! [`MashError`], which carries the stable [`ErrorCode`] that handlers
//! translate into an HTTP status.

mod auth_error;
mod code;
mod container_error;
mod service_error;
mod storage_error;

pub use auth_error::AuthError;
pub use code::ErrorCode;
pub use container_error::ContainerError;
pub use service_error::ServiceError;
pub use storage_error::StorageError;

/// Result alias used across the workspace.
pub type MashResult<T> = Result<T, MashError>;

/// Top-level error: a subsystem error or an ad-hoc tagged one.
#[derive(Debug, thiserror::Error)]
pub enum MashError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{message}")]
    Tagged { code: ErrorCode, message: String },
}

impl MashError {
    /// Build a tagged error from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        MashError::Tagged {
            code,
            message: message.into(),
        }
    }

    /// The stable code of this error, whichever variant carries it.
    pub fn code(&self) -> ErrorCode {
        match self {
            MashError::Container(e) => e.code(),
            MashError::Storage(e) => e.code(),
            MashError::Auth(e) => e.code(),
            MashError::Service(e) => e.code(),
            MashError::Tagged { code, .. } => *code,
        }
    }

    /// Prefix the message with extra context. The code is preserved;
    /// enrichment never downgrades it.
    pub fn context(self, ctx: impl std::fmt::Display) -> Self {
        let code = self.code();
        MashError::Tagged {
            code,
            message: format!("{ctx}: {self}"),
        }
    }

    /// Render the JSON error envelope handlers answer with.
    pub fn envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code().as_str(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<std::io::Error> for MashError {
    fn from(e: std::io::Error) -> Self {
        MashError::Container(ContainerError::Io(e))
    }
}

/// Shorthand for a storage error wrapping an SQLite failure message.
pub fn to_storage_err(message: impl Into<String>) -> MashError {
    MashError::Storage(StorageError::SqliteError {
        message: message.into(),
    })
}
