use crate::errors::ErrorCode;

/// Authentication and authorization errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication required")]
    AuthRequired,

    #[error("user account is disabled")]
    UserDisabled,

    #[error("account locked until {until}")]
    AccountLocked { until: i64 },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("quota exceeded: {detail}")]
    QuotaExceeded { detail: String },

    #[error("escalation denied: {reason}")]
    EscalationDenied { reason: String },

    #[error("username {username:?} already exists")]
    UserExists { username: String },
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::AuthRequired => ErrorCode::AuthRequired,
            AuthError::UserDisabled => ErrorCode::UserDisabled,
            AuthError::AccountLocked { .. } => ErrorCode::AccountLocked,
            AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthError::Forbidden { .. } => ErrorCode::Forbidden,
            AuthError::ConstraintViolation { .. } => ErrorCode::ConstraintViolation,
            AuthError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            AuthError::EscalationDenied { .. } => ErrorCode::EscalationDenied,
            AuthError::UserExists { .. } => ErrorCode::InvalidRequest,
        }
    }
}
