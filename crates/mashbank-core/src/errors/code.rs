//! Stable error codes and their HTTP status mapping.

use serde::{Deserialize, Serialize};

/// The stable, wire-visible error code carried by every [`super::MashError`].
///
/// Higher layers may enrich an error's message but must never downgrade
/// its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // 401
    AuthRequired,
    UserDisabled,
    AccountLocked,
    InvalidCredentials,
    // 403
    Forbidden,
    ConstraintViolation,
    QuotaExceeded,
    EscalationDenied,
    // 404
    TopicNotFound,
    AssetNotFound,
    PresetNotFound,
    SessionNotFound,
    // 409
    TopicAlreadyExists,
    AssetDuplicate,
    // 400
    InvalidRequest,
    InvalidHash,
    InvalidTopicName,
    InvalidFilenameFormat,
    MissingParam,
    // 413
    AssetTooLarge,
    BulkTooLarge,
    MetadataValueTooLong,
    // 503
    TopicUnhealthy,
    NotConfigured,
    DiskLimitExceeded,
    // 500
    QueryError,
    MetadataError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status a handler should answer with for this code.
    pub fn http_status(self) -> u16 {
        use ErrorCode::*;
        match self {
            AuthRequired | UserDisabled | AccountLocked | InvalidCredentials => 401,
            Forbidden | ConstraintViolation | QuotaExceeded | EscalationDenied => 403,
            TopicNotFound | AssetNotFound | PresetNotFound | SessionNotFound => 404,
            TopicAlreadyExists | AssetDuplicate => 409,
            InvalidRequest | InvalidHash | InvalidTopicName | InvalidFilenameFormat
            | MissingParam => 400,
            AssetTooLarge | BulkTooLarge | MetadataValueTooLong => 413,
            TopicUnhealthy | NotConfigured | DiskLimitExceeded => 503,
            QueryError | MetadataError | InternalError => 500,
        }
    }

    /// Snake-case wire form, as rendered into the error envelope.
    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            AuthRequired => "auth_required",
            UserDisabled => "user_disabled",
            AccountLocked => "account_locked",
            InvalidCredentials => "invalid_credentials",
            Forbidden => "forbidden",
            ConstraintViolation => "constraint_violation",
            QuotaExceeded => "quota_exceeded",
            EscalationDenied => "escalation_denied",
            TopicNotFound => "topic_not_found",
            AssetNotFound => "asset_not_found",
            PresetNotFound => "preset_not_found",
            SessionNotFound => "session_not_found",
            TopicAlreadyExists => "topic_already_exists",
            AssetDuplicate => "asset_duplicate",
            InvalidRequest => "invalid_request",
            InvalidHash => "invalid_hash",
            InvalidTopicName => "invalid_topic_name",
            InvalidFilenameFormat => "invalid_filename_format",
            MissingParam => "missing_param",
            AssetTooLarge => "asset_too_large",
            BulkTooLarge => "bulk_too_large",
            MetadataValueTooLong => "metadata_value_too_long",
            TopicUnhealthy => "topic_unhealthy",
            NotConfigured => "not_configured",
            DiskLimitExceeded => "disk_limit_exceeded",
            QueryError => "query_error",
            MetadataError => "metadata_error",
            InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
