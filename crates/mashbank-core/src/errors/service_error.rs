use crate::errors::ErrorCode;

/// Service-layer errors (pipelines, registry, queries, verification).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("topic not found: {topic}")]
    TopicNotFound { topic: String },

    #[error("asset not found: {hash}")]
    AssetNotFound { hash: String },

    #[error("query preset not found: {preset}")]
    PresetNotFound { preset: String },

    #[error("bulk session not found or expired: {session}")]
    SessionNotFound { session: String },

    #[error("topic already exists: {topic}")]
    TopicAlreadyExists { topic: String },

    #[error("invalid topic name: {name:?}")]
    InvalidTopicName { name: String },

    #[error("invalid filename format: {format:?}")]
    InvalidFilenameFormat { format: String },

    #[error("asset too large: {size} bytes (limit {limit})")]
    AssetTooLarge { size: u64, limit: u64 },

    #[error("bulk request too large: {count} assets (limit {limit})")]
    BulkTooLarge { count: usize, limit: usize },

    #[error("metadata value too long: {len} chars (limit {limit})")]
    MetadataValueTooLong { len: usize, limit: usize },

    #[error("working directory not configured")]
    NotConfigured,

    #[error("topic unhealthy: {topic}: {reason}")]
    TopicUnhealthy { topic: String, reason: String },

    #[error("disk limit exceeded: {used}/{cap} bytes")]
    DiskLimitExceeded { used: u64, cap: u64 },

    #[error("query failed: {reason}")]
    QueryError { reason: String },

    #[error("metadata operation failed: {reason}")]
    MetadataError { reason: String },

    #[error("missing parameter: {param}")]
    MissingParam { param: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        use ServiceError::*;
        match self {
            TopicNotFound { .. } => ErrorCode::TopicNotFound,
            AssetNotFound { .. } => ErrorCode::AssetNotFound,
            PresetNotFound { .. } => ErrorCode::PresetNotFound,
            SessionNotFound { .. } => ErrorCode::SessionNotFound,
            TopicAlreadyExists { .. } => ErrorCode::TopicAlreadyExists,
            InvalidTopicName { .. } => ErrorCode::InvalidTopicName,
            InvalidFilenameFormat { .. } => ErrorCode::InvalidFilenameFormat,
            AssetTooLarge { .. } => ErrorCode::AssetTooLarge,
            BulkTooLarge { .. } => ErrorCode::BulkTooLarge,
            MetadataValueTooLong { .. } => ErrorCode::MetadataValueTooLong,
            NotConfigured => ErrorCode::NotConfigured,
            TopicUnhealthy { .. } => ErrorCode::TopicUnhealthy,
            DiskLimitExceeded { .. } => ErrorCode::DiskLimitExceeded,
            QueryError { .. } => ErrorCode::QueryError,
            MetadataError { .. } => ErrorCode::MetadataError,
            MissingParam { .. } => ErrorCode::MissingParam,
            InvalidRequest { .. } => ErrorCode::InvalidRequest,
        }
    }
}
