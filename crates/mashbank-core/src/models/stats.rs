use serde::{Deserialize, Serialize};

/// Read-only snapshot of one topic's contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic: String,
    pub asset_count: u64,
    pub total_bytes: u64,
    pub container_count: u64,
    pub healthy: bool,
    /// Unix seconds when the snapshot was computed.
    pub computed_at: i64,
}

/// Aggregated service-level snapshot across all healthy topics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub topic_count: u64,
    pub asset_count: u64,
    pub total_bytes: u64,
    pub container_count: u64,
    pub unhealthy_topics: Vec<String>,
    pub computed_at: i64,
}
