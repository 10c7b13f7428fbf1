use serde::{Deserialize, Serialize};

/// Outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Ok,
    CountMismatch,
    HashMismatch,
    Cancelled,
}

/// Result of replaying one container against its stored chain record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerReport {
    pub topic: String,
    pub container: String,
    pub status: VerifyStatus,
    pub stored_count: u64,
    pub replayed_count: u64,
    pub stored_chain: String,
    pub replayed_chain: String,
    pub detail: Option<String>,
}

impl ContainerReport {
    pub fn is_ok(&self) -> bool {
        self.status == VerifyStatus::Ok
    }
}

/// Categories of orchestrator-index discrepancies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexIssueKind {
    /// Topic directory missing or unhealthy.
    Orphan,
    /// Asset row absent from the topic DB.
    Missing,
    /// Container name disagrees between orchestrator and topic DB.
    Mismatch,
}

/// One orchestrator-index discrepancy found by `verify_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexIssue {
    pub kind: IndexIssueKind,
    pub hash: String,
    pub topic: String,
    pub detail: String,
}
