use serde::{Deserialize, Serialize};

/// One row of the orchestrator's append-only action audit log.
///
/// Distinct from the grant log: this records actions, the grant log
/// records permission changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    /// Username, or `system` for background services.
    pub actor: String,
    pub action: String,
    /// Free-form JSON detail blob.
    pub detail: serde_json::Value,
    pub timestamp: i64,
}
