use serde::{Deserialize, Serialize};

use super::Action;

/// A (user, action, constraints) authorization tuple. Soft-revoked via
/// `is_active`, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub user_id: i64,
    pub action: Action,
    /// Typed-per-action constraint JSON; `None` means unconstrained.
    pub constraints_json: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub created_by: String,
}

/// Kinds of grant mutations recorded in the grant log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantChangeType {
    Created,
    Updated,
    Revoked,
}

impl GrantChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantChangeType::Created => "created",
            GrantChangeType::Updated => "updated",
            GrantChangeType::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "created" => GrantChangeType::Created,
            "updated" => GrantChangeType::Updated,
            "revoked" => GrantChangeType::Revoked,
            _ => return None,
        })
    }
}

/// One row of the append-only grant log, the authoritative audit trail
/// of permission changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantLogEntry {
    pub id: i64,
    pub grant_id: i64,
    pub change_type: GrantChangeType,
    pub old_constraints_json: Option<String>,
    pub new_constraints_json: Option<String>,
    pub changed_at: i64,
    pub changed_by: String,
}
