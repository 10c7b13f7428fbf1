use serde::{Deserialize, Serialize};

use super::{Action, SubAction};
use crate::errors::ErrorCode;

/// The resolved caller identity handed to the policy evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub is_active: bool,
    pub is_bootstrap: bool,
}

/// Everything the evaluator may need to know about one action attempt.
/// Fields irrelevant to the action are left `None` and ignored; a missing
/// field bypasses the specific check that would have consumed it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionContext {
    pub topic: Option<String>,
    pub extension: Option<String>,
    pub size_bytes: Option<u64>,
    pub preset: Option<String>,
    pub asset_count: Option<u64>,
    pub volume_bytes: Option<u64>,
    pub sub_action: Option<SubAction>,
    /// Actions being granted, for manage_users escalation checks.
    pub granting_actions: Option<Vec<Action>>,
}

impl ActionContext {
    pub fn for_upload(topic: &str, extension: &str, size_bytes: u64) -> Self {
        Self {
            topic: Some(topic.to_string()),
            extension: Some(extension.to_string()),
            size_bytes: Some(size_bytes),
            volume_bytes: Some(size_bytes),
            ..Default::default()
        }
    }

    pub fn for_download(topic: &str, size_bytes: u64) -> Self {
        Self {
            topic: Some(topic.to_string()),
            size_bytes: Some(size_bytes),
            volume_bytes: Some(size_bytes),
            ..Default::default()
        }
    }

    pub fn for_query(preset: &str) -> Self {
        Self {
            preset: Some(preset.to_string()),
            ..Default::default()
        }
    }

    pub fn for_bulk(asset_count: u64, volume_bytes: u64) -> Self {
        Self {
            asset_count: Some(asset_count),
            volume_bytes: Some(volume_bytes),
            ..Default::default()
        }
    }
}

/// The evaluator's verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub allowed: bool,
    /// Grant id that passed all checks, when allowed.
    pub matched_grant: Option<i64>,
    /// Denial code, when not allowed.
    pub denied_code: Option<ErrorCode>,
    pub reason: Option<String>,
}

impl PolicyResult {
    pub fn allow(grant_id: i64) -> Self {
        Self {
            allowed: true,
            matched_grant: Some(grant_id),
            denied_code: None,
            reason: None,
        }
    }

    pub fn deny(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            matched_grant: None,
            denied_code: Some(code),
            reason: Some(reason.into()),
        }
    }
}
