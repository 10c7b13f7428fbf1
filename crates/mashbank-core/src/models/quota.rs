use serde::{Deserialize, Serialize};

use super::Action;

/// Daily usage counters, keyed by (user, action, UTC date). A new key is
/// minted on the first write of a new date, which is how the roll-over at
/// UTC midnight happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub user_id: i64,
    pub action: Action,
    /// `YYYY-MM-DD` in UTC.
    pub date: String,
    pub request_count: u64,
    pub total_bytes: u64,
    pub updated_at: i64,
}

/// Today's quota key date in UTC.
pub fn utc_today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
